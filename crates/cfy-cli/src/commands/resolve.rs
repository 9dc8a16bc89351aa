//! Import resolution command implementation.

use std::io::Write;

use crate::cli::ResolveImportArgs;
use crate::config::Config;
use crate::error::CliError;
use crate::output::{OutputFormat, ResolvedImport};

/// Handler for the resolve-import command.
pub struct ResolveCommand<'a> {
    config: &'a Config,
}

impl<'a> ResolveCommand<'a> {
    /// Creates a new resolve-import command handler.
    #[must_use]
    pub const fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Executes the resolve-import command.
    ///
    /// # Errors
    ///
    /// Returns error if the resolver is misconfigured or rejects the URL.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &ResolveImportArgs,
    ) -> Result<(), CliError> {
        let resolver = self.config.import_resolver()?;
        let resolved = resolver.resolve(&args.url)?;
        format.write(
            out,
            &ResolvedImport {
                url: args.url.clone(),
                resolved,
            },
        )
    }
}
