//! CLI configuration.
//!
//! Settings come from a TOML file (`$CFY_CONFIG` or `~/.cfy/config.toml`)
//! and are then overridden by command-line flags. A missing default file is
//! not an error; a missing explicitly named file is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cfy_rest::RestClientConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::{Cli, PollingArgs};
use crate::error::CliError;
use crate::poller::PollerConfig;

/// Manager API root used when nothing else is configured.
pub const DEFAULT_MANAGER_URL: &str = "http://localhost/api/v3.1";

/// Seconds between status polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Events requested per page.
pub const DEFAULT_BATCH_SIZE: u32 = 100;

/// Per-request HTTP timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Import URL scheme that refers to a plugin package.
pub const PLUGIN_IMPORT_PREFIX: &str = "plugin:";

/// Main CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Manager REST API root.
    pub manager_url: String,
    /// API token.
    pub token: Option<String>,
    /// Tenant name.
    pub tenant: Option<String>,
    /// Colorize event output.
    pub colors: bool,
    /// Seconds between status polls while waiting.
    pub poll_interval_secs: u64,
    /// Events requested per page.
    pub batch_size: u32,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
    /// Blueprint import resolution.
    pub import_resolver: ImportResolverConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manager_url: DEFAULT_MANAGER_URL.to_string(),
            token: None,
            tenant: None,
            colors: false,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            import_resolver: ImportResolverConfig::default(),
        }
    }
}

impl Config {
    /// Default configuration file location, `~/.cfy/config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".cfy").join("config.toml"))
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing, or if any file that
    /// exists cannot be read, parsed, or validated.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                debug!("no configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CliError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        debug!(path = %path.as_ref().display(), "loaded configuration file");
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        let config: Self =
            toml::from_str(content).map_err(|e| CliError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.manager_url.is_empty() {
            return Err(CliError::Config("manager_url cannot be empty".to_string()));
        }

        if !self.manager_url.starts_with("http://") && !self.manager_url.starts_with("https://") {
            return Err(CliError::Config(format!(
                "manager_url must start with http:// or https://, got {}",
                self.manager_url
            )));
        }

        if self.poll_interval_secs == 0 {
            return Err(CliError::Config(
                "poll_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(CliError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(CliError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        ImportResolver::from_config(&self.import_resolver)?;
        Ok(())
    }

    /// Apply global command-line flags on top of file values.
    #[must_use]
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(manager) = &cli.manager {
            self.manager_url.clone_from(manager);
        }
        if cli.token.is_some() {
            self.token.clone_from(&cli.token);
        }
        if cli.tenant.is_some() {
            self.tenant.clone_from(&cli.tenant);
        }
        self.colors |= cli.colors;
        self
    }

    /// Apply per-command polling flags on top of file values.
    ///
    /// # Errors
    ///
    /// Returns an error if a flag sets a zero interval or batch size.
    pub fn with_polling(mut self, polling: &PollingArgs) -> Result<Self, CliError> {
        if let Some(interval) = polling.poll_interval {
            self.poll_interval_secs = interval;
        }
        if let Some(batch_size) = polling.batch_size {
            self.batch_size = batch_size;
        }
        if self.poll_interval_secs == 0 {
            return Err(CliError::InvalidArgument(
                "--poll-interval must be greater than 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(CliError::InvalidArgument(
                "--batch-size must be greater than 0".to_string(),
            ));
        }
        Ok(self)
    }

    /// Delay between status polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Poll loop settings.
    #[must_use]
    pub const fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            poll_interval: self.poll_interval(),
            batch_size: self.batch_size,
        }
    }

    /// Connection settings for the REST client.
    #[must_use]
    pub fn rest_client_config(&self) -> RestClientConfig {
        RestClientConfig {
            base_url: self.manager_url.clone(),
            token: self.token.clone(),
            tenant: self.tenant.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// Build the configured import resolver.
    ///
    /// # Errors
    ///
    /// Returns an error if the resolver implementation is unknown.
    pub fn import_resolver(&self) -> Result<ImportResolver, CliError> {
        ImportResolver::from_config(&self.import_resolver)
    }
}

// ============================================================================
// Import resolver
// ============================================================================

/// One URL rewrite rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolverRule {
    /// URL prefix to match.
    pub prefix: String,
    /// Text that replaces the matched prefix.
    pub replacement: String,
}

/// `[import_resolver]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImportResolverConfig {
    /// Resolver name: `default` or `with-plugins`.
    pub implementation: String,
    /// Rewrite rules, tried in order.
    pub rules: Vec<ResolverRule>,
}

impl Default for ImportResolverConfig {
    fn default() -> Self {
        Self {
            implementation: ImportResolver::WITH_PLUGINS.to_string(),
            rules: Vec::new(),
        }
    }
}

/// Rewrites blueprint import URLs before they are fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportResolver {
    /// Prefix rewriting only.
    Default {
        /// Rewrite rules.
        rules: Vec<ResolverRule>,
    },
    /// Prefix rewriting; `plugin:` imports are refused since they can only
    /// be resolved by the manager.
    WithPlugins {
        /// Rewrite rules.
        rules: Vec<ResolverRule>,
    },
}

impl ImportResolver {
    /// Configuration name of [`ImportResolver::Default`].
    pub const DEFAULT: &'static str = "default";
    /// Configuration name of [`ImportResolver::WithPlugins`].
    pub const WITH_PLUGINS: &'static str = "with-plugins";

    /// Select the resolver named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] for unknown implementation names.
    pub fn from_config(config: &ImportResolverConfig) -> Result<Self, CliError> {
        let rules = config.rules.clone();
        match config.implementation.as_str() {
            Self::DEFAULT => Ok(Self::Default { rules }),
            Self::WITH_PLUGINS => Ok(Self::WithPlugins { rules }),
            other => Err(CliError::Config(format!(
                "unknown import resolver implementation '{other}', expected '{}' or '{}'",
                Self::DEFAULT,
                Self::WITH_PLUGINS
            ))),
        }
    }

    /// Rewrite `url` with the first rule whose prefix matches.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] for `plugin:` imports under
    /// [`ImportResolver::WithPlugins`].
    pub fn resolve(&self, url: &str) -> Result<String, CliError> {
        let rules = match self {
            Self::Default { rules } => rules,
            Self::WithPlugins { rules } => {
                if url.starts_with(PLUGIN_IMPORT_PREFIX) {
                    return Err(CliError::Config(format!(
                        "cannot resolve plugin import '{url}' locally"
                    )));
                }
                rules
            }
        };

        let resolved = rules
            .iter()
            .find_map(|rule| {
                url.strip_prefix(rule.prefix.as_str())
                    .map(|rest| format!("{}{rest}", rule.replacement))
            })
            .unwrap_or_else(|| url.to_string());

        debug!(url, %resolved, "resolved import");
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use test_case::test_case;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("failed to write temp file");
        file
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").expect("empty config should parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.manager_url, DEFAULT_MANAGER_URL);
        assert!(!config.colors);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            manager_url = "https://manager.example.com/api/v3.1"
            token = "secret"
            tenant = "default_tenant"
            colors = true
            poll_interval_secs = 2
            batch_size = 250
            request_timeout_secs = 10

            [import_resolver]
            implementation = "default"

            [[import_resolver.rules]]
            prefix = "http://www.getcloudify.org/spec"
            replacement = "file:///opt/spec"
        "#;

        let config = Config::from_toml(toml).expect("should parse full config");

        assert_eq!(config.manager_url, "https://manager.example.com/api/v3.1");
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert!(config.colors);
        assert_eq!(config.poll_interval_secs, 2);
        assert_eq!(config.batch_size, 250);
        assert_eq!(config.import_resolver.rules.len(), 1);

        let rest = config.rest_client_config();
        assert_eq!(rest.request_timeout, Duration::from_secs(10));
        assert_eq!(rest.tenant.as_deref(), Some("default_tenant"));
    }

    #[test]
    fn test_load_from_file() {
        let file = create_temp_config("batch_size = 7\n");
        let config = Config::load(Some(file.path())).expect("should load from file");
        assert_eq!(config.batch_size, 7);
    }

    #[test]
    fn test_explicit_file_not_found() {
        let result = Config::load(Some(Path::new("/nonexistent/path/config.toml")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test_case("poll_interval_secs = 0" ; "zero poll interval")]
    #[test_case("batch_size = 0" ; "zero batch size")]
    #[test_case("request_timeout_secs = 0" ; "zero request timeout")]
    #[test_case("manager_url = \"\"" ; "empty manager url")]
    #[test_case("manager_url = \"ftp://manager\"" ; "bad manager scheme")]
    #[test_case("[import_resolver]\nimplementation = \"custom.module.Resolver\"" ; "unknown resolver")]
    #[test_case("batch_size = \"many\"" ; "wrong type")]
    fn test_invalid_config_rejected(toml: &str) {
        let result = Config::from_toml(toml);
        assert!(matches!(result, Err(CliError::Config(_))), "got {result:?}");
    }

    #[test]
    fn test_cli_overrides_file() {
        let cli = Cli::parse_from([
            "cfy",
            "--manager",
            "https://other/api/v3.1",
            "--token",
            "t0k3n",
            "--colors",
            "executions",
            "list",
        ]);
        let config = Config::from_toml("manager_url = \"http://file/api/v3.1\"\ntenant = \"t1\"")
            .unwrap()
            .with_cli(&cli);

        assert_eq!(config.manager_url, "https://other/api/v3.1");
        assert_eq!(config.token.as_deref(), Some("t0k3n"));
        assert_eq!(config.tenant.as_deref(), Some("t1"));
        assert!(config.colors);
    }

    #[test]
    fn test_polling_overrides() {
        let polling = PollingArgs {
            poll_interval: Some(1),
            batch_size: None,
        };
        let config = Config::default().with_polling(&polling).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);

        let zero = PollingArgs {
            poll_interval: None,
            batch_size: Some(0),
        };
        assert!(matches!(
            Config::default().with_polling(&zero),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = Config::default();
        config.import_resolver.rules.push(ResolverRule {
            prefix: "a".into(),
            replacement: "b".into(),
        });
        let text = toml::to_string(&config).expect("should serialize");
        let parsed = Config::from_toml(&text).expect("should parse");
        assert_eq!(parsed, config);
    }

    fn rules() -> Vec<ResolverRule> {
        vec![
            ResolverRule {
                prefix: "http://www.getcloudify.org/spec".into(),
                replacement: "file:///opt/spec".into(),
            },
            ResolverRule {
                prefix: "http://www.getcloudify.org".into(),
                replacement: "http://mirror.local".into(),
            },
        ]
    }

    #[test_case("http://www.getcloudify.org/spec/types.yaml", "file:///opt/spec/types.yaml" ; "first rule wins")]
    #[test_case("http://www.getcloudify.org/other.yaml", "http://mirror.local/other.yaml" ; "second rule")]
    #[test_case("http://example.com/types.yaml", "http://example.com/types.yaml" ; "no match unchanged")]
    fn test_resolver_rules(url: &str, expected: &str) {
        let resolver = ImportResolver::Default { rules: rules() };
        assert_eq!(resolver.resolve(url).unwrap(), expected);
    }

    #[test]
    fn test_with_plugins_rejects_plugin_imports() {
        let resolver = ImportResolver::WithPlugins { rules: rules() };
        assert!(matches!(
            resolver.resolve("plugin:cloudify-openstack-plugin"),
            Err(CliError::Config(_))
        ));
        assert_eq!(
            resolver.resolve("http://www.getcloudify.org/x").unwrap(),
            "http://mirror.local/x"
        );
    }

    #[test]
    fn test_default_resolver_passes_plugin_imports() {
        let resolver = ImportResolver::Default { rules: Vec::new() };
        assert_eq!(resolver.resolve("plugin:p").unwrap(), "plugin:p");
    }

    #[test]
    fn test_default_implementation_is_with_plugins() {
        let resolver = Config::default().import_resolver().unwrap();
        assert!(matches!(resolver, ImportResolver::WithPlugins { .. }));
    }
}
