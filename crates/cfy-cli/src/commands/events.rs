//! Events command implementation.

use std::io::Write;
use std::time::Duration;

use cfy_rest::{ExecutionId, ManagerClient};

use super::{follow_execution, report_wait_failure};
use crate::cli::{EventsCommands, EventsListArgs};
use crate::config::Config;
use crate::error::CliError;
use crate::events::{EventFetcher, EventFormatter, FormatterConfig};
use crate::poller::{Clock, ExecutionPoller, SystemClock};

/// Handler for events commands.
pub struct EventsCommand<'a, C: ?Sized, K = SystemClock> {
    client: &'a C,
    config: &'a Config,
    clock: K,
    verbose: bool,
}

impl<'a, C: ManagerClient + ?Sized> EventsCommand<'a, C, SystemClock> {
    /// Creates a new events command handler.
    #[must_use]
    pub fn new(client: &'a C, config: &'a Config) -> Self {
        Self::with_clock(client, config, SystemClock::new())
    }
}

impl<'a, C: ManagerClient + ?Sized, K: Clock> EventsCommand<'a, C, K> {
    /// Creates a handler that tails on the given clock.
    #[must_use]
    pub const fn with_clock(client: &'a C, config: &'a Config, clock: K) -> Self {
        Self {
            client,
            config,
            clock,
            verbose: false,
        }
    }

    /// Keep debug logs and dispatch events.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Executes the events command.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub fn execute<W: Write>(&self, out: &mut W, command: &EventsCommands) -> Result<(), CliError> {
        match command {
            EventsCommands::List(args) if args.tail => self.tail(out, args),
            EventsCommands::List(args) => self.list(out, args),
        }
    }

    fn formatter(&self, args: &EventsListArgs, config: &Config) -> EventFormatter {
        EventFormatter::new(FormatterConfig {
            json: args.json,
            colors: config.colors,
            verbose: self.verbose,
        })
    }

    /// Print one window of events, `--offset`/`--size`.
    fn list<W: Write>(&self, out: &mut W, args: &EventsListArgs) -> Result<(), CliError> {
        let execution_id = ExecutionId::new(args.execution_id.as_str());
        // Unknown executions have no events rather than a 404 on this endpoint.
        self.client.get_execution(&execution_id)?;

        let fetcher = EventFetcher::new(self.client, self.config.batch_size, args.include_logs);
        let page = fetcher.fetch_page(&execution_id, args.offset, args.size)?;
        let formatter = self.formatter(args, self.config);
        formatter.write_events(out, &page.items)?;

        if !args.json {
            writeln!(out)?;
            writeln!(out, "Showing {} of {} events", page.items.len(), page.total)?;
        }
        Ok(())
    }

    /// Print events as they arrive until the execution ends.
    fn tail<W: Write>(&self, out: &mut W, args: &EventsListArgs) -> Result<(), CliError> {
        let config = self.config.clone().with_polling(&args.polling)?;
        let execution_id = ExecutionId::new(args.execution_id.as_str());
        let timeout = args.timeout.map(Duration::from_secs);
        let formatter = self.formatter(args, &config);
        let poller = ExecutionPoller::with_clock(self.client, config.poller_config(), &self.clock);

        match follow_execution(
            &poller,
            out,
            &formatter,
            &execution_id,
            timeout,
            args.include_logs,
        ) {
            Ok(execution) => {
                if !args.json {
                    writeln!(out)?;
                    writeln!(
                        out,
                        "Execution {} ended with status {}",
                        execution.id, execution.status
                    )?;
                }
                Ok(())
            }
            Err(err) if args.json => Err(err),
            Err(err) => Err(report_wait_failure(out, err, None, timeout)),
        }
    }
}
