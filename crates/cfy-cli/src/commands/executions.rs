//! Executions command implementation.
//!
//! Starts workflows, optionally waiting for them while streaming their
//! events, and inspects or cancels existing executions.

use std::io::Write;
use std::time::Duration;

use cfy_rest::{ExecuteRequest, Execution, ExecutionId, ExecutionStatus, ManagerClient};
use tracing::info;

use super::{follow_execution, report_wait_failure};
use crate::cli::{ExecutionsCommands, StartArgs};
use crate::config::Config;
use crate::error::CliError;
use crate::events::{EventFormatter, FormatterConfig};
use crate::output::{ExecutionList, Format, Message, OutputFormat};
use crate::params::parse_parameters;
use crate::poller::{Clock, ExecutionPoller, SystemClock};

/// Handler for executions commands.
pub struct ExecutionsCommand<'a, C: ?Sized, K = SystemClock> {
    client: &'a C,
    config: &'a Config,
    clock: K,
    verbose: bool,
}

impl<'a, C: ManagerClient + ?Sized> ExecutionsCommand<'a, C, SystemClock> {
    /// Creates a new executions command handler.
    #[must_use]
    pub fn new(client: &'a C, config: &'a Config) -> Self {
        Self::with_clock(client, config, SystemClock::new())
    }
}

impl<'a, C: ManagerClient + ?Sized, K: Clock> ExecutionsCommand<'a, C, K> {
    /// Creates a handler that waits on the given clock.
    #[must_use]
    pub const fn with_clock(client: &'a C, config: &'a Config, clock: K) -> Self {
        Self {
            client,
            config,
            clock,
            verbose: false,
        }
    }

    /// Keep debug logs and dispatch events when printing events.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Executes the executions command.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        command: &ExecutionsCommands,
    ) -> Result<(), CliError> {
        match command {
            ExecutionsCommands::Start(args) => self.start(out, args).map(|_| ()),
            ExecutionsCommands::Get { id, json } => {
                let execution = self.client.get_execution(&ExecutionId::new(id.as_str()))?;
                OutputFormat::new(Format::from_json_flag(*json)).write(out, &execution)
            }
            ExecutionsCommands::List {
                deployment_id,
                json,
            } => {
                let executions = self.client.list_executions(deployment_id.as_deref())?;
                OutputFormat::new(Format::from_json_flag(*json))
                    .write(out, &ExecutionList { executions })
            }
            ExecutionsCommands::Cancel { id, force } => self.cancel(out, id, *force),
        }
    }

    /// Start a workflow, and with `--wait` block until it ends.
    ///
    /// # Errors
    ///
    /// - [`CliError::InvalidArgument`] for malformed parameters or polling flags.
    /// - Manager errors from starting the execution.
    /// - With `--wait`, any error of the wait. Timeouts and failures are
    ///   reported with hints first and returned suppressed.
    pub fn start<W: Write>(&self, out: &mut W, args: &StartArgs) -> Result<Execution, CliError> {
        let config = self.config.clone().with_polling(&args.polling)?;
        let parameters = parse_parameters(&args.parameters)?;

        let mut request = ExecuteRequest::new(args.deployment_id.as_str(), args.workflow_id.as_str());
        request.parameters = parameters;
        request.allow_custom_parameters = args.allow_custom_parameters;
        request.force = args.force;

        let execution = self.client.execute(&request)?;
        info!(
            execution_id = %execution.id,
            workflow_id = %execution.workflow_id,
            deployment_id = %execution.deployment_id,
            "execution started"
        );

        if !args.wait {
            if args.json {
                OutputFormat::new(Format::Json).write(out, &execution)?;
            } else {
                writeln!(
                    out,
                    "Started workflow '{}' on deployment '{}' [execution id {}]",
                    request.workflow_id, request.deployment_id, execution.id
                )?;
                writeln!(
                    out,
                    "* Run 'cfy events list --tail --execution-id {}' to follow it.",
                    execution.id
                )?;
            }
            return Ok(execution);
        }

        if !args.json {
            writeln!(
                out,
                "Executing workflow '{}' on deployment '{}' [timeout={}] [execution id {}]",
                request.workflow_id,
                request.deployment_id,
                describe_timeout(args.timeout),
                execution.id
            )?;
            out.flush()?;
        }

        let timeout = args.timeout.map(Duration::from_secs);
        let formatter = EventFormatter::new(FormatterConfig {
            json: args.json,
            colors: config.colors,
            verbose: self.verbose,
        });
        let poller = ExecutionPoller::with_clock(self.client, config.poller_config(), &self.clock);

        match follow_execution(
            &poller,
            out,
            &formatter,
            &execution.id,
            timeout,
            args.include_logs,
        ) {
            Ok(finished) => {
                if !args.json {
                    let message = if finished.status == ExecutionStatus::Cancelled {
                        Message::info(format!(
                            "Execution of workflow '{}' for deployment '{}' was cancelled",
                            request.workflow_id, request.deployment_id
                        ))
                    } else {
                        Message::success(format!(
                            "Finished executing workflow '{}' on deployment '{}'",
                            request.workflow_id, request.deployment_id
                        ))
                    };
                    OutputFormat::default().write(out, &message)?;
                }
                Ok(finished)
            }
            Err(err) if args.json => Err(err),
            Err(err) => Err(report_wait_failure(
                out,
                err,
                Some((request.workflow_id.as_str(), request.deployment_id.as_str())),
                timeout,
            )),
        }
    }

    fn cancel<W: Write>(&self, out: &mut W, id: &str, force: bool) -> Result<(), CliError> {
        let execution = self.client.cancel(&ExecutionId::new(id), force)?;
        let verb = if force { "Force-cancelling" } else { "Cancelling" };
        let message = Message::success(format!(
            "{verb} execution {} [status {}]. Run 'cfy executions get {}' to check its progress.",
            execution.id, execution.status, execution.id
        ));
        OutputFormat::default().write(out, &message)
    }
}

fn describe_timeout(timeout: Option<u64>) -> String {
    match timeout {
        Some(secs) if secs > 0 => format!("{secs}s"),
        _ => "none".to_string(),
    }
}
