//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`executions`] - Start, inspect and cancel executions
//! - [`events`] - List and tail execution events
//! - [`resolve`] - Blueprint import resolution

pub mod events;
pub mod executions;
pub mod resolve;

pub use events::EventsCommand;
pub use executions::ExecutionsCommand;
pub use resolve::ResolveCommand;

use std::io::Write;
use std::time::Duration;

use cfy_rest::{Execution, ExecutionId, ManagerClient};

use crate::error::CliError;
use crate::events::EventFormatter;
use crate::poller::{Clock, ExecutionPoller};

/// Wait for an execution while writing its events through `formatter`.
pub(crate) fn follow_execution<C, K, W>(
    poller: &ExecutionPoller<'_, C, K>,
    writer: &mut W,
    formatter: &EventFormatter,
    execution_id: &ExecutionId,
    timeout: Option<Duration>,
    include_logs: bool,
) -> Result<Execution, CliError>
where
    C: ManagerClient + ?Sized,
    K: Clock,
    W: Write,
{
    poller.wait_for_execution(execution_id, timeout, include_logs, |events| {
        formatter.write_events(writer, events).map(|_| ())
    })
}

/// Tell the user what to do after a wait that did not succeed.
///
/// Returns `err` suppressed when hints were written, so it is not printed
/// a second time.
pub(crate) fn report_wait_failure<W: Write>(
    writer: &mut W,
    err: CliError,
    workflow: Option<(&str, &str)>,
    timeout: Option<Duration>,
) -> CliError {
    match write_wait_hints(writer, &err, workflow, timeout) {
        Ok(true) => err.suppress(),
        Ok(false) => err,
        Err(io) => io,
    }
}

fn write_wait_hints<W: Write>(
    writer: &mut W,
    err: &CliError,
    workflow: Option<(&str, &str)>,
    timeout: Option<Duration>,
) -> Result<bool, CliError> {
    match err {
        CliError::Timeout {
            execution_id,
            elapsed,
        } => {
            let waited = timeout.unwrap_or(*elapsed).as_secs();
            match workflow {
                Some((workflow_id, deployment_id)) => writeln!(
                    writer,
                    "Timed out waiting for workflow '{workflow_id}' of deployment \
                     '{deployment_id}' to end. The execution may still be running; \
                     the command was told to wait up to {waited} seconds for it."
                )?,
                None => writeln!(
                    writer,
                    "Timed out after {waited} seconds waiting for execution \
                     {execution_id} to end. The execution may still be running."
                )?,
            }
            writeln!(writer)?;
            writeln!(writer, "* Run 'cfy executions get {execution_id}' to check its status.")?;
            writeln!(writer, "* Run 'cfy executions cancel {execution_id}' to cancel it.")?;
            writeln!(
                writer,
                "* Run 'cfy events list --tail --execution-id {execution_id}' to keep \
                 following its events."
            )?;
            writer.flush()?;
            Ok(true)
        }
        CliError::ExecutionFailed {
            execution_id,
            error,
        } => {
            match workflow {
                Some((workflow_id, deployment_id)) => writeln!(
                    writer,
                    "Execution of workflow '{workflow_id}' for deployment \
                     '{deployment_id}' failed. [error={error}]"
                )?,
                None => writeln!(writer, "Execution {execution_id} failed. [error={error}]")?,
            }
            writeln!(
                writer,
                "* Run 'cfy events list --include-logs --execution-id {execution_id}' \
                 to retrieve the execution's events and logs."
            )?;
            writer.flush()?;
            Ok(true)
        }
        _ => Ok(false),
    }
}
