//! In-memory scripted manager.
//!
//! Each execution follows a script of [`MockStep`]s. The first step's events
//! are visible immediately; every `get_execution` call reports the current
//! step's status and then advances, publishing the next step's events. The
//! last step repeats forever.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tracing::trace;

use crate::client::ManagerClient;
use crate::error::{ClientError, Result};
use crate::types::{
    Event, EventKind, EventPage, ExecuteRequest, Execution, ExecutionId, ExecutionStatus,
};

/// One scripted state of an execution.
#[derive(Debug, Clone)]
pub struct MockStep {
    /// Status reported while this step is current.
    pub status: ExecutionStatus,
    /// Error text reported with the status.
    pub error: Option<String>,
    /// Events appended to the log when this step becomes current.
    pub events: Vec<Event>,
}

impl MockStep {
    /// A step with the given status and no new events.
    #[must_use]
    pub const fn status(status: ExecutionStatus) -> Self {
        Self {
            status,
            error: None,
            events: Vec::new(),
        }
    }

    /// Attach events published when this step becomes current.
    #[must_use]
    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events = events;
        self
    }

    /// Attach an error text.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[derive(Debug)]
struct ScriptedExecution {
    execution: Execution,
    remaining: VecDeque<MockStep>,
    log: Vec<Event>,
}

impl ScriptedExecution {
    fn new(mut execution: Execution, steps: Vec<MockStep>) -> Self {
        let mut remaining: VecDeque<MockStep> = steps.into();
        let mut log = Vec::new();
        if let Some(first) = remaining.pop_front() {
            execution.status = first.status;
            execution.error = first.error;
            log.extend(first.events);
        }
        Self {
            execution,
            remaining,
            log,
        }
    }

    fn snapshot_and_advance(&mut self) -> Execution {
        let snapshot = self.execution.clone();
        if let Some(next) = self.remaining.pop_front() {
            self.execution.status = next.status;
            self.execution.error = next.error;
            self.log.extend(next.events);
        }
        snapshot
    }
}

#[derive(Debug, Default)]
struct MockState {
    executions: HashMap<ExecutionId, ScriptedExecution>,
    workflows: HashMap<String, Vec<String>>,
    next_script: Option<Vec<MockStep>>,
    next_id: u64,
    max_page_size: Option<u32>,
    list_events_errors: VecDeque<ClientError>,
    get_execution_errors: VecDeque<ClientError>,
    list_events_calls: usize,
    get_execution_calls: usize,
    cancel_calls: Vec<(ExecutionId, bool)>,
    execute_calls: Vec<ExecuteRequest>,
}

/// Scripted [`ManagerClient`] for tests.
#[derive(Debug, Default)]
pub struct MockManager {
    state: Mutex<MockState>,
}

impl MockManager {
    /// An empty manager with no executions or deployments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an execution that follows `steps`.
    pub fn add_execution(&self, execution: Execution, steps: Vec<MockStep>) {
        let id = execution.id.clone();
        self.state
            .lock()
            .executions
            .insert(id, ScriptedExecution::new(execution, steps));
    }

    /// Register a deployment and the workflows it defines.
    pub fn add_deployment(&self, deployment_id: &str, workflows: &[&str]) {
        self.state.lock().workflows.insert(
            deployment_id.to_owned(),
            workflows.iter().map(|w| (*w).to_owned()).collect(),
        );
    }

    /// Script the next execution created through [`ManagerClient::execute`].
    pub fn script_next_execution(&self, steps: Vec<MockStep>) {
        self.state.lock().next_script = Some(steps);
    }

    /// Cap page sizes below what the caller asks for.
    pub fn set_max_page_size(&self, size: u32) {
        self.state.lock().max_page_size = Some(size);
    }

    /// Fail the next `list_events` call with `err`.
    pub fn inject_list_events_error(&self, err: ClientError) {
        self.state.lock().list_events_errors.push_back(err);
    }

    /// Fail the next `get_execution` call with `err`.
    pub fn inject_get_execution_error(&self, err: ClientError) {
        self.state.lock().get_execution_errors.push_back(err);
    }

    /// Number of `list_events` calls made so far.
    #[must_use]
    pub fn list_events_calls(&self) -> usize {
        self.state.lock().list_events_calls
    }

    /// Number of `get_execution` calls made so far.
    #[must_use]
    pub fn get_execution_calls(&self) -> usize {
        self.state.lock().get_execution_calls
    }

    /// Cancel requests received, as `(execution, force)`.
    #[must_use]
    pub fn cancel_calls(&self) -> Vec<(ExecutionId, bool)> {
        self.state.lock().cancel_calls.clone()
    }

    /// Start requests received.
    #[must_use]
    pub fn execute_calls(&self) -> Vec<ExecuteRequest> {
        self.state.lock().execute_calls.clone()
    }

    /// Every event published so far for an execution.
    #[must_use]
    pub fn published_events(&self, execution_id: &ExecutionId) -> Vec<Event> {
        self.state
            .lock()
            .executions
            .get(execution_id)
            .map(|e| e.log.clone())
            .unwrap_or_default()
    }
}

fn not_found(execution_id: &ExecutionId) -> ClientError {
    ClientError::NotFound(format!(
        "Requested Execution with ID `{execution_id}` was not found"
    ))
}

impl ManagerClient for MockManager {
    fn get_execution(&self, execution_id: &ExecutionId) -> Result<Execution> {
        let mut state = self.state.lock();
        state.get_execution_calls += 1;
        if let Some(err) = state.get_execution_errors.pop_front() {
            return Err(err);
        }
        let scripted = state
            .executions
            .get_mut(execution_id)
            .ok_or_else(|| not_found(execution_id))?;
        let snapshot = scripted.snapshot_and_advance();
        trace!(%execution_id, status = %snapshot.status, "mock status");
        Ok(snapshot)
    }

    fn list_executions(&self, deployment_id: Option<&str>) -> Result<Vec<Execution>> {
        let state = self.state.lock();
        let mut executions: Vec<Execution> = state
            .executions
            .values()
            .map(|s| s.execution.clone())
            .filter(|e| deployment_id.is_none_or(|d| e.deployment_id == d))
            .collect();
        executions.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(executions)
    }

    fn list_events(
        &self,
        execution_id: &ExecutionId,
        from_event: u64,
        batch_size: u32,
        include_logs: bool,
    ) -> Result<EventPage> {
        let mut state = self.state.lock();
        state.list_events_calls += 1;
        if let Some(err) = state.list_events_errors.pop_front() {
            return Err(err);
        }
        let size = state
            .max_page_size
            .map_or(batch_size, |max| batch_size.min(max));
        let scripted = state
            .executions
            .get(execution_id)
            .ok_or_else(|| not_found(execution_id))?;

        let visible: Vec<&Event> = scripted
            .log
            .iter()
            .filter(|e| include_logs || e.kind() != EventKind::Log)
            .collect();
        let items = visible
            .iter()
            .skip(usize::try_from(from_event).unwrap_or(usize::MAX))
            .take(size as usize)
            .map(|e| (*e).clone())
            .collect();

        Ok(EventPage {
            items,
            total: visible.len() as u64,
        })
    }

    fn execute(&self, request: &ExecuteRequest) -> Result<Execution> {
        let mut state = self.state.lock();
        state.execute_calls.push(request.clone());

        let workflows = state
            .workflows
            .get(&request.deployment_id)
            .ok_or_else(|| {
                ClientError::NotFound(format!(
                    "Requested Deployment with ID `{}` was not found",
                    request.deployment_id
                ))
            })?;
        if !workflows.contains(&request.workflow_id) {
            return Err(ClientError::InvalidWorkflow(format!(
                "Workflow {} does not exist in deployment {}",
                request.workflow_id, request.deployment_id
            )));
        }

        state.next_id += 1;
        let id = ExecutionId::new(format!("exec-{}", state.next_id));
        let steps = state.next_script.take().unwrap_or_else(|| {
            vec![
                MockStep::status(ExecutionStatus::Pending),
                MockStep::status(ExecutionStatus::Started),
                MockStep::status(ExecutionStatus::Terminated),
            ]
        });

        let mut execution = Execution::new(
            id.clone(),
            request.workflow_id.clone(),
            request.deployment_id.clone(),
            ExecutionStatus::Pending,
        );
        execution.parameters.clone_from(&request.parameters);

        let scripted = ScriptedExecution::new(execution, steps);
        let created = scripted.execution.clone();
        state.executions.insert(id, scripted);
        Ok(created)
    }

    fn cancel(&self, execution_id: &ExecutionId, force: bool) -> Result<Execution> {
        let mut state = self.state.lock();
        state.cancel_calls.push((execution_id.clone(), force));

        let scripted = state
            .executions
            .get_mut(execution_id)
            .ok_or_else(|| not_found(execution_id))?;
        if scripted.execution.status.is_terminal() {
            return Err(ClientError::Api {
                status: 400,
                message: format!(
                    "Cannot cancel execution {execution_id} in status {}",
                    scripted.execution.status
                ),
            });
        }

        scripted.execution.status = if force {
            ExecutionStatus::ForceCancelling
        } else {
            ExecutionStatus::Cancelling
        };
        scripted.remaining = VecDeque::from([MockStep::status(ExecutionStatus::Cancelled)]);
        Ok(scripted.execution.clone())
    }
}
