//! End-to-end command flows against a scripted manager.

use cfy_cli::cli::{EventsCommands, EventsListArgs, ExecutionsCommands, PollingArgs, StartArgs};
use cfy_cli::commands::{EventsCommand, ExecutionsCommand};
use cfy_cli::poller::ManualClock;
use cfy_cli::{CliError, Config};
use cfy_rest::mock::{MockManager, MockStep};
use cfy_rest::{Event, ExecutionId, ExecutionStatus};

// ==================== Helper Functions ====================

fn start(workflow_id: &str, deployment_id: &str) -> StartArgs {
    StartArgs {
        workflow_id: workflow_id.into(),
        deployment_id: deployment_id.into(),
        parameters: Vec::new(),
        allow_custom_parameters: false,
        force: false,
        wait: true,
        timeout: None,
        include_logs: true,
        json: false,
        polling: PollingArgs::default(),
    }
}

fn node_event(event_type: &str, message: &str) -> Event {
    Event::lifecycle(event_type, message)
        .with_field("timestamp", "2024-03-01T10:00:00.123Z")
        .with_field("deployment_id", "web")
        .with_field("node_name", "vm_1")
        .with_field("operation", "cloudify.interfaces.lifecycle.create")
}

fn manager() -> MockManager {
    let manager = MockManager::new();
    manager.add_deployment("web", &["install", "uninstall"]);
    manager
}

// ==================== Start and Wait ====================

#[test]
fn test_start_wait_prints_formatted_events() {
    let manager = manager();
    manager.script_next_execution(vec![
        MockStep::status(ExecutionStatus::Pending),
        MockStep::status(ExecutionStatus::Started).with_events(vec![
            node_event("task_succeeded", "Task succeeded 'create'"),
            Event::log("info", "creating vm").with_field("deployment_id", "web"),
        ]),
        MockStep::status(ExecutionStatus::Terminated),
    ]);
    let config = Config::default();
    let cmd = ExecutionsCommand::with_clock(&manager, &config, ManualClock::new());

    let mut out = Vec::new();
    cmd.execute(&mut out, &ExecutionsCommands::Start(start("install", "web")))
        .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains(
        "2024-03-01 10:00:00 CFY <web> [vm_1.create] Task succeeded 'create'"
    ));
    assert!(out.contains("LOG <web> INFO: creating vm"));
}

#[test]
fn test_start_wait_json_emits_only_events() {
    let manager = manager();
    manager.script_next_execution(vec![
        MockStep::status(ExecutionStatus::Started)
            .with_events(vec![node_event("task_succeeded", "done")]),
        MockStep::status(ExecutionStatus::Terminated),
    ]);
    let config = Config::default();
    let cmd = ExecutionsCommand::with_clock(&manager, &config, ManualClock::new());

    let mut args = start("install", "web");
    args.json = true;
    let mut out = Vec::new();
    cmd.start(&mut out, &args).unwrap();

    let out = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 1);
    let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(value["node_name"], "vm_1");
}

#[test]
fn test_start_wait_timeout_is_suppressed_with_hints() {
    let manager = manager();
    manager.script_next_execution(vec![MockStep::status(ExecutionStatus::Started)]);
    let config = Config::default();
    let cmd = ExecutionsCommand::with_clock(&manager, &config, ManualClock::new());

    let mut args = start("install", "web");
    args.timeout = Some(15);
    let mut out = Vec::new();
    let err = cmd.start(&mut out, &args).unwrap_err();

    assert!(err.is_suppressed());
    assert!(matches!(err.root(), CliError::Timeout { .. }));
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("[timeout=15s]"));
    assert!(out.contains("Timed out waiting for workflow 'install' of deployment 'web'"));
    assert!(out.contains("cfy executions cancel exec-1"));
}

#[test]
fn test_start_unknown_deployment() {
    let manager = manager();
    let config = Config::default();
    let cmd = ExecutionsCommand::with_clock(&manager, &config, ManualClock::new());

    let err = cmd.start(&mut Vec::new(), &start("install", "db")).unwrap_err();
    assert!(matches!(err, CliError::NotFound(_)), "got {err:?}");
}

// ==================== Cancel and Tail ====================

#[test]
fn test_tail_observes_cancellation() {
    let manager = manager();
    manager.script_next_execution(vec![MockStep::status(ExecutionStatus::Started)]);
    let config = Config::default();
    let exec_cmd = ExecutionsCommand::with_clock(&manager, &config, ManualClock::new());

    let mut args = start("install", "web");
    args.wait = false;
    exec_cmd.start(&mut Vec::new(), &args).unwrap();
    exec_cmd
        .execute(
            &mut Vec::new(),
            &ExecutionsCommands::Cancel {
                id: "exec-1".into(),
                force: false,
            },
        )
        .unwrap();

    let events_cmd = EventsCommand::with_clock(&manager, &config, ManualClock::new());
    let mut out = Vec::new();
    events_cmd
        .execute(
            &mut out,
            &EventsCommands::List(EventsListArgs {
                execution_id: "exec-1".into(),
                include_logs: false,
                json: false,
                tail: true,
                timeout: Some(60),
                offset: 0,
                size: 1000,
                polling: PollingArgs::default(),
            }),
        )
        .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.ends_with("Execution exec-1 ended with status cancelled\n"));
    assert_eq!(
        manager.cancel_calls(),
        vec![(ExecutionId::new("exec-1"), false)]
    );
}

#[test]
fn test_cancel_finished_execution_is_rejected() {
    let manager = manager();
    manager.script_next_execution(vec![MockStep::status(ExecutionStatus::Terminated)]);
    let config = Config::default();
    let cmd = ExecutionsCommand::with_clock(&manager, &config, ManualClock::new());

    let mut args = start("install", "web");
    args.wait = false;
    cmd.start(&mut Vec::new(), &args).unwrap();

    let err = cmd
        .execute(
            &mut Vec::new(),
            &ExecutionsCommands::Cancel {
                id: "exec-1".into(),
                force: true,
            },
        )
        .unwrap_err();
    assert!(matches!(err, CliError::Api { status: 400, .. }));
}
