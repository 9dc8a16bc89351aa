//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// cfy - run and follow workflow executions on an orchestration manager.
#[derive(Parser, Debug, Clone)]
#[command(name = "cfy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Manager REST API root, e.g. `https://manager/api/v3.1`.
    #[arg(long, global = true, env = "CFY_MANAGER_URL")]
    pub manager: Option<String>,

    /// API token.
    #[arg(long, global = true, env = "CFY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Tenant to operate on.
    #[arg(long, global = true, env = "CFY_TENANT")]
    pub tenant: Option<String>,

    /// Configuration file (default `~/.cfy/config.toml`).
    #[arg(long, global = true, env = "CFY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Colorize event output.
    #[arg(long, global = true)]
    pub colors: bool,

    /// Increase diagnostic output (`-v` info, `-vv` debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start, inspect and cancel workflow executions.
    Executions {
        /// Executions subcommand to execute.
        #[command(subcommand)]
        command: ExecutionsCommands,
    },

    /// Inspect execution events.
    Events {
        /// Events subcommand to execute.
        #[command(subcommand)]
        command: EventsCommands,
    },

    /// Show how a blueprint import URL is resolved.
    ResolveImport(ResolveImportArgs),
}

/// Executions subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ExecutionsCommands {
    /// Start a workflow on a deployment.
    Start(StartArgs),

    /// Show one execution.
    Get {
        /// Execution ID.
        id: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// List executions.
    List {
        /// Only executions of this deployment.
        #[arg(short = 'd', long)]
        deployment_id: Option<String>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Request cancellation of a running execution.
    Cancel {
        /// Execution ID.
        id: String,

        /// Terminate running tasks instead of waiting for them.
        #[arg(long)]
        force: bool,
    },
}

/// Arguments for `executions start`.
#[derive(Args, Debug, Clone)]
pub struct StartArgs {
    /// Workflow to run.
    pub workflow_id: String,

    /// Deployment to run the workflow on.
    #[arg(short = 'd', long)]
    pub deployment_id: String,

    /// Parameters as `k1=v1;k2=v2`, a JSON object, or a JSON file path.
    /// May be repeated.
    #[arg(short = 'p', long = "parameters")]
    pub parameters: Vec<String>,

    /// Accept parameters the workflow does not declare.
    #[arg(long)]
    pub allow_custom_parameters: bool,

    /// Start even if another execution is running on the deployment.
    #[arg(long)]
    pub force: bool,

    /// Wait for the execution to finish, printing its events.
    #[arg(long)]
    pub wait: bool,

    /// Give up waiting after this many seconds (0 waits forever).
    #[arg(long, requires = "wait")]
    pub timeout: Option<u64>,

    /// Include log messages in the printed events.
    #[arg(long)]
    pub include_logs: bool,

    /// Print events and results as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub polling: PollingArgs,
}

/// Polling knobs shared by waiting commands.
#[derive(Args, Debug, Clone, Default)]
pub struct PollingArgs {
    /// Seconds between status polls.
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Events requested per page.
    #[arg(long)]
    pub batch_size: Option<u32>,
}

/// Events subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum EventsCommands {
    /// List the events of an execution.
    List(EventsListArgs),
}

/// Arguments for `events list`.
#[derive(Args, Debug, Clone)]
pub struct EventsListArgs {
    /// Execution whose events to list.
    #[arg(short = 'e', long)]
    pub execution_id: String,

    /// Include log messages.
    #[arg(long)]
    pub include_logs: bool,

    /// Print one JSON object per event.
    #[arg(long)]
    pub json: bool,

    /// Keep printing new events until the execution ends.
    #[arg(long)]
    pub tail: bool,

    /// Stop tailing after this many seconds (0 tails forever).
    #[arg(long, requires = "tail")]
    pub timeout: Option<u64>,

    /// Index of the first event to list.
    #[arg(long, default_value_t = 0, conflicts_with = "tail")]
    pub offset: u64,

    /// Maximum number of events to list.
    #[arg(long, default_value_t = 1000, conflicts_with = "tail")]
    pub size: u32,

    #[command(flatten)]
    pub polling: PollingArgs,
}

/// Arguments for `resolve-import`.
#[derive(Args, Debug, Clone)]
pub struct ResolveImportArgs {
    /// Import URL as written in a blueprint.
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    #[test]
    fn cli_help_does_not_panic() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_start_minimal() {
        let cli = Cli::parse_from(["cfy", "executions", "start", "install", "-d", "dep-1"]);
        match cli.command {
            Commands::Executions {
                command: ExecutionsCommands::Start(args),
            } => {
                assert_eq!(args.workflow_id, "install");
                assert_eq!(args.deployment_id, "dep-1");
                assert!(!args.wait);
                assert!(args.timeout.is_none());
                assert!(args.parameters.is_empty());
            }
            _ => panic!("expected executions start"),
        }
    }

    #[test]
    fn parse_start_full() {
        let cli = Cli::parse_from([
            "cfy",
            "executions",
            "start",
            "scale",
            "-d",
            "dep-1",
            "-p",
            "count=2",
            "-p",
            r#"{"node": "vm"}"#,
            "--allow-custom-parameters",
            "--force",
            "--wait",
            "--timeout",
            "600",
            "--include-logs",
            "--json",
            "--poll-interval",
            "2",
            "--batch-size",
            "50",
        ]);
        let Commands::Executions {
            command: ExecutionsCommands::Start(args),
        } = cli.command
        else {
            panic!("expected executions start");
        };
        assert_eq!(args.parameters.len(), 2);
        assert!(args.allow_custom_parameters && args.force && args.wait);
        assert_eq!(args.timeout, Some(600));
        assert!(args.include_logs && args.json);
        assert_eq!(args.polling.poll_interval, Some(2));
        assert_eq!(args.polling.batch_size, Some(50));
    }

    #[test]
    fn start_timeout_requires_wait() {
        let err = Cli::try_parse_from([
            "cfy", "executions", "start", "install", "-d", "dep", "--timeout", "10",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn events_timeout_requires_tail() {
        let err = Cli::try_parse_from(["cfy", "events", "list", "-e", "exec-1", "--timeout", "10"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn events_paging_conflicts_with_tail() {
        let err = Cli::try_parse_from([
            "cfy", "events", "list", "-e", "exec-1", "--tail", "--offset", "5",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parse_events_list_defaults() {
        let cli = Cli::parse_from(["cfy", "events", "list", "-e", "exec-1"]);
        let Commands::Events {
            command: EventsCommands::List(args),
        } = cli.command
        else {
            panic!("expected events list");
        };
        assert_eq!(args.execution_id, "exec-1");
        assert_eq!(args.offset, 0);
        assert_eq!(args.size, 1000);
        assert!(!args.tail);
    }

    #[test]
    fn parse_events_tail_with_timeout() {
        let cli = Cli::parse_from([
            "cfy", "events", "list", "-e", "exec-1", "--tail", "--timeout", "30", "--include-logs",
        ]);
        let Commands::Events {
            command: EventsCommands::List(args),
        } = cli.command
        else {
            panic!("expected events list");
        };
        assert!(args.tail && args.include_logs);
        assert_eq!(args.timeout, Some(30));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "cfy",
            "executions",
            "get",
            "exec-1",
            "--manager",
            "http://manager/api/v3.1",
            "--tenant",
            "t1",
            "--colors",
            "-vv",
        ]);
        assert_eq!(cli.manager.as_deref(), Some("http://manager/api/v3.1"));
        assert_eq!(cli.tenant.as_deref(), Some("t1"));
        assert!(cli.colors);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn parse_cancel_force() {
        let cli = Cli::parse_from(["cfy", "executions", "cancel", "exec-1", "--force"]);
        match cli.command {
            Commands::Executions {
                command: ExecutionsCommands::Cancel { id, force },
            } => {
                assert_eq!(id, "exec-1");
                assert!(force);
            }
            _ => panic!("expected executions cancel"),
        }
    }

    #[test]
    fn parse_resolve_import() {
        let cli = Cli::parse_from(["cfy", "resolve-import", "http://example.com/types.yaml"]);
        match cli.command {
            Commands::ResolveImport(args) => {
                assert_eq!(args.url, "http://example.com/types.yaml");
            }
            _ => panic!("expected resolve-import"),
        }
    }
}
