//! # cfy-cli
//!
//! Command-line client for an orchestration manager.
//!
//! Provides commands for:
//! - Starting workflow executions, optionally waiting for them to finish
//! - Inspecting and cancelling executions
//! - Listing and tailing execution events and logs
//! - Checking how blueprint imports are resolved
//!
//! # Architecture
//!
//! Commands talk to the manager through [`cfy_rest::ManagerClient`]. Waiting
//! is done by [`poller::ExecutionPoller`], which drains new events with an
//! [`events::EventFetcher`] every cycle and hands them to an
//! [`events::EventFormatter`].
//!
//! ```text
//!  ┌──────────┐  start/get/cancel   ┌────────────────┐
//!  │ commands │────────────────────►│                │
//!  └────┬─────┘                     │ ManagerClient  │
//!       │ wait                      │                │
//!  ┌────▼─────┐  status, events     │                │
//!  │  poller  │────────────────────►│                │
//!  └────┬─────┘                     └────────────────┘
//!       │ new events
//!  ┌────▼──────┐
//!  │ formatter │──► stdout
//!  └───────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod output;
pub mod params;
pub mod poller;

pub use cli::{Cli, Commands, EventsCommands, ExecutionsCommands};
pub use config::Config;
pub use error::CliError;
pub use output::OutputFormat;
pub use poller::{Clock, ExecutionPoller, PollerConfig, SystemClock};
