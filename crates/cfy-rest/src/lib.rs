//! # cfy-rest
//!
//! Blocking client for the orchestration manager's REST API.
//!
//! The [`ManagerClient`] trait is the seam the CLI is written against:
//! [`RestClient`] talks HTTP to a real manager, and `MockManager` (behind the
//! `mock` feature) plays back scripted execution lifecycles in tests.
//!
//! ```text
//! ┌──────────┐   ManagerClient   ┌────────────┐   HTTP/JSON   ┌─────────┐
//! │  cfy-cli │──────────────────►│ RestClient │──────────────►│ manager │
//! └──────────┘                   └────────────┘               └─────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
#[cfg(feature = "mock")]
pub mod mock;
pub mod types;

pub use client::{ManagerClient, RestClient, RestClientConfig};
pub use error::{ClientError, Result};
#[cfg(feature = "mock")]
pub use mock::{MockManager, MockStep};
pub use types::{
    Event, EventKind, EventPage, ExecuteRequest, Execution, ExecutionId, ExecutionStatus,
};
