//! # cotrace-agent
//!
//! Background agent for the cotrace client component: wires the stores,
//! the state orchestrator, and the backend client together with explicit
//! construction, and drives the periodic retention and upload cycles.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod error;
pub mod logging;
pub mod notifier;
pub mod orchestrator;
pub mod uploader;

pub use error::AgentError;
pub use notifier::{LogNotifier, Notifier};
pub use orchestrator::StatusOrchestrator;
pub use uploader::{run_eviction, UploadOutcome, Uploader};
