//! Agent error type.

use thiserror::Error;

/// Errors raised by the agent's scheduled cycles.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A local store operation failed.
    #[error(transparent)]
    Core(#[from] cotrace_core::CoreError),

    /// A backend call failed.
    #[error(transparent)]
    Client(#[from] cotrace_client::ClientError),
}
