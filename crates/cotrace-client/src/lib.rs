//! # cotrace-client
//!
//! HTTP client for the cotrace backend: device registration, activation
//! code confirmation, and encounter batch upload.
//!
//! All calls are asynchronous and resolve exactly once with `Ok` or `Err`.
//! The client never retries on its own; repeated periodic invocation by
//! the scheduling collaborator is the retry mechanism.
//!
//! The backend is reached through the [`transport::HttpTransport`] trait.
//! Production code uses [`transport::ReqwestTransport`]; tests use the
//! recording mock behind the `mock-transport` feature.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod colocation;
pub mod error;
pub mod resident;
pub mod transport;

// Re-export primary types for convenience
pub use colocation::ColocationApi;
pub use error::{ClientError, Result};
pub use resident::{DeviceConfirmation, ResidentApi};
pub use transport::{ApiRequest, HttpMethod, HttpTransport, ReqwestTransport};

#[cfg(any(test, feature = "mock-transport"))]
pub use transport::mock::MockTransport;
