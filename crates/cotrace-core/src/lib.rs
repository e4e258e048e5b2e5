//! # cotrace-core
//!
//! Core logic for the cotrace contact-tracing client component.
//!
//! This crate provides:
//! - The proximity event ledger recording close-range BLE encounters
//! - Wire encoding of encounter batches (legacy v1 and current v2)
//! - The key and registration store backing device activation
//! - The exposure state machine and its persistence codec
//! - Configuration management
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`events`] - Proximity event model and the mutex-serialized ledger
//! - [`encoder`] - Deterministic batch encoding for upload
//! - [`keystore`] - Secret key and registration persistence
//! - [`status`] - Pure exposure state machine
//! - [`serialization`] - User state persistence codec
//! - [`storage`] - File-backed storage shared by the stores
//! - [`config`] - Application configuration loading, saving, and validation
//! - [`error`] - Unified error types for the crate
//!
//! Remote identities are encrypted by an upstream crypto collaborator
//! before they reach this crate; the core only stores and transports the
//! resulting opaque bytes.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod config;
pub mod encoder;
pub mod error;
pub mod events;
pub mod keystore;
pub mod serialization;
pub mod status;
pub mod storage;

// Re-export primary types for convenience
pub use config::{CotraceConfig, EncodingVersion, WindowsConfig};
pub use encoder::{encode_batch, EncodedBatch};
pub use error::{CoreError, Result};
pub use events::{EventStore, ProximityEvent};
pub use keystore::{KeyStore, Registration, SecretKey};
pub use status::{
    transition, ExternalEvent, Notice, Outcome, StateWindows, Symptom, TestResult, UserState,
};
pub use storage::Storage;
