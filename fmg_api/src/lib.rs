//! FortiManager JSON-RPC API client library.
//!
//! The crate splits along the same seams as the API itself:
//!
//! - [`client`] — the HTTP/JSON-RPC client and typed endpoint wrappers.
//! - [`rpc`] — envelope construction and parsing.
//! - [`error`] — the status-code-to-error translation.
//! - [`task`] — task state normalization and the completion poller.
//! - [`validation`] — input checks and log sanitization.
//! - [`retry`] — login backoff.

pub mod client;
pub mod error;
pub mod retry;
pub mod rpc;
pub mod task;
pub mod validation;

pub use client::{Auth, FmgClient, FmgClientBuilder};
pub use error::{ApiErrorKind, FmgError};
pub use rpc::Method;
pub use task::{TaskSource, TaskState, WaitOptions, WaitOutcome, wait_for_task};
