//! Error types for the maths stream.
//!
//! This module defines the central `Error` enum shared by the calculator
//! service and the stream driver. It implements `From<Error>` for
//! `tonic::Status` so server-side failures propagate to clients with an
//! appropriate status code.
//!
//! ## Error Cases
//! - `UnsupportedOperator`: the request named an operator outside `+ - * /`.
//! - `ChannelError`: an internal channel between tasks was closed.
//! - `Transport`: reading from or writing to the stream failed.
//! - `Connect` / `StreamOpen`: the client could not reach the service or open
//!   the call.
//! - `Validation`: a response did not carry the expected result.
//! - `StreamClosed` / `UnexpectedResponse`: the response count did not match
//!   the request count.
//! - `TaskFailed`: a driver task panicked or was cancelled.
//! - `ServiceShutdown`: the service is shutting down.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the maths stream.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// The operator is not one of `+`, `-`, `*`, `/`.
    #[error("Unsupported operator: {operator:?}")]
    UnsupportedOperator { operator: String },

    /// Internal channel send/receive failure (e.g., closed channel).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The stream failed mid-flight.
    #[error("Transport error: {0}")]
    Transport(Status),

    /// The client could not establish a connection.
    #[error("Connection failed: {context}")]
    Connect { context: String },

    /// The bidirectional call could not be opened.
    #[error("Failed to open stream: {0}")]
    StreamOpen(Status),

    /// A response did not match the expected result.
    #[error("Wrong result for message {index}: expected {expected}, got {actual}")]
    Validation {
        index: u64,
        expected: f64,
        actual: f64,
    },

    /// The response stream ended before every request was answered.
    #[error("Stream closed after {received} of {expected} responses")]
    StreamClosed { received: u64, expected: u64 },

    /// The server sent a response nobody asked for.
    #[error("Unexpected response at position {index}")]
    UnexpectedResponse { index: u64 },

    /// A spawned task panicked or was cancelled.
    #[error("Task failed: {context}")]
    TaskFailed { context: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::UnsupportedOperator { operator } => {
                Status::invalid_argument(format!("Unsupported operator: {operator:?}"))
            }
            Error::ChannelError { context } => {
                Status::internal(format!("Channel error: {context}"))
            }
            Error::Transport(status) | Error::StreamOpen(status) => status,
            Error::Connect { context } => Status::unavailable(context),
            e @ Error::Validation { .. } => Status::data_loss(e.to_string()),
            e @ Error::StreamClosed { .. } => Status::aborted(e.to_string()),
            e @ Error::UnexpectedResponse { .. } => Status::internal(e.to_string()),
            Error::TaskFailed { context } => Status::internal(context),
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
        }
    }
}
