//! Protocol bindings and shared types for the `maths` stream.
//!
//! - [`proto`] - generated messages, client and server for `maths.Maths`.
//! - [`types`] - [`Operator`](types::Operator) and
//!   [`OperatorPolicy`](types::OperatorPolicy).
//! - [`error`] - the [`Error`] type used on both sides of the stream.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Operator, OperatorPolicy, evaluate};

pub mod proto {
    tonic::include_proto!("maths");

    /// Encoded file descriptor set for `maths.proto`, used to register the
    /// service with gRPC reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("maths_descriptor");
}
