//! gRPC service implementation and stream lifecycle tracking.
//!
//! ## Structure
//!
//! - [`handler`] - gRPC service entry point (`MathsService`).
//! - [`tracker`] - in-flight stream accounting used by graceful shutdown.

pub mod handler;
pub mod tracker;
