//! Per-stream request processing.
//!
//! - [`processor`] - the receive → compute → send loop bound to one open
//!   `DoMathStream` call.

pub mod processor;
