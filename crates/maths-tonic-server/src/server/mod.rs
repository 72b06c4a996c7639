pub mod config;
pub mod serve;
pub mod service;
pub mod streaming;
pub mod telemetry;
