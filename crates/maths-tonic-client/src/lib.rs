#![doc = include_str!("../README.md")]

pub mod config;
pub mod driver;

pub use config::{CliArgs, Compression, DriverConfig};
pub use driver::{DriverReport, StreamDriver};
