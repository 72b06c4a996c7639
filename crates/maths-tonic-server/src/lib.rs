#![doc = include_str!("../README.md")]

pub mod server;

pub use server::config::{CliArgs, ServerConfig};
pub use server::serve::{build_maths_service, run_server_with_incoming};
pub use server::service::handler::MathsService;
