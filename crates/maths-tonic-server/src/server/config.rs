use anyhow::bail;
use clap::Parser;
use maths_tonic_core::OperatorPolicy;

/// Runtime configuration for the `maths-tonic-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first), with defaults suitable for a local load test.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "maths-tonic-server",
    version,
    about = "A gRPC calculator answering a bidirectional stream of requests"
)]
pub struct CliArgs {
    /// Address to listen on (TCP or Unix socket path; use --uds for Unix socket).
    ///
    /// Example: "0.0.0.0:50051" or "/tmp/maths-uds.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,

    /// Capacity of the response buffer between a stream handler and the gRPC
    /// response stream.
    ///
    /// Once full, the handler stops reading requests until the client consumes
    /// responses, so this bounds per-stream memory.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 64)]
    pub stream_buffer_size: usize,

    /// What to do with an operator other than `+ - * /`: `reject` fails the
    /// stream with `INVALID_ARGUMENT`, `zero` answers 0.
    ///
    /// Environment variable: `OPERATOR_POLICY`
    #[arg(long, env = "OPERATOR_POLICY", default_value = "reject")]
    pub operator_policy: OperatorPolicy,

    /// Seconds to wait for in-flight streams to finish during shutdown before
    /// they are cancelled.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub uds: bool,
    pub stream_buffer_size: usize,
    pub operator_policy: OperatorPolicy,
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_addr: String::from("0.0.0.0:50051"),
            uds: false,
            stream_buffer_size: 64,
            operator_policy: OperatorPolicy::Reject,
            shutdown_timeout: 3,
        }
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        if args.server_addr.is_empty() {
            bail!("SERVER_ADDR must not be empty");
        }

        Ok(Self {
            server_addr: args.server_addr,
            uds: args.uds,
            stream_buffer_size: args.stream_buffer_size,
            operator_policy: args.operator_policy,
            shutdown_timeout: args.shutdown_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let args = CliArgs::try_parse_from(["maths-tonic-server"]).unwrap();
        let config = ServerConfig::try_from(args).unwrap();
        assert_eq!(config.stream_buffer_size, 64);
        assert_eq!(config.operator_policy, OperatorPolicy::Reject);
        assert!(!config.uds);
    }

    #[test]
    fn zero_policy_from_flag() {
        let args =
            CliArgs::try_parse_from(["maths-tonic-server", "--operator-policy", "zero"]).unwrap();
        assert_eq!(args.operator_policy, OperatorPolicy::Zero);
    }

    #[test]
    fn rejects_empty_buffer() {
        let args =
            CliArgs::try_parse_from(["maths-tonic-server", "--stream-buffer-size", "0"]).unwrap();
        assert!(ServerConfig::try_from(args).is_err());
    }

    #[test]
    fn rejects_unknown_policy() {
        assert!(
            CliArgs::try_parse_from(["maths-tonic-server", "--operator-policy", "lenient"])
                .is_err()
        );
    }
}
