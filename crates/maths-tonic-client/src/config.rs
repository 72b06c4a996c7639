use anyhow::{Context, bail};
use clap::Parser;
use core::{fmt, str::FromStr};
use maths_tonic_core::{evaluate, proto::MathRequest};
use tonic::codec::CompressionEncoding;

/// Runtime configuration for the `maths-tonic-client` binary.
///
/// The defaults reproduce the reference load test: one million `64 / 2`
/// requests, each expected to come back as `32`.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "maths-tonic-client",
    version,
    about = "Streams arithmetic requests over one DoMathStream call and validates every response"
)]
pub struct CliArgs {
    /// Server URI.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("http://127.0.0.1:50051"))]
    pub server_addr: String,

    /// Number of requests to send (and responses to expect).
    ///
    /// Environment variable: `MESSAGE_COUNT`
    #[arg(long, env = "MESSAGE_COUNT", default_value_t = 1_000_000)]
    pub message_count: u64,

    /// Left-hand operand of every request.
    #[arg(long, env = "OPERAND1", default_value_t = 64.0, allow_negative_numbers = true)]
    pub operand1: f64,

    /// Right-hand operand of every request.
    #[arg(long, env = "OPERAND2", default_value_t = 2.0, allow_negative_numbers = true)]
    pub operand2: f64,

    /// Operator of every request: one of `+ - * /`.
    #[arg(long, env = "OPERATOR", default_value_t = String::from("/"))]
    pub operator: String,

    /// Result every response must carry. Defaults to evaluating the request
    /// locally.
    ///
    /// Environment variable: `EXPECTED`
    #[arg(long, env = "EXPECTED", allow_negative_numbers = true)]
    pub expected: Option<f64>,

    /// Capacity of the channel between the sender task and the outbound
    /// stream.
    ///
    /// Environment variable: `SEND_BUFFER_SIZE`
    #[arg(long, env = "SEND_BUFFER_SIZE", default_value_t = 1024)]
    pub send_buffer_size: usize,

    /// Message compression for the call: `none`, `zstd`, `gzip` or `deflate`.
    ///
    /// Environment variable: `COMPRESSION`
    #[arg(long, env = "COMPRESSION", default_value = "none")]
    pub compression: Compression,

    /// Log progress every N validated responses (0 disables).
    ///
    /// Environment variable: `PROGRESS_INTERVAL`
    #[arg(long, env = "PROGRESS_INTERVAL", default_value_t = 100_000)]
    pub progress_interval: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    #[default]
    None,
    Deflate,
    Gzip,
    Zstd,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Deflate => write!(f, "deflate"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "deflate" => Ok(Compression::Deflate),
            "gzip" => Ok(Compression::Gzip),
            "zstd" => Ok(Compression::Zstd),
            other => Err(format!("unknown compression {other:?}")),
        }
    }
}

impl From<Compression> for Option<CompressionEncoding> {
    fn from(value: Compression) -> Self {
        match value {
            Compression::None => None,
            Compression::Deflate => Some(CompressionEncoding::Deflate),
            Compression::Gzip => Some(CompressionEncoding::Gzip),
            Compression::Zstd => Some(CompressionEncoding::Zstd),
        }
    }
}

/// Validated driver settings, passed into [`StreamDriver`](crate::StreamDriver).
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub server_addr: String,
    pub message_count: u64,
    pub operand1: f64,
    pub operand2: f64,
    pub operator: String,
    pub expected: f64,
    pub send_buffer_size: usize,
    pub compression: Compression,
    pub progress_interval: u64,
}

impl DriverConfig {
    /// The request sent on every iteration.
    pub fn request(&self) -> MathRequest {
        MathRequest {
            operand1: self.operand1,
            operand2: self.operand2,
            operator: self.operator.clone(),
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            server_addr: String::from("http://127.0.0.1:50051"),
            message_count: 1_000_000,
            operand1: 64.0,
            operand2: 2.0,
            operator: String::from("/"),
            expected: 32.0,
            send_buffer_size: 1024,
            compression: Compression::None,
            progress_interval: 100_000,
        }
    }
}

impl TryFrom<CliArgs> for DriverConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.send_buffer_size == 0 {
            bail!("SEND_BUFFER_SIZE must be greater than 0");
        }

        let expected = match args.expected {
            Some(expected) => expected,
            None => evaluate(args.operand1, args.operand2, &args.operator)
                .context("cannot derive EXPECTED; pass it explicitly")?,
        };

        Ok(Self {
            server_addr: args.server_addr,
            message_count: args.message_count,
            operand1: args.operand1,
            operand2: args.operand2,
            operator: args.operator,
            expected,
            send_buffer_size: args.send_buffer_size,
            compression: args.compression,
            progress_interval: args.progress_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_workload() {
        let args = CliArgs::try_parse_from(["maths-tonic-client"]).unwrap();
        let config = DriverConfig::try_from(args).unwrap();
        assert_eq!(config.message_count, 1_000_000);
        assert_eq!(config.request().operator, "/");
        assert_eq!(config.expected, 32.0);
        assert_eq!(config.compression, Compression::None);
    }

    #[test]
    fn expected_is_derived_from_the_request() {
        let args = CliArgs::try_parse_from([
            "maths-tonic-client",
            "--operand1",
            "-3",
            "--operand2",
            "4",
            "--operator",
            "*",
        ])
        .unwrap();
        assert_eq!(DriverConfig::try_from(args).unwrap().expected, -12.0);
    }

    #[test]
    fn unknown_operator_needs_explicit_expected() {
        let args =
            CliArgs::try_parse_from(["maths-tonic-client", "--operator", "%"]).unwrap();
        assert!(DriverConfig::try_from(args).is_err());

        let args = CliArgs::try_parse_from([
            "maths-tonic-client",
            "--operator",
            "%",
            "--expected",
            "0",
        ])
        .unwrap();
        assert_eq!(DriverConfig::try_from(args).unwrap().expected, 0.0);
    }

    #[test]
    fn rejects_empty_send_buffer() {
        let args =
            CliArgs::try_parse_from(["maths-tonic-client", "--send-buffer-size", "0"]).unwrap();
        assert!(DriverConfig::try_from(args).is_err());
    }

    #[test]
    fn compression_parses_into_encoding() {
        let c: Compression = "ZSTD".parse().unwrap();
        assert_eq!(Option::<CompressionEncoding>::from(c), Some(CompressionEncoding::Zstd));
        assert_eq!(Option::<CompressionEncoding>::from(Compression::None), None);
        assert!("brotli".parse::<Compression>().is_err());
    }
}
