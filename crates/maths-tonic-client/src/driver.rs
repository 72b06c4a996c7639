//! The stream driver: one `DoMathStream` call, two concurrent tasks.
//!
//! The sender task pushes requests into a bounded channel that feeds the
//! call's outbound stream and half-closes by dropping its end. The receiver
//! task reads responses off the same call and validates each. The two never
//! coordinate directly; they only rely on the server answering in request
//! order. Awaiting the receiver's [`JoinHandle`](tokio::task::JoinHandle) is
//! the single completion barrier.

use core::{fmt, time::Duration};
use maths_tonic_core::{
    Error, Result,
    proto::{MathRequest, MathResponse, maths_client::MathsClient},
};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tonic::{
    Status,
    codec::CompressionEncoding,
    transport::{Channel, Endpoint},
};

use crate::config::DriverConfig;

/// Outcome of a successful [`StreamDriver::run`].
#[derive(Debug, Clone, Copy)]
pub struct DriverReport {
    pub sent: u64,
    pub received: u64,
    pub elapsed: Duration,
}

impl DriverReport {
    /// Validated responses per second.
    pub fn throughput(&self) -> f64 {
        self.received as f64 / self.elapsed.as_secs_f64()
    }
}

impl fmt::Display for DriverReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sent | {} validated | {:.2} ms | {:.2} msg/sec",
            self.sent,
            self.received,
            self.elapsed.as_secs_f64() * 1000.0,
            self.throughput()
        )
    }
}

pub struct StreamDriver {
    client: MathsClient<Channel>,
    config: DriverConfig,
}

impl StreamDriver {
    /// Connects to `config.server_addr`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connect`] if the address is malformed or the server
    /// cannot be reached.
    pub async fn connect(config: DriverConfig) -> Result<Self> {
        let endpoint = Endpoint::from_shared(config.server_addr.clone()).map_err(|e| {
            Error::Connect {
                context: format!("invalid server address {:?}: {e}", config.server_addr),
            }
        })?;
        let channel = endpoint.connect().await.map_err(|e| Error::Connect {
            context: format!("{}: {e}", config.server_addr),
        })?;
        Ok(Self::new(channel, config))
    }

    /// Wraps an already established channel.
    pub fn new(channel: Channel, config: DriverConfig) -> Self {
        let mut client = MathsClient::new(channel);
        if let Some(encoding) = Option::<CompressionEncoding>::from(config.compression) {
            client = client.send_compressed(encoding).accept_compressed(encoding);
        }
        Self { client, config }
    }

    /// Opens the stream, sends `message_count` requests while concurrently
    /// validating as many responses, then drains the stream.
    ///
    /// # Errors
    ///
    /// - [`Error::StreamOpen`] if the call is refused.
    /// - [`Error::Transport`] if a response cannot be read.
    /// - [`Error::Validation`] on the first response with the wrong result.
    /// - [`Error::StreamClosed`] / [`Error::UnexpectedResponse`] if the server
    ///   answers fewer or more responses than requests.
    ///
    /// On any receiver failure the sender task is aborted.
    #[tracing::instrument(skip_all, fields(count = self.config.message_count))]
    pub async fn run(mut self) -> Result<DriverReport> {
        let start = Instant::now();
        let count = self.config.message_count;

        let (req_tx, req_rx) = mpsc::channel(self.config.send_buffer_size);
        let sender = tokio::spawn(send_requests(req_tx, self.config.request(), count));

        let inbound = match self
            .client
            .do_math_stream(ReceiverStream::new(req_rx))
            .await
        {
            Ok(response) => response.into_inner(),
            Err(status) => {
                sender.abort();
                return Err(Error::StreamOpen(status));
            }
        };

        let receiver = tokio::spawn(receive_responses(
            inbound,
            count,
            self.config.expected,
            self.config.progress_interval,
        ));

        let received = match receiver.await {
            Ok(Ok(received)) => received,
            Ok(Err(e)) => {
                sender.abort();
                return Err(e);
            }
            Err(e) => {
                sender.abort();
                return Err(Error::TaskFailed {
                    context: format!("receiver: {e}"),
                });
            }
        };

        // Every response arrived, so every request was already handed to the
        // transport.
        let sent = sender.await.map_err(|e| Error::TaskFailed {
            context: format!("sender: {e}"),
        })??;

        Ok(DriverReport {
            sent,
            received,
            elapsed: start.elapsed(),
        })
    }
}

/// Pushes `count` copies of `request` into the outbound stream, then drops
/// `tx`, which half-closes the call.
pub async fn send_requests(
    tx: mpsc::Sender<MathRequest>,
    request: MathRequest,
    count: u64,
) -> Result<u64> {
    for sent in 0..count {
        if tx.send(request.clone()).await.is_err() {
            return Err(Error::ChannelError {
                context: format!("request stream closed after {sent} of {count} requests"),
            });
        }
    }

    tracing::debug!("All {count} requests sent, half-closing");
    Ok(count)
}

/// Reads exactly `count` responses, each of which must equal `expected`, then
/// requires the stream to end cleanly.
pub async fn receive_responses<S>(
    mut inbound: S,
    count: u64,
    expected: f64,
    progress_interval: u64,
) -> Result<u64>
where
    S: Stream<Item = core::result::Result<MathResponse, Status>> + Unpin,
{
    for index in 0..count {
        let response = match inbound.next().await {
            Some(Ok(response)) => response,
            Some(Err(status)) => return Err(Error::Transport(status)),
            None => {
                return Err(Error::StreamClosed {
                    received: index,
                    expected: count,
                });
            }
        };

        if !same_result(response.result, expected) {
            return Err(Error::Validation {
                index,
                expected,
                actual: response.result,
            });
        }

        if progress_interval > 0 && (index + 1) % progress_interval == 0 {
            tracing::info!("Validated {} of {count} responses", index + 1);
        }
    }

    match inbound.next().await {
        None => Ok(count),
        Some(Ok(_)) => Err(Error::UnexpectedResponse { index: count }),
        Some(Err(status)) => Err(Error::Transport(status)),
    }
}

// NaN never compares equal, but `0 / 0` legitimately expects it.
fn same_result(actual: f64, expected: f64) -> bool {
    actual == expected || (actual.is_nan() && expected.is_nan())
}
