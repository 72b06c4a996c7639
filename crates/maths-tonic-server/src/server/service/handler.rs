//! gRPC service implementation for the bidirectional calculator stream.
//!
//! This module defines [`MathsService`], the concrete implementation of the
//! [`Maths`] gRPC service defined in the protobuf schema. Each
//! `DoMathStream` call is handled by its own task which reads requests,
//! evaluates them and writes one response per request, in order.
//!
//! ## Responsibilities
//!
//! - Admit or refuse new streams depending on shutdown state.
//! - Spawn one [`process_stream`] task per call and hand its output channel to
//!   tonic as the response stream.
//! - Record per-stream telemetry.
//! - Coordinate graceful shutdown through the [`StreamTracker`].

use crate::server::{
    config::ServerConfig,
    service::tracker::StreamTracker,
    streaming::processor::process_stream,
    telemetry::{
        decrement_streams_inflight, increment_requests, increment_responses_sent,
        increment_stream_errors, increment_streams_inflight, record_requests_per_stream,
        record_stream_duration,
    },
};
use core::{pin::Pin, time::Duration};
use futures::{StreamExt, TryStreamExt, stream};
use maths_tonic_core::{
    Error,
    proto::{MathRequest, MathResponse, maths_server::Maths},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tonic::{Request, Response, Status, Streaming};
use tracing::Instrument;

/// Stateless calculator service; the only shared state is stream accounting
/// for shutdown.
#[derive(Clone)]
pub struct MathsService {
    config: ServerConfig,
    tracker: Arc<StreamTracker>,
}

impl MathsService {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            tracker: StreamTracker::new(),
        }
    }

    /// Number of `DoMathStream` calls currently being handled.
    pub fn streams_inflight(&self) -> usize {
        self.tracker.inflight()
    }

    /// Initiates a graceful shutdown.
    ///
    /// New streams are refused immediately. In-flight streams get
    /// `shutdown_timeout` seconds to finish, after which they are cancelled and
    /// their clients receive `UNAVAILABLE`.
    pub async fn shutdown(&self) -> Result<(), Error> {
        let remaining = self
            .tracker
            .shutdown(Duration::from_secs(self.config.shutdown_timeout))
            .await;
        if remaining > 0 {
            tracing::warn!("Cancelled {remaining} in-flight streams");
        }
        tracing::info!("Maths service shutdown complete");
        Ok(())
    }
}

#[tonic::async_trait]
impl Maths for MathsService {
    type DoMathStreamStream = Pin<Box<dyn Stream<Item = Result<MathResponse, Status>> + Send>>;

    /// Handles one bidirectional calculator stream.
    ///
    /// Returns immediately with the response stream; the requests are consumed
    /// by a spawned task that lives until the client half-closes, the stream
    /// fails, or shutdown cancels it.
    #[tracing::instrument(skip_all, fields(remote = ?req.remote_addr()))]
    async fn do_math_stream(
        &self,
        req: Request<Streaming<MathRequest>>,
    ) -> Result<Response<Self::DoMathStreamStream>, Status> {
        let Some(guard) = self.tracker.admit() else {
            increment_stream_errors();
            return Err(Error::ServiceShutdown.into());
        };

        let start = std::time::Instant::now();
        increment_requests();
        increment_streams_inflight();

        let inbound = req.into_inner();
        let (resp_tx, resp_rx) =
            mpsc::channel::<Result<MathResponse, Status>>(self.config.stream_buffer_size);
        let policy = self.config.operator_policy;
        let cancel = self.tracker.cancel_token();
        let shutdown = cancel.clone();

        let fut = async move {
            match process_stream(inbound, resp_tx, policy, cancel).await {
                Ok(answered) => {
                    tracing::debug!("Client half-closed after {answered} requests");
                    record_requests_per_stream(answered as f64);
                }
                Err(e) => {
                    tracing::warn!("Stream terminated: {e}");
                }
            }
            decrement_streams_inflight();
            record_stream_duration(start.elapsed().as_millis() as f64);
            drop(guard);
        };
        tokio::spawn(fut.instrument(tracing::info_span!("do_math_stream")));

        // Cut the response stream at cancellation so responses a stalled client
        // never read cannot hold shutdown open; the client gets UNAVAILABLE.
        let cutoff = shutdown.clone();
        let stream = ReceiverStream::new(resp_rx)
            .take_until(shutdown.cancelled_owned())
            .chain(
                stream::once(async move { cutoff.is_cancelled() })
                    .filter_map(|cancelled| async move {
                        cancelled.then(|| Err::<MathResponse, Status>(Error::ServiceShutdown.into()))
                    }),
            )
            .inspect_ok(|_| increment_responses_sent(1))
            .inspect_err(|_| increment_stream_errors());

        Ok(Response::new(Box::pin(stream)))
    }
}
