use futures::{Stream, StreamExt};
use maths_tonic_core::{
    Error, OperatorPolicy,
    proto::{MathRequest, MathResponse},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// Drives a single `DoMathStream` call until the client half-closes.
///
/// Requests are read one at a time; each is evaluated and its response is sent
/// before the next request is read. Responses therefore leave in exactly the
/// order their requests arrived, one per request.
///
/// # Arguments
///
/// - `inbound`: The client's request stream.
/// - `resp_tx`: Channel feeding the gRPC response stream.
/// - `policy`: How to treat an operator other than `+ - * /`.
/// - `cancel`: Cancelled when the service gives up on in-flight streams during
///   shutdown.
///
/// # Behavior
///
/// - Returns `Ok(n)` with the number of requests answered once the client
///   signals end-of-input.
/// - A read failure is forwarded to the client (best effort) and returned as
///   [`Error::Transport`].
/// - An unsupported operator under [`OperatorPolicy::Reject`] terminates the
///   stream with `INVALID_ARGUMENT`.
/// - If the response channel is closed (client gone), returns
///   [`Error::ChannelError`].
/// - On cancellation, the client receives `UNAVAILABLE` and
///   [`Error::ServiceShutdown`] is returned.
pub async fn process_stream<S>(
    mut inbound: S,
    resp_tx: mpsc::Sender<Result<MathResponse, Status>>,
    policy: OperatorPolicy,
    cancel: CancellationToken,
) -> maths_tonic_core::Result<u64>
where
    S: Stream<Item = Result<MathRequest, Status>> + Unpin,
{
    let mut answered = 0_u64;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(abandon_stream(&resp_tx)),
            next = inbound.next() => next,
        };

        let request = match next {
            Some(Ok(request)) => request,
            // Client half-closed: every request seen so far has been answered.
            None => return Ok(answered),
            Some(Err(status)) => {
                let err = Error::Transport(status);
                return Err(fail_stream(&resp_tx, err, &cancel).await);
            }
        };

        let result = match policy.evaluate(request.operand1, request.operand2, &request.operator)
        {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!("Rejecting request {answered}: {e}");
                return Err(fail_stream(&resp_tx, e, &cancel).await);
            }
        };

        // A client that stops reading fills the channel; shutdown must still
        // be able to tear the stream down.
        let sent = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(abandon_stream(&resp_tx)),
            sent = resp_tx.send(Ok(MathResponse { result })) => sent,
        };
        if let Err(e) = sent {
            return Err(Error::ChannelError {
                context: format!("Failed to forward response {answered}: {e}"),
            });
        }

        answered += 1;
    }
}

/// Makes a best effort to surface `err` to the client and returns it. The
/// client may already be gone, in which case the failure is only logged.
/// Shutdown interrupts the wait and takes precedence over `err`.
async fn fail_stream(
    resp_tx: &mpsc::Sender<Result<MathResponse, Status>>,
    err: Error,
    cancel: &CancellationToken,
) -> Error {
    tokio::select! {
        biased;
        () = cancel.cancelled() => abandon_stream(resp_tx),
        sent = resp_tx.send(Err(err.clone().into())) => {
            if sent.is_err() {
                tracing::debug!("Failed to forward err: client disconnected");
            }
            err
        }
    }
}

/// Tells the client the service is going away without waiting for room in
/// the response channel.
fn abandon_stream(resp_tx: &mpsc::Sender<Result<MathResponse, Status>>) -> Error {
    if resp_tx.try_send(Err(Error::ServiceShutdown.into())).is_err() {
        tracing::debug!("Response channel full or closed; dropping shutdown status");
    }
    Error::ServiceShutdown
}
