use anyhow::Result;
use core::time::Duration;
use maths_tonic_core::{
    OperatorPolicy,
    proto::{MathRequest, MathResponse, maths_client::MathsClient},
};
use maths_tonic_server::{MathsService, ServerConfig, run_server_with_incoming};
use tokio::{
    net::TcpListener,
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::timeout,
};
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tonic::{Code, Streaming, transport::Channel};

struct TestServer {
    endpoint: String,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<anyhow::Result<()>>,
}

async fn spawn_server(config: ServerConfig) -> Result<TestServer> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (shutdown, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(run_server_with_incoming(
        MathsService::new(config),
        TcpListenerStream::new(listener),
        async move {
            let _ = rx.await;
        },
    ));

    Ok(TestServer {
        endpoint: format!("http://{addr}"),
        shutdown,
        handle,
    })
}

async fn connect(server: &TestServer) -> Result<MathsClient<Channel>> {
    Ok(MathsClient::connect(server.endpoint.clone()).await?)
}

fn request(operand1: f64, operand2: f64, operator: &str) -> MathRequest {
    MathRequest {
        operand1,
        operand2,
        operator: operator.to_string(),
    }
}

async fn next_result(inbound: &mut Streaming<MathResponse>) -> Result<f64> {
    match inbound.message().await? {
        Some(resp) => Ok(resp.result),
        None => anyhow::bail!("stream ended early"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn responses_preserve_request_order() -> Result<()> {
    let server = spawn_server(ServerConfig::default()).await?;
    let mut client = connect(&server).await?;

    let requests = (0..1_000).map(|i| request(f64::from(i), 3.0, "*"));
    let mut inbound = client
        .do_math_stream(tokio_stream::iter(requests))
        .await?
        .into_inner();

    for i in 0..1_000 {
        assert_eq!(next_result(&mut inbound).await?, f64::from(i) * 3.0);
    }
    assert!(inbound.message().await?.is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn half_close_still_drains_pending_responses() -> Result<()> {
    let server = spawn_server(ServerConfig::default()).await?;
    let mut client = connect(&server).await?;

    let (tx, rx) = mpsc::channel(1_024);
    let mut inbound = client
        .do_math_stream(ReceiverStream::new(rx))
        .await?
        .into_inner();

    for i in 0..500 {
        tx.send(request(f64::from(i), 1.0, "-")).await?;
    }
    // Half-close before reading a single response.
    drop(tx);

    for i in 0..500 {
        assert_eq!(next_result(&mut inbound).await?, f64::from(i) - 1.0);
    }
    assert!(inbound.message().await?.is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_send_and_receive_pair_every_response() -> Result<()> {
    const COUNT: u32 = 10_000;

    let server = spawn_server(ServerConfig::default()).await?;
    let mut client = connect(&server).await?;

    let (tx, rx) = mpsc::channel(16);
    let mut inbound = client
        .do_math_stream(ReceiverStream::new(rx))
        .await?
        .into_inner();

    let sender = tokio::spawn(async move {
        for i in 0..COUNT {
            let a = f64::from(i);
            tx.send(request(a, a + 1.0, "+")).await?;
        }
        Ok::<_, anyhow::Error>(())
    });

    let receiver = tokio::spawn(async move {
        for i in 0..COUNT {
            let a = f64::from(i);
            assert_eq!(next_result(&mut inbound).await?, a + a + 1.0);
        }
        assert!(inbound.message().await?.is_none());
        Ok::<_, anyhow::Error>(())
    });

    receiver.await??;
    sender.await??;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn division_by_zero_passes_through() -> Result<()> {
    let server = spawn_server(ServerConfig::default()).await?;
    let mut client = connect(&server).await?;

    let requests = [request(1.0, 0.0, "/"), request(0.0, 0.0, "/"), request(64.0, 2.0, "/")];
    let mut inbound = client
        .do_math_stream(tokio_stream::iter(requests))
        .await?
        .into_inner();

    assert_eq!(next_result(&mut inbound).await?, f64::INFINITY);
    assert!(next_result(&mut inbound).await?.is_nan());
    assert_eq!(next_result(&mut inbound).await?, 32.0);
    assert!(inbound.message().await?.is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unknown_operator_is_rejected_by_default() -> Result<()> {
    let server = spawn_server(ServerConfig::default()).await?;
    let mut client = connect(&server).await?;

    let requests = [request(1.0, 2.0, "+"), request(1.0, 2.0, "^"), request(1.0, 2.0, "+")];
    let mut inbound = client
        .do_math_stream(tokio_stream::iter(requests))
        .await?
        .into_inner();

    assert_eq!(next_result(&mut inbound).await?, 3.0);
    let status = inbound.message().await.unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unknown_operator_answers_zero_when_configured() -> Result<()> {
    let server = spawn_server(ServerConfig {
        operator_policy: OperatorPolicy::Zero,
        ..ServerConfig::default()
    })
    .await?;
    let mut client = connect(&server).await?;

    let requests = [request(1.0, 2.0, "^"), request(6.0, 2.0, "/")];
    let mut inbound = client
        .do_math_stream(tokio_stream::iter(requests))
        .await?
        .into_inner();

    assert_eq!(next_result(&mut inbound).await?, 0.0);
    assert_eq!(next_result(&mut inbound).await?, 3.0);
    assert!(inbound.message().await?.is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_streams_do_not_interfere() -> Result<()> {
    let server = spawn_server(ServerConfig::default()).await?;
    let client = connect(&server).await?;

    let mut handles = Vec::new();
    for stream_id in 0..8 {
        let mut client = client.clone();
        handles.push(tokio::spawn(async move {
            let base = f64::from(stream_id) * 1_000.0;
            let requests = (0..200).map(move |i| request(base, f64::from(i), "+"));
            let mut inbound = client
                .do_math_stream(tokio_stream::iter(requests))
                .await?
                .into_inner();
            for i in 0..200 {
                assert_eq!(next_result(&mut inbound).await?, base + f64::from(i));
            }
            Ok::<_, anyhow::Error>(())
        }));
    }

    for handle in handles {
        handle.await??;
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shutdown_cancels_inflight_streams() -> Result<()> {
    let server = spawn_server(ServerConfig {
        shutdown_timeout: 0,
        ..ServerConfig::default()
    })
    .await?;
    let mut client = connect(&server).await?;

    let (tx, rx) = mpsc::channel(8);
    let mut inbound = client
        .do_math_stream(ReceiverStream::new(rx))
        .await?
        .into_inner();

    tx.send(request(64.0, 2.0, "/")).await?;
    assert_eq!(next_result(&mut inbound).await?, 32.0);

    let _ = server.shutdown.send(());

    let status = timeout(Duration::from_secs(5), inbound.message())
        .await?
        .unwrap_err();
    assert_eq!(status.code(), Code::Unavailable);

    drop(tx);
    drop(inbound);
    drop(client);
    timeout(Duration::from_secs(5), server.handle).await???;
    Ok(())
}
