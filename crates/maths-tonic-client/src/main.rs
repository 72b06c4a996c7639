use clap::Parser;
use maths_tonic_client::{CliArgs, DriverConfig, StreamDriver};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = DriverConfig::try_from(args)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339()),
        )
        .try_init()?;

    tracing::info!(
        "Streaming {} x ({} {} {}) to {}, expecting {}",
        config.message_count,
        config.operand1,
        config.operator,
        config.operand2,
        config.server_addr,
        config.expected
    );

    let driver = StreamDriver::connect(config).await?;
    let report = driver.run().await?;

    tracing::info!("{report}");
    Ok(())
}
