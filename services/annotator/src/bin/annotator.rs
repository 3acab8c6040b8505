//! services/annotator/src/bin/annotator.rs

use annotation_core::AnnotationClient;
use annotator_lib::{
    adapters::HttpTransport,
    cli::{run, Cli},
    config::Config,
    error::AppError,
};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!(base_url = %config.base_url, "Configuration loaded");

    // --- 2. Wire the Backend Transport ---
    let transport = Arc::new(HttpTransport::new(&config.base_url)?);
    let client = AnnotationClient::new(transport);

    // --- 3. Run the Command ---
    let output = run(cli.command, &client, &config).await?;
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &output)?;
    writeln!(stdout)?;

    Ok(())
}
