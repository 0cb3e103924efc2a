use anyhow::Result;
use clap::Parser;
use release_mirror::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    Cli::parse();
    tracing::info!("CLI arguments parsed, invoking run");
    let result = run().await;
    match &result {
        Ok(_) => tracing::info!("Run completed successfully"),
        Err(e) => tracing::error!(error = %format!("{e:#}"), "Run exited with error"),
    }
    result
}
