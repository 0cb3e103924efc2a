//!
//! Command-line glue for the `release-mirror` binary.
//!
//! The binary takes no configuration flags: everything comes from the environment
//! (see [`crate::load_config`]). `clap` supplies `--help` and `--version`.
//! [`run`] constructs the HTTP clients and the three collaborators once, then hands them
//! to the [`SyncOrchestrator`]. COS gets its own client without the overall bound so
//! large uploads are not cut off.
use anyhow::{Context, Result};
use clap::Parser;

use crate::download::GithubClient;
use crate::http::{build_client, build_upload_client};
use crate::load_config::load_config;
use crate::notify::DiscordNotifier;
use crate::synchronise::SyncOrchestrator;
use crate::upload::CosStore;

/// Mirror the latest GitHub release's assets into a Tencent COS bucket and announce them on Discord.
#[derive(Parser)]
#[clap(
    name = "release-mirror",
    version,
    about = "Mirror the latest GitHub release's assets into a Tencent COS bucket and announce them on Discord",
    after_help = "Configuration is read from the environment (and a .env file in the working directory):\n  \
                  GITHUB_OWNER, GITHUB_REPO, GITHUB_TOKEN, COS_BUCKET, COS_REGION, COS_SECRET_ID,\n  \
                  COS_SECRET_KEY, DISCORD_TOKEN, DISCORD_CHANNEL_ID"
)]
pub struct Cli {}

/// Extracted async CLI logic entrypoint for integration tests and main().
///
/// [`Cli`] carries no options, so `main` parses it for `--help`/`--version` and then calls this.
pub async fn run() -> Result<()> {
    let config = load_config().context("invalid configuration")?;
    config.trace_loaded();

    let http = build_client(&config.http).context("failed to build HTTP client")?;
    let header_timeout = config.http.response_header;

    let source = GithubClient::new(http.clone(), config.github.api_url.clone(), header_timeout);
    let upload_http =
        build_upload_client(&config.http).context("failed to build upload HTTP client")?;
    let store = CosStore::from_config(upload_http, &config.cos, header_timeout)
        .context("invalid COS bucket configuration")?;
    let notifier = DiscordNotifier::new(http, &config.discord, header_timeout);

    let orchestrator = SyncOrchestrator::new(&source, &store, &notifier, &config.staging_dir)
        .with_policy(config.failure_policy);

    match orchestrator.run(&config.github.repository).await {
        Ok(report) => {
            tracing::info!(
                command = "sync",
                tag = %report.tag,
                mirrored = report.mirrored(),
                skipped = report.skipped(),
                "Synchronisation complete"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "sync", error = %e, "Synchronisation failed");
            Err(anyhow::Error::new(e).context("synchronisation failed"))
        }
    }
}
