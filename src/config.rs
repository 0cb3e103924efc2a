// release-mirror/src/config.rs

use std::path::PathBuf;

use tracing::{debug, info};

use crate::contract::Repository;
use crate::http::HttpTimeouts;
use crate::synchronise::FailurePolicy;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// Everything a run needs, loaded once from the environment.
#[derive(Debug)]
pub struct MirrorConfig {
    pub github: GithubConfig,
    pub cos: CosConfig,
    pub discord: DiscordConfig,
    pub http: HttpTimeouts,
    pub staging_dir: PathBuf,
    pub failure_policy: FailurePolicy,
}

impl MirrorConfig {
    pub fn trace_loaded(&self) {
        info!(
            repo = %self.github.repository.slug(),
            bucket = %self.cos.bucket,
            region = %self.cos.region,
            channel_id = %self.discord.channel_id,
            staging_dir = %self.staging_dir.display(),
            policy = ?self.failure_policy,
            "Loaded configuration"
        );
        debug!(config = ?self, "Configuration loaded (full debug)");
    }
}

#[derive(Debug)]
pub struct GithubConfig {
    pub repository: Repository,
    pub api_url: String,
}

pub struct CosConfig {
    pub bucket: String,
    pub region: String,
    pub secret_id: String,
    pub secret_key: String,
}

impl CosConfig {
    /// `https://<bucket>.cos.<region>.myqcloud.com`
    pub fn bucket_url(&self) -> String {
        format!("https://{}.cos.{}.myqcloud.com", self.bucket, self.region)
    }
}

impl std::fmt::Debug for CosConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("secret_id_set", &!self.secret_id.is_empty())
            .field("secret_key_set", &!self.secret_key.is_empty())
            .finish()
    }
}

pub struct DiscordConfig {
    pub token: String,
    pub channel_id: String,
    pub api_url: String,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("channel_id", &self.channel_id)
            .field("api_url", &self.api_url)
            .field("token_set", &!self.token.is_empty())
            .finish()
    }
}

pub fn default_staging_dir() -> PathBuf {
    std::env::temp_dir().join("release-mirror")
}
