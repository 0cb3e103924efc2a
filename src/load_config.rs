use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info};

use crate::config::{
    default_staging_dir, CosConfig, DiscordConfig, GithubConfig, MirrorConfig,
    DEFAULT_DISCORD_API_URL, DEFAULT_GITHUB_API_URL,
};
use crate::contract::Repository;
use crate::http::HttpTimeouts;
use crate::synchronise::FailurePolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Loads the run configuration from the process environment.
///
/// Call `dotenvy::dotenv()` first if a `.env` file should be honoured. Fails before
/// anything touches the network when a required value is absent or empty.
pub fn load_config() -> Result<MirrorConfig, ConfigError> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Same as [`load_config`], reading values through `lookup`.
pub fn load_config_from<F>(lookup: F) -> Result<MirrorConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &'static str| -> Result<String, ConfigError> {
        match lookup(key).filter(|v| !v.trim().is_empty()) {
            Some(value) => Ok(value),
            None => {
                error!(var = key, "Required environment variable not set");
                Err(ConfigError::Missing(key))
            }
        }
    };
    let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let repository = Repository {
        owner: required("GITHUB_OWNER")?,
        name: required("GITHUB_REPO")?,
        token: required("GITHUB_TOKEN")?,
    };

    let cos = CosConfig {
        bucket: required("COS_BUCKET")?,
        region: required("COS_REGION")?,
        secret_id: required("COS_SECRET_ID")?,
        secret_key: required("COS_SECRET_KEY")?,
    };

    let discord = DiscordConfig {
        token: required("DISCORD_TOKEN")?,
        channel_id: required("DISCORD_CHANNEL_ID")?,
        api_url: optional("DISCORD_API_URL")
            .unwrap_or_else(|| DEFAULT_DISCORD_API_URL.to_string()),
    };

    let github = GithubConfig {
        repository,
        api_url: optional("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
    };

    let defaults = HttpTimeouts::default();
    let http = HttpTimeouts {
        connect: seconds(&optional, "HTTP_CONNECT_TIMEOUT_SECS")?.unwrap_or(defaults.connect),
        response_header: seconds(&optional, "HTTP_HEADER_TIMEOUT_SECS")?
            .unwrap_or(defaults.response_header),
        overall: seconds(&optional, "HTTP_TIMEOUT_SECS")?.unwrap_or(defaults.overall),
    };

    let staging_dir = optional("STAGING_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(default_staging_dir);

    let failure_policy = match optional("SYNC_FAILURE_POLICY") {
        None => FailurePolicy::default(),
        Some(raw) => raw.parse::<FailurePolicy>().map_err(|reason| {
            error!(value = %raw, "Unsupported SYNC_FAILURE_POLICY");
            ConfigError::Invalid {
                var: "SYNC_FAILURE_POLICY",
                reason,
            }
        })?,
    };

    info!(
        github_api = %github.api_url,
        discord_api = %discord.api_url,
        "Configuration read from environment"
    );

    Ok(MirrorConfig {
        github,
        cos,
        discord,
        http,
        staging_dir,
        failure_policy,
    })
}

fn seconds<F>(optional: &F, var: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = optional(var) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
        Ok(_) => Err(ConfigError::Invalid {
            var,
            reason: "must be greater than zero".to_string(),
        }),
        Err(e) => {
            error!(error = ?e, var, value = %raw, "Timeout must be a whole number of seconds");
            Err(ConfigError::Invalid {
                var,
                reason: e.to_string(),
            })
        }
    }
}
