//! GitHub implementation of [`ReleaseSource`].

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, error, info};

use crate::contract::{ByteStream, Release, ReleaseSource, Repository};
use crate::error::SourceError;
use crate::http::{send_with_header_timeout, SendError};

pub struct GithubClient {
    http: Client,
    api_url: String,
    header_timeout: Duration,
}

impl GithubClient {
    pub fn new(http: Client, api_url: impl Into<String>, header_timeout: Duration) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            header_timeout,
        }
    }

    fn latest_release_url(&self, repo: &Repository) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_url, repo.owner, repo.name
        )
    }

    fn asset_url(&self, repo: &Repository, asset_id: u64) -> String {
        format!(
            "{}/repos/{}/{}/releases/assets/{}",
            self.api_url, repo.owner, repo.name, asset_id
        )
    }
}

fn send_error(e: SendError) -> SourceError {
    match e {
        SendError::HeaderTimeout(after) => SourceError::Timeout(after),
        SendError::Transport(e) => SourceError::Network(e),
    }
}

/// Maps a non-success status onto the source error taxonomy.
fn status_error(status: StatusCode, what: String) -> SourceError {
    let status_text = status.to_string();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::Auth {
            status: status_text,
        },
        StatusCode::NOT_FOUND => SourceError::NotFound {
            what,
            status: status_text,
        },
        _ => SourceError::UnexpectedStatus {
            status: status_text,
        },
    }
}

#[async_trait]
impl ReleaseSource for GithubClient {
    async fn fetch_latest(&self, repo: &Repository) -> Result<Release, SourceError> {
        let url = self.latest_release_url(repo);
        info!(repo = %repo.slug(), "Fetching latest release");

        let request = self
            .http
            .get(&url)
            .bearer_auth(&repo.token)
            .header(ACCEPT, "application/vnd.github+json");
        let response = send_with_header_timeout(request, self.header_timeout)
            .await
            .map_err(|e| {
                error!(error = %e, url = %url, "Latest release request failed");
                send_error(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, repo = %repo.slug(), "Failed to retrieve release information");
            return Err(status_error(
                status,
                format!("latest release of {}", repo.slug()),
            ));
        }

        let body = response.text().await?;
        let release: Release = serde_json::from_str(&body).map_err(|e| {
            error!(error = ?e, repo = %repo.slug(), "Release metadata did not decode");
            SourceError::Decode(e)
        })?;

        info!(
            repo = %repo.slug(),
            tag = %release.tag_name,
            assets = release.assets.len(),
            "Fetched latest release"
        );
        Ok(release)
    }

    async fn retrieve_asset_bytes(
        &self,
        repo: &Repository,
        asset_id: u64,
    ) -> Result<ByteStream, SourceError> {
        let url = self.asset_url(repo, asset_id);
        debug!(url = %url, "Requesting asset bytes");

        let request = self
            .http
            .get(&url)
            .bearer_auth(&repo.token)
            .header(ACCEPT, "application/octet-stream");
        let response: Response = send_with_header_timeout(request, self.header_timeout)
            .await
            .map_err(send_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            error!(status = %status, asset_id, "Asset download returned non-200 status");
            return Err(status_error(status, format!("asset {asset_id}")));
        }

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::pin(stream))
    }
}
