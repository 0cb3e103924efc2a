use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use crate::config::DiscordConfig;
use crate::contract::Notifier;
use crate::error::NotifyError;
use crate::http::send_with_header_timeout;

/// Prefix of every announcement; the public object URL follows it.
pub const ANNOUNCEMENT_PREFIX: &str = "New Release :> ";

/// Message announcing an object now reachable at `url`.
pub fn announcement(url: &str) -> String {
    format!("{ANNOUNCEMENT_PREFIX}{url}")
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

/// Posts to one Discord channel as a bot.
pub struct DiscordNotifier {
    http: Client,
    api_url: String,
    token: String,
    channel_id: String,
    header_timeout: Duration,
}

impl DiscordNotifier {
    pub fn new(http: Client, config: &DiscordConfig, header_timeout: Duration) -> Self {
        Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            channel_id: config.channel_id.clone(),
            header_timeout,
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn post(&self, message: &str) -> Result<(), NotifyError> {
        let url = format!("{}/channels/{}/messages", self.api_url, self.channel_id);
        let request = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .json(&CreateMessage { content: message });

        let response = send_with_header_timeout(request, self.header_timeout)
            .await
            .map_err(|e| {
                error!(error = %e, channel_id = %self.channel_id, "Error sending message");
                NotifyError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, channel_id = %self.channel_id, body = %body, "Discord rejected message");
            return Err(NotifyError::Rejected {
                status: status.to_string(),
                body,
            });
        }

        info!(channel_id = %self.channel_id, message, "Posted announcement");
        Ok(())
    }
}
