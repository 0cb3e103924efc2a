use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Three independent bounds so a stalled remote cannot hang the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Establishing the TCP/TLS connection.
    pub connect: Duration,
    /// From sending the request until response headers arrive.
    pub response_header: Duration,
    /// The whole request, body included.
    pub overall: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            response_header: Duration::from_secs(5),
            overall: Duration::from_secs(60),
        }
    }
}

/// One client for the whole process, shared by every adapter.
pub fn build_client(timeouts: &HttpTimeouts) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.overall)
        .build()
}

/// Client for object uploads: connect bound only.
///
/// A PUT of a release binary runs as long as the uplink needs, so neither the overall
/// bound nor the response-header bound applies to it.
pub fn build_upload_client(timeouts: &HttpTimeouts) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(timeouts.connect)
        .build()
}

#[derive(Debug)]
pub enum SendError {
    HeaderTimeout(Duration),
    Transport(reqwest::Error),
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::HeaderTimeout(after) => write!(f, "no response headers within {after:?}"),
            SendError::Transport(e) => write!(f, "{e}"),
        }
    }
}

/// Sends `request`, giving up if the response headers take longer than `header_timeout`.
///
/// `send()` resolves once headers are in, so the response body is still bounded only by
/// the client's overall timeout. The timer covers writing the request body too, so only
/// use this for requests without a large body.
pub async fn send_with_header_timeout(
    request: RequestBuilder,
    header_timeout: Duration,
) -> Result<Response, SendError> {
    match tokio::time::timeout(header_timeout, request.send()).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(e)) => Err(SendError::Transport(e)),
        Err(_) => Err(SendError::HeaderTimeout(header_timeout)),
    }
}
