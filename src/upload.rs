#![doc = "Tencent COS implementation of the asset store: existence checks, streamed puts, and request signing."]
//
//! # COS object store
//!
//! [`CosStore`] implements [`AssetStore`] against a single bucket addressed by its
//! region/bucket-derived base URL (`https://<bucket>.cos.<region>.myqcloud.com`).
//!
//! - `exists` is a `HEAD /<key>`: 200 means present, 404 means absent, anything else
//!   (including transport failures and timeouts) is `StoreError::Unavailable`.
//! - `put` is a `PUT /<key>` with an explicit `Content-Length` and a streamed body.
//!   It has no response-header or overall bound; only the connect bound applies.
//! - `<key>` is percent-encoded as a single path segment, so `#`, `?` and `%` in an
//!   asset name stay part of the key.
//! - Every request carries an `Authorization` header built with the COS HMAC-SHA1
//!   scheme, see [`CosSigner`].

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use reqwest::{Body, Client, Method, StatusCode, Url};
use sha1::{Digest, Sha1};
use tracing::{debug, error, info};

use crate::config::CosConfig;
use crate::contract::{AssetStore, ByteStream};
use crate::error::StoreError;
use crate::http::send_with_header_timeout;

type HmacSha1 = Hmac<Sha1>;

/// How long a signature stays valid.
const SIGN_VALIDITY_SECS: u64 = 3600;

/// Builds COS `Authorization` header values.
///
/// No headers or query parameters are signed, so `q-header-list` and
/// `q-url-param-list` are empty.
pub struct CosSigner {
    secret_id: String,
    secret_key: String,
}

impl CosSigner {
    pub fn new(secret_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Signature valid over `[start, end]` (unix seconds) for `method` on `/<key>`.
    ///
    /// `key` is the decoded object name; the request line carries it percent-encoded.
    pub fn authorization(
        &self,
        method: &Method,
        key: &str,
        start: u64,
        end: u64,
    ) -> Result<String, StoreError> {
        let key_time = format!("{start};{end}");
        let sign_key = hmac_sha1_hex(self.secret_key.as_bytes(), key_time.as_bytes())?;

        let http_string = format!("{}\n/{}\n\n\n", method.as_str().to_lowercase(), key);
        let http_string_digest = format!("{:x}", Sha1::digest(http_string.as_bytes()));
        let string_to_sign = format!("sha1\n{key_time}\n{http_string_digest}\n");
        let signature = hmac_sha1_hex(sign_key.as_bytes(), string_to_sign.as_bytes())?;

        Ok(format!(
            "q-sign-algorithm=sha1&q-ak={}&q-sign-time={key_time}&q-key-time={key_time}&q-header-list=&q-url-param-list=&q-signature={signature}",
            self.secret_id
        ))
    }

    fn authorization_now(&self, method: &Method, key: &str) -> Result<String, StoreError> {
        let start = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| StoreError::Signing(e.to_string()))?
            .as_secs();
        self.authorization(method, key, start, start + SIGN_VALIDITY_SECS)
    }
}

fn hmac_sha1_hex(key: &[u8], data: &[u8]) -> Result<String, StoreError> {
    let mut mac =
        HmacSha1::new_from_slice(key).map_err(|e| StoreError::Signing(e.to_string()))?;
    mac.update(data);
    Ok(format!("{:x}", mac.finalize().into_bytes()))
}

pub struct CosStore {
    http: Client,
    base_url: Url,
    signer: CosSigner,
    header_timeout: Duration,
}

impl CosStore {
    /// `http` should come from [`build_upload_client`](crate::http::build_upload_client)
    /// so large PUTs are not cut off by an overall request bound.
    pub fn new(
        http: Client,
        base_url: &str,
        signer: CosSigner,
        header_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let invalid = |reason: String| StoreError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };
        let base_url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("not a hierarchical URL".to_string()));
        }
        Ok(Self {
            http,
            base_url,
            signer,
            header_timeout,
        })
    }

    /// Store for the bucket described by `config`.
    pub fn from_config(
        http: Client,
        config: &CosConfig,
        header_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let signer = CosSigner::new(config.secret_id.clone(), config.secret_key.clone());
        let store = Self::new(http, &config.bucket_url(), signer, header_timeout)?;
        info!(bucket = %config.bucket, region = %config.region, "Initialised COS store");
        Ok(store)
    }

    /// `<base>/<name>` with `name` percent-encoded as one path segment.
    fn object_url(&self, name: &str) -> Url {
        let mut url = self.base_url.clone();
        // cannot fail: `new` rejects cannot-be-a-base URLs
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(name);
        }
        url
    }
}

#[async_trait]
impl AssetStore for CosStore {
    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let unavailable = |reason: String| StoreError::Unavailable {
            name: name.to_string(),
            reason,
        };
        let authorization = self.signer.authorization_now(&Method::HEAD, name)?;
        let request = self
            .http
            .head(self.object_url(name))
            .header(AUTHORIZATION, authorization);

        let response = send_with_header_timeout(request, self.header_timeout)
            .await
            .map_err(|e| {
                error!(error = %e, object = name, "Existence check failed");
                unavailable(e.to_string())
            })?;

        match response.status() {
            StatusCode::OK => {
                debug!(object = name, "Object present");
                Ok(true)
            }
            StatusCode::NOT_FOUND => {
                debug!(object = name, "Object absent");
                Ok(false)
            }
            other => {
                error!(status = %other, object = name, "Existence check returned unexpected status");
                Err(unavailable(other.to_string()))
            }
        }
    }

    async fn put(
        &self,
        name: &str,
        body: ByteStream,
        content_length: u64,
    ) -> Result<(), StoreError> {
        let write_failed = |reason: String| StoreError::Write {
            name: name.to_string(),
            reason,
        };
        info!(object = name, bytes = content_length, "Uploading object");

        let authorization = self.signer.authorization_now(&Method::PUT, name)?;
        let request = self
            .http
            .put(self.object_url(name))
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_LENGTH, content_length)
            .body(Body::wrap_stream(body));

        // Response headers only arrive after the whole body is sent, so no header bound here.
        let response = request.send().await.map_err(|e| {
            error!(error = %e, object = name, "Upload request failed");
            write_failed(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, object = name, body = %text, "Upload rejected");
            return Err(write_failed(format!("{status}: {text}")));
        }

        info!(object = name, "Upload succeeded");
        Ok(())
    }

    fn public_url(&self, name: &str) -> String {
        self.object_url(name).to_string()
    }
}
