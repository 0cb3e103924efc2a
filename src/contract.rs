#![allow(unused)]

//! # contract: data model and collaborator interfaces
//!
//! This module defines the values the pipeline reads ([`Release`], [`Asset`],
//! [`Repository`]) and the three traits it drives:
//!
//! - [`ReleaseSource`]: latest-release metadata and asset bytes (GitHub in production).
//! - [`AssetStore`]: existence check and durable write keyed by object name (Tencent COS).
//! - [`Notifier`]: single-channel, best-effort announcement (Discord).
//!
//! ## Mocking & Testing
//! - The traits are annotated for `mockall` so tests can substitute any collaborator.
//!   Mocks are exported behind the default `test-export-mocks` feature for use from `tests/`.
//!
//! ## Invariants
//! - The set of object names in the [`AssetStore`] is the only record of prior runs.
//!   There is no ledger; `exists` must never have side effects.

use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use mockall::{automock, predicate::*};
use serde::Deserialize;

use crate::error::{NotifyError, SourceError, StoreError};

/// A stream of asset bytes, produced by the source and consumed by the store.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Repository coordinates plus the static token used to read it.
#[derive(Clone)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    pub token: String,
}

impl Repository {
    /// `owner/name`, for log lines.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// The latest published release of a repository.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    /// In the order delivered by the source platform.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// One downloadable file of a release.
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    /// Unique within the release; used to retrieve the bytes.
    pub id: u64,
    /// Display name, also the destination object key.
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Where release metadata and asset bytes come from.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Metadata of the latest release of `repo`.
    async fn fetch_latest(&self, repo: &Repository) -> Result<Release, SourceError>;

    /// Open a byte stream for one asset. A non-success status is an error.
    async fn retrieve_asset_bytes(
        &self,
        repo: &Repository,
        asset_id: u64,
    ) -> Result<ByteStream, SourceError>;
}

/// The destination bucket.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Whether an object named `name` is present.
    ///
    /// Failure to answer is `StoreError::Unavailable`, which is distinct from `Ok(false)`.
    async fn exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Store `body` under `name`, overwriting any existing object.
    async fn put(
        &self,
        name: &str,
        body: ByteStream,
        content_length: u64,
    ) -> Result<(), StoreError>;

    /// Public URL of the object named `name`.
    fn public_url(&self, name: &str) -> String;
}

/// Announces newly mirrored assets.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post(&self, message: &str) -> Result<(), NotifyError>;
}
