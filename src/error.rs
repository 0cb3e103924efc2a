//! Error taxonomy for the mirror pipeline.
//!
//! Each collaborator owns one enum; the orchestrator wraps them in [`SyncError`]
//! together with the name of the asset being processed. Nothing here is retried.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::synchronise::SynchroniseReport;

/// Failures of the release source (GitHub).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("authentication rejected by release source ({status})")]
    Auth { status: String },

    #[error("{what} not found ({status})")]
    NotFound { what: String, status: String },

    #[error("unexpected response from release source: {status}")]
    UnexpectedStatus { status: String },

    #[error("network error talking to release source: {0}")]
    Network(#[from] reqwest::Error),

    #[error("no response headers from release source within {0:?}")]
    Timeout(Duration),

    #[error("could not decode release metadata: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Failures of the destination object store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("existence check for {name} could not complete: {reason}")]
    Unavailable { name: String, reason: String },

    #[error("writing {name} failed: {reason}")]
    Write { name: String, reason: String },

    #[error("could not sign store request: {0}")]
    Signing(String),

    #[error("invalid store base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Failures posting an announcement.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Request(String),

    #[error("notification rejected ({status}): {body}")]
    Rejected { status: String, body: String },
}

/// Which part of a staged transfer went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    Staging,
    Download,
    Upload,
    Cleanup,
}

/// Failures moving one asset through the local staging file.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("cannot stage {asset}: {source}")]
    Staging {
        asset: String,
        #[source]
        source: std::io::Error,
    },

    #[error("download of {asset} failed: {source}")]
    Download {
        asset: String,
        #[source]
        source: SourceError,
    },

    #[error("download of {asset} failed while writing the staging file: {source}")]
    DownloadIo {
        asset: String,
        #[source]
        source: std::io::Error,
    },

    #[error("upload of {asset} failed: {source}")]
    Upload {
        asset: String,
        #[source]
        source: StoreError,
    },

    #[error("upload of {asset} failed while reading the staging file: {source}")]
    UploadIo {
        asset: String,
        #[source]
        source: std::io::Error,
    },

    #[error("staging file {} for {asset} could not be removed: {source}", .path.display())]
    Cleanup {
        asset: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransferError {
    pub fn phase(&self) -> TransferPhase {
        match self {
            TransferError::Staging { .. } => TransferPhase::Staging,
            TransferError::Download { .. } | TransferError::DownloadIo { .. } => {
                TransferPhase::Download
            }
            TransferError::Upload { .. } | TransferError::UploadIo { .. } => TransferPhase::Upload,
            TransferError::Cleanup { .. } => TransferPhase::Cleanup,
        }
    }

    pub fn asset(&self) -> &str {
        match self {
            TransferError::Staging { asset, .. }
            | TransferError::Download { asset, .. }
            | TransferError::DownloadIo { asset, .. }
            | TransferError::Upload { asset, .. }
            | TransferError::UploadIo { asset, .. }
            | TransferError::Cleanup { asset, .. } => asset,
        }
    }
}

/// Terminal outcome of a run that did not complete cleanly.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("fetching the latest release failed: {0}")]
    Fetch(#[source] SourceError),

    #[error("cannot tell whether {asset} is already mirrored: {source}")]
    StoreUnavailable {
        asset: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("announcing {asset} failed (the object is already stored): {source}")]
    Notify {
        asset: String,
        #[source]
        source: NotifyError,
    },

    #[error("{failed} of {} assets failed to mirror", .report.assets.len())]
    Incomplete {
        failed: usize,
        report: SynchroniseReport,
    },
}
