//! High-level pipeline: mirrors the latest release's assets into the store.
//!
//! This module provides the top-level orchestration for one run. For every asset of
//! the latest release, in delivered order, it:
//!   - Asks the [`AssetStore`] whether an object with the asset's name exists
//!   - Skips the asset if it does (no download, no upload, no announcement)
//!   - Otherwise stages and uploads it via [`StagingTransfer`], then announces the
//!     object's public URL through the [`Notifier`]
//!
//! # Major Types
//! - [`SyncOrchestrator`]: holds the collaborators and drives the per-asset pass
//! - [`SynchroniseReport`]: per-asset [`SyncOutcome`]s for the run
//! - [`FailurePolicy`]: whether a per-asset failure ends the run or is recorded
//!
//! # Responsibilities
//! - Strictly sequential: one asset at a time, each step awaited before the next
//! - Idempotent across runs: the store's object names are the only record, so a second
//!   run over an unchanged release classifies every asset as [`SyncOutcome::Skipped`]
//! - No rollback: assets mirrored before a failure stay in the store
//!
//! # Error Handling
//! An existence check that cannot complete always aborts the run. Transfer and
//! notification failures abort under [`FailurePolicy::FailFast`] (the default); under
//! [`FailurePolicy::Continue`] they are recorded and the run ends with
//! [`SyncError::Incomplete`].

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{error, info, warn};

use crate::contract::{Asset, AssetStore, Notifier, ReleaseSource, Repository};
use crate::error::SyncError;
use crate::notify::announcement;
use crate::staging::StagingTransfer;

/// What to do when a single asset fails to transfer or be announced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the run on the first failure.
    #[default]
    FailFast,
    /// Record the failure and move on; the run still ends in error.
    Continue,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-fast" | "fail_fast" | "failfast" => Ok(FailurePolicy::FailFast),
            "continue" => Ok(FailurePolicy::Continue),
            other => Err(format!(
                "unknown failure policy {other:?} (expected \"fail-fast\" or \"continue\")"
            )),
        }
    }
}

/// Per-asset result of a run. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Already present in the store.
    Skipped,
    /// Transferred and announced during this run.
    Mirrored { url: String },
    /// Some stage errored (only recorded under [`FailurePolicy::Continue`]).
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct AssetReport {
    pub name: String,
    pub outcome: SyncOutcome,
}

#[derive(Debug, Clone)]
pub struct SynchroniseReport {
    pub tag: String,
    pub assets: Vec<AssetReport>,
}

impl SynchroniseReport {
    pub fn mirrored(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Mirrored { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&SyncOutcome) -> bool) -> usize {
        self.assets.iter().filter(|a| pred(&a.outcome)).count()
    }

    pub fn trace_summary(&self) {
        for asset in &self.assets {
            info!(asset = %asset.name, outcome = ?asset.outcome, "[SYNC] Asset outcome");
        }
        info!(
            tag = %self.tag,
            mirrored = self.mirrored(),
            skipped = self.skipped(),
            failed = self.failed(),
            "[SYNC] Run summary"
        );
    }
}

/// Drives one run over the latest release.
///
/// Collaborators are borrowed so callers construct them once and tests can pass mocks.
pub struct SyncOrchestrator<'a, R, S, N> {
    source: &'a R,
    store: &'a S,
    notifier: &'a N,
    transfer: StagingTransfer<'a, R, S>,
    policy: FailurePolicy,
}

impl<'a, R, S, N> SyncOrchestrator<'a, R, S, N>
where
    R: ReleaseSource,
    S: AssetStore,
    N: Notifier,
{
    pub fn new(
        source: &'a R,
        store: &'a S,
        notifier: &'a N,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            store,
            notifier,
            transfer: StagingTransfer::new(source, store, staging_dir),
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn run(&self, repo: &Repository) -> Result<SynchroniseReport, SyncError> {
        info!(repo = %repo.slug(), policy = ?self.policy, "[SYNC] Starting release mirror run");

        let release = self.source.fetch_latest(repo).await.map_err(|e| {
            error!(error = %e, repo = %repo.slug(), "[SYNC][ERROR] Fetching latest release failed");
            SyncError::Fetch(e)
        })?;
        info!(tag = %release.tag_name, assets = release.assets.len(), "[SYNC] Mirroring assets");
        if release.assets.is_empty() {
            warn!(tag = %release.tag_name, "[SYNC] Latest release has no assets");
        }

        let mut report = SynchroniseReport {
            tag: release.tag_name.clone(),
            assets: Vec::with_capacity(release.assets.len()),
        };

        for asset in &release.assets {
            info!(asset = %asset.name, "[SYNC] Checking existing object");
            let exists = self.store.exists(&asset.name).await.map_err(|e| {
                error!(asset = %asset.name, error = %e, "[SYNC][ERROR] Failed to check object");
                SyncError::StoreUnavailable {
                    asset: asset.name.clone(),
                    source: e,
                }
            })?;

            let outcome = if exists {
                info!(asset = %asset.name, "[SYNC] Object already exists, skipping");
                SyncOutcome::Skipped
            } else {
                match self.mirror(asset, repo).await {
                    Ok(url) => SyncOutcome::Mirrored { url },
                    Err(e) if self.policy == FailurePolicy::FailFast => {
                        error!(asset = %asset.name, error = %e, "[SYNC][ERROR] Aborting run");
                        return Err(e);
                    }
                    Err(e) => {
                        error!(asset = %asset.name, error = %e, "[SYNC][ERROR] Asset failed, continuing");
                        SyncOutcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                }
            };

            report.assets.push(AssetReport {
                name: asset.name.clone(),
                outcome,
            });
        }

        report.trace_summary();

        let failed = report.failed();
        if failed > 0 {
            return Err(SyncError::Incomplete { failed, report });
        }
        Ok(report)
    }

    /// Transfer then announce one missing asset; returns its public URL.
    async fn mirror(&self, asset: &Asset, repo: &Repository) -> Result<String, SyncError> {
        self.transfer.transfer(asset, repo).await?;

        let url = self.store.public_url(&asset.name);
        self.notifier
            .post(&announcement(&url))
            .await
            .map_err(|e| SyncError::Notify {
                asset: asset.name.clone(),
                source: e,
            })?;
        info!(asset = %asset.name, url = %url, "[SYNC] Mirrored and announced");
        Ok(url)
    }
}
