//! Moves one asset from the release source into the store through a local file.
//!
//! The staging file lives for exactly one [`StagingTransfer::transfer`] call. It is
//! removed on every exit path: explicitly via [`StagingFile::release`], and by `Drop`
//! if the transfer future is abandoned before reaching release.

use std::io;
use std::path::{Component, Path, PathBuf};

use futures::StreamExt;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

use crate::contract::{Asset, AssetStore, ReleaseSource, Repository};
use crate::error::TransferError;

/// A reserved path inside the staging directory, named after the asset.
#[derive(Debug)]
pub struct StagingFile {
    path: PathBuf,
    released: bool,
}

impl StagingFile {
    /// Reserves `<dir>/<name>`, creating `dir` if needed. Nothing is written yet.
    ///
    /// `name` must be a single plain file name.
    pub async fn acquire(dir: &Path, name: &str) -> io::Result<Self> {
        let mut components = Path::new(name).components();
        let plain = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !plain {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{name:?} is not a plain file name"),
            ));
        }
        fs::create_dir_all(dir).await?;
        Ok(Self {
            path: dir.join(name),
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the file. A file that was never created is not an error.
    pub async fn release(mut self) -> io::Result<()> {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Removed staging file");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed abandoned staging file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = ?e, path = %self.path.display(), "Failed to remove abandoned staging file"),
        }
    }
}

/// Download-then-upload of a single asset via the staging directory.
pub struct StagingTransfer<'a, R, S> {
    source: &'a R,
    store: &'a S,
    staging_dir: PathBuf,
}

impl<'a, R, S> StagingTransfer<'a, R, S>
where
    R: ReleaseSource,
    S: AssetStore,
{
    pub fn new(source: &'a R, store: &'a S, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            store,
            staging_dir: staging_dir.into(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Mirrors `asset` into the store. The staging file is gone when this returns.
    pub async fn transfer(&self, asset: &Asset, repo: &Repository) -> Result<(), TransferError> {
        let staged = StagingFile::acquire(&self.staging_dir, &asset.name)
            .await
            .map_err(|e| {
                error!(error = ?e, asset = %asset.name, "Cannot stage asset");
                TransferError::Staging {
                    asset: asset.name.clone(),
                    source: e,
                }
            })?;
        let path = staged.path().to_path_buf();

        let outcome = match self.download(asset, repo, &path).await {
            Ok(()) => self.upload(asset, &path).await,
            Err(e) => Err(e),
        };
        let cleanup = staged.release().await;

        match (outcome, cleanup) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(e)) => {
                error!(error = ?e, path = %path.display(), asset = %asset.name, "Error deleting staging file");
                Err(TransferError::Cleanup {
                    asset: asset.name.clone(),
                    path,
                    source: e,
                })
            }
            (Err(original), Ok(())) => Err(original),
            (Err(original), Err(e)) => {
                error!(
                    error = ?e,
                    path = %path.display(),
                    asset = %asset.name,
                    "Error deleting staging file after failed transfer"
                );
                Err(original)
            }
        }
    }

    async fn download(
        &self,
        asset: &Asset,
        repo: &Repository,
        path: &Path,
    ) -> Result<(), TransferError> {
        let io_failed = |e: io::Error| {
            error!(error = ?e, asset = %asset.name, path = %path.display(), "Writing staging file failed");
            TransferError::DownloadIo {
                asset: asset.name.clone(),
                source: e,
            }
        };

        info!(asset = %asset.name, id = asset.id, "Downloading asset");
        let mut stream = self
            .source
            .retrieve_asset_bytes(repo, asset.id)
            .await
            .map_err(|e| TransferError::Download {
                asset: asset.name.clone(),
                source: e,
            })?;

        let mut file = File::create(path).await.map_err(io_failed)?;
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(io_failed)?;
            file.write_all(&chunk).await.map_err(io_failed)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_failed)?;
        drop(file);

        if written != asset.size {
            warn!(
                asset = %asset.name,
                expected = asset.size,
                written,
                "Downloaded size differs from advertised asset size"
            );
        }
        info!(asset = %asset.name, bytes = written, "Downloaded successfully");
        Ok(())
    }

    async fn upload(&self, asset: &Asset, path: &Path) -> Result<(), TransferError> {
        let io_failed = |e: io::Error| TransferError::UploadIo {
            asset: asset.name.clone(),
            source: e,
        };

        let file = File::open(path).await.map_err(io_failed)?;
        let length = file.metadata().await.map_err(io_failed)?.len();

        self.store
            .put(&asset.name, Box::pin(ReaderStream::new(file)), length)
            .await
            .map_err(|e| {
                error!(error = %e, asset = %asset.name, "Failed to upload");
                TransferError::Upload {
                    asset: asset.name.clone(),
                    source: e,
                }
            })
    }
}
