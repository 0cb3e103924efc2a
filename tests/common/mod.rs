#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use release_mirror::contract::{
    Asset, AssetStore, ByteStream, Notifier, Release, ReleaseSource, Repository,
};
use release_mirror::error::{NotifyError, SourceError, StoreError};

pub const BUCKET_URL: &str = "https://mybucket.cos.ap-guangzhou.myqcloud.com";

pub fn repo() -> Repository {
    Repository {
        owner: "acme".into(),
        name: "tool".into(),
        token: "ghp_test".into(),
    }
}

/// Release source serving fixed bytes per asset id; ids listed in `missing` answer 404.
pub struct FakeSource {
    release: Release,
    payloads: HashMap<u64, Vec<u8>>,
    missing: Vec<u64>,
    pub downloads: Mutex<Vec<u64>>,
}

impl FakeSource {
    pub fn new(tag: &str, assets: &[(&str, &str)]) -> Self {
        let mut payloads = HashMap::new();
        let assets = assets
            .iter()
            .enumerate()
            .map(|(i, (name, data))| {
                let id = i as u64 + 100;
                payloads.insert(id, data.as_bytes().to_vec());
                Asset {
                    id,
                    name: name.to_string(),
                    size: data.len() as u64,
                    content_type: None,
                }
            })
            .collect();
        Self {
            release: Release {
                tag_name: tag.to_string(),
                name: None,
                assets,
            },
            payloads,
            missing: Vec::new(),
            downloads: Mutex::new(Vec::new()),
        }
    }

    /// Makes the asset called `name` answer 404 on download.
    pub fn with_missing(mut self, name: &str) -> Self {
        let id = self
            .release
            .assets
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.id)
            .expect("asset must exist in the fake release");
        self.missing.push(id);
        self
    }

    pub fn download_count(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }
}

#[async_trait]
impl ReleaseSource for FakeSource {
    async fn fetch_latest(&self, _repo: &Repository) -> Result<Release, SourceError> {
        Ok(self.release.clone())
    }

    async fn retrieve_asset_bytes(
        &self,
        _repo: &Repository,
        asset_id: u64,
    ) -> Result<ByteStream, SourceError> {
        self.downloads.lock().unwrap().push(asset_id);
        if self.missing.contains(&asset_id) {
            return Err(SourceError::NotFound {
                what: format!("asset {asset_id}"),
                status: "404 Not Found".into(),
            });
        }
        let data = self.payloads.get(&asset_id).cloned().unwrap_or_default();
        let chunks: Vec<io::Result<Bytes>> = data
            .chunks(3)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

/// In-memory bucket. `unavailable` makes every existence check fail.
#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<BTreeMap<String, Vec<u8>>>,
    pub puts: Mutex<usize>,
    pub unavailable: bool,
}

impl MemoryStore {
    pub fn with_objects(names: &[&str]) -> Self {
        let store = Self::default();
        for name in names {
            store
                .objects
                .lock()
                .unwrap()
                .insert(name.to_string(), b"existing".to_vec());
        }
        store
    }

    pub fn names(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn put_count(&self) -> usize {
        *self.puts.lock().unwrap()
    }
}

#[async_trait]
impl AssetStore for MemoryStore {
    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable {
                name: name.to_string(),
                reason: "503 Service Unavailable".into(),
            });
        }
        Ok(self.objects.lock().unwrap().contains_key(name))
    }

    async fn put(
        &self,
        name: &str,
        mut body: ByteStream,
        _content_length: u64,
    ) -> Result<(), StoreError> {
        let mut data = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| StoreError::Write {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
            data.extend_from_slice(&chunk);
        }
        *self.puts.lock().unwrap() += 1;
        self.objects.lock().unwrap().insert(name.to_string(), data);
        Ok(())
    }

    fn public_url(&self, name: &str) -> String {
        format!("{BUCKET_URL}/{name}")
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn post(&self, message: &str) -> Result<(), NotifyError> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

pub fn staged_files(dir: &std::path::Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}
