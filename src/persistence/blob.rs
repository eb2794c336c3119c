//! Blob store abstraction for checkpoints and milestone screenshots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::Result;

/// One entry returned by `BlobStore::list`.
#[derive(Debug, Clone)]
pub struct BlobEntry {
    /// Path the blob was stored under.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// When it was uploaded.
    pub uploaded_at: DateTime<Utc>,
    /// A public-read URL for the blob.
    pub url: String,
}

/// Blob storage for checkpoints and milestone assets. Public-read access
/// is assumed for whatever URL `put` returns.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload bytes at `path`, returning a fetchable URL.
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<String>;
    /// List entries whose path starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>>;
    /// Read bytes back for `path`, if it exists. A real deployment would
    /// fetch the public-read URL `put`/`list` returned instead; this
    /// in-process accessor exists so `/parse-state` can read a checkpoint
    /// back without a real HTTP round-trip against a synthetic URL.
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>>;
}

struct StoredBlob {
    bytes: Vec<u8>,
    uploaded_at: DateTime<Utc>,
}

/// In-memory `BlobStore`. URLs are synthetic `mem://` locators; tests and
/// local runs read bytes back through `put`'s returned path, not the URL.
#[derive(Default)]
pub struct InMemoryBlob {
    data: DashMap<String, StoredBlob>,
}

impl InMemoryBlob {
    /// Construct an empty blob store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read raw bytes back out, for tests that want to assert on upload content.
    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.data.get(path).map(|b| b.bytes.clone())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlob {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<String> {
        let uploaded_at = Utc::now();
        let url = format!("mem://{path}");
        self.data.insert(
            path.to_string(),
            StoredBlob {
                bytes,
                uploaded_at,
            },
        );
        Ok(url)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>> {
        let mut entries: Vec<BlobEntry> = self
            .data
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| BlobEntry {
                path: e.key().clone(),
                size: e.value().bytes.len() as u64,
                uploaded_at: e.value().uploaded_at,
                url: format!("mem://{}", e.key()),
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(path).map(|b| b.bytes.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_list_roundtrips() {
        let blob = InMemoryBlob::new();
        let url = blob
            .put("save-states/a1/2026-01-01_00-00_D100_m.state", vec![1, 2, 3])
            .await
            .unwrap();
        assert!(url.starts_with("mem://"));
        let entries = blob.list("save-states/a1/").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].size, 3);
    }
}
