//! Named cache generations.
//!
//! `DiskCacheStorage` keeps one directory per generation under the cache
//! root: an `index.json` describing the entries and one `.body` file per
//! cached response.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::request::{AssetResponse, ResponseKind};
use crate::utils::age_display;

/// Index file name inside a generation directory
const INDEX_FILE: &str = "index.json";

/// Storage for cache generations, keyed by generation name and then by
/// request URL.
pub trait CacheStorage {
    /// Create the generation if it does not exist yet.
    fn open(&mut self, name: &str) -> Result<()>;
    /// Names of all existing generations.
    fn keys(&self) -> Result<Vec<String>>;
    /// Returns false if there was nothing to delete.
    fn delete(&mut self, name: &str) -> Result<bool>;
    /// Store a response, replacing any earlier one for the same URL.
    fn put(&mut self, name: &str, url: &str, response: &AssetResponse) -> Result<()>;
    fn match_url(&self, name: &str, url: &str) -> Result<Option<CachedResponse>>;
    fn entries(&self, name: &str) -> Result<Vec<CacheEntry>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub response: AssetResponse,
    pub cached_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn age_display(&self) -> String {
        age_display(self.cached_at)
    }
}

/// Metadata for one cached response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub status: u16,
    pub kind: ResponseKind,
    pub content_type: Option<String>,
    pub size: usize,
    pub cached_at: DateTime<Utc>,
    body_file: String,
}

impl CacheEntry {
    fn new(url: &str, response: &AssetResponse, body_file: String) -> Self {
        Self {
            url: url.to_string(),
            status: response.status,
            kind: response.kind,
            content_type: response.content_type.clone(),
            size: response.body.len(),
            cached_at: Utc::now(),
            body_file,
        }
    }

    fn into_response(self, body: Vec<u8>) -> CachedResponse {
        CachedResponse {
            response: AssetResponse {
                url: self.url,
                status: self.status,
                kind: self.kind,
                content_type: self.content_type,
                body,
            },
            cached_at: self.cached_at,
        }
    }
}

// ============================================================================
// Disk
// ============================================================================

pub struct DiskCacheStorage {
    root: PathBuf,
}

impl DiskCacheStorage {
    pub fn new(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create cache root: {}", root.display()))?;
        Ok(Self { root })
    }

    fn generation_dir(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            anyhow::bail!("Invalid cache generation name: {:?}", name);
        }
        Ok(self.root.join(name))
    }

    fn load_index(&self, name: &str) -> Result<Option<Vec<CacheEntry>>> {
        let path = self.generation_dir(name)?.join(INDEX_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache index: {}", name))?;
        let index = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache index: {}", name))?;
        Ok(Some(index))
    }

    fn save_index(&self, name: &str, index: &[CacheEntry]) -> Result<()> {
        let path = self.generation_dir(name)?.join(INDEX_FILE);
        let contents = serde_json::to_string_pretty(index)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write cache index: {}", name))?;
        Ok(())
    }
}

impl CacheStorage for DiskCacheStorage {
    fn open(&mut self, name: &str) -> Result<()> {
        let dir = self.generation_dir(name)?;
        std::fs::create_dir_all(&dir)?;
        if !dir.join(INDEX_FILE).exists() {
            self.save_index(name, &[])?;
            debug!(cache = name, "Created cache generation");
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() && entry.path().join(INDEX_FILE).exists() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete(&mut self, name: &str) -> Result<bool> {
        let dir = self.generation_dir(name)?;
        if !dir.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&dir)
            .with_context(|| format!("Failed to delete cache generation: {}", name))?;
        Ok(true)
    }

    fn put(&mut self, name: &str, url: &str, response: &AssetResponse) -> Result<()> {
        self.open(name)?;
        let mut index = self.load_index(name)?.unwrap_or_default();

        let body_file = match index.iter().position(|e| e.url == url) {
            Some(pos) => index.remove(pos).body_file,
            None => {
                let next = index
                    .iter()
                    .filter_map(|e| e.body_file.strip_suffix(".body")?.parse::<u64>().ok())
                    .max()
                    .map_or(0, |n| n + 1);
                format!("{}.body", next)
            }
        };

        std::fs::write(self.generation_dir(name)?.join(&body_file), &response.body)
            .with_context(|| format!("Failed to write cached body for {}", url))?;
        index.push(CacheEntry::new(url, response, body_file));
        self.save_index(name, &index)
    }

    fn match_url(&self, name: &str, url: &str) -> Result<Option<CachedResponse>> {
        let Some(index) = self.load_index(name)? else {
            return Ok(None);
        };
        let Some(entry) = index.into_iter().find(|e| e.url == url) else {
            return Ok(None);
        };
        let body = std::fs::read(self.generation_dir(name)?.join(&entry.body_file))
            .with_context(|| format!("Failed to read cached body for {}", url))?;
        Ok(Some(entry.into_response(body)))
    }

    fn entries(&self, name: &str) -> Result<Vec<CacheEntry>> {
        Ok(self.load_index(name)?.unwrap_or_default())
    }
}

// ============================================================================
// Memory
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    generations: BTreeMap<String, Vec<(CacheEntry, Vec<u8>)>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn open(&mut self, name: &str) -> Result<()> {
        self.generations.entry(name.to_string()).or_default();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.generations.keys().cloned().collect())
    }

    fn delete(&mut self, name: &str) -> Result<bool> {
        Ok(self.generations.remove(name).is_some())
    }

    fn put(&mut self, name: &str, url: &str, response: &AssetResponse) -> Result<()> {
        let entries = self.generations.entry(name.to_string()).or_default();
        entries.retain(|(e, _)| e.url != url);
        entries.push((CacheEntry::new(url, response, String::new()), response.body.clone()));
        Ok(())
    }

    fn match_url(&self, name: &str, url: &str) -> Result<Option<CachedResponse>> {
        Ok(self
            .generations
            .get(name)
            .and_then(|entries| entries.iter().find(|(e, _)| e.url == url))
            .map(|(e, body)| e.clone().into_response(body.clone())))
    }

    fn entries(&self, name: &str) -> Result<Vec<CacheEntry>> {
        Ok(self
            .generations
            .get(name)
            .map(|entries| entries.iter().map(|(e, _)| e.clone()).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn response(url: &str, body: &str) -> AssetResponse {
        AssetResponse {
            url: url.to_string(),
            status: 200,
            kind: ResponseKind::Basic,
            content_type: Some("text/plain".to_string()),
            body: body.as_bytes().to_vec(),
        }
    }

    fn exercise(storage: &mut impl CacheStorage) {
        storage.open("v1").unwrap();
        storage.open("v2").unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["v1".to_string(), "v2".to_string()]);

        storage.put("v1", "http://a/x", &response("http://a/x", "first")).unwrap();
        storage.put("v1", "http://a/y", &response("http://a/y", "other")).unwrap();
        storage.put("v1", "http://a/x", &response("http://a/x", "second")).unwrap();

        let hit = storage.match_url("v1", "http://a/x").unwrap().unwrap();
        assert_eq!(hit.response.body, b"second");
        assert_eq!(hit.age_display(), "just now");
        assert_eq!(storage.entries("v1").unwrap().len(), 2);
        assert!(storage.match_url("v2", "http://a/x").unwrap().is_none());
        assert!(storage.match_url("missing", "http://a/x").unwrap().is_none());

        assert!(storage.delete("v1").unwrap());
        assert!(!storage.delete("v1").unwrap());
        assert_eq!(storage.keys().unwrap(), vec!["v2".to_string()]);
    }

    #[test]
    fn test_memory_storage() {
        exercise(&mut MemoryCacheStorage::new());
    }

    #[test]
    fn test_disk_storage() {
        let tmp = TempDir::new().unwrap();
        exercise(&mut DiskCacheStorage::new(tmp.path().join("caches")).unwrap());
    }

    #[test]
    fn test_disk_storage_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        {
            let mut storage = DiskCacheStorage::new(root.clone()).unwrap();
            storage.put("v1", "http://a/x", &response("http://a/x", "kept")).unwrap();
        }
        let storage = DiskCacheStorage::new(root).unwrap();
        let hit = storage.match_url("v1", "http://a/x").unwrap().unwrap();
        assert_eq!(hit.response.body, b"kept");
        assert_eq!(hit.response.content_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_disk_storage_rejects_path_names() {
        let tmp = TempDir::new().unwrap();
        let mut storage = DiskCacheStorage::new(tmp.path().to_path_buf()).unwrap();
        assert!(storage.open("../escape").is_err());
        assert!(storage.open("..").is_err());
    }
}
