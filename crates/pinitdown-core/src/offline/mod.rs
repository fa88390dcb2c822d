//! Offline asset cache.
//!
//! `OfflineWorker` keeps the application shell and its pinned third-party
//! assets available without network access. It follows the installable
//! worker lifecycle:
//!
//! - install: fetch the manifest into the current cache generation, then
//!   take control straight away
//! - activate: delete every generation except the current one
//! - fetch: cache-first for third-party hosts (written back at runtime),
//!   network-first for the app's own assets with the cached shell page as
//!   the offline fallback for documents
//!
//! Only the install-time manifest decides which first-party assets are
//! cached.

pub mod cache;
pub mod fetcher;
pub mod manifest;
pub mod request;
pub mod worker;

pub use cache::{CacheEntry, CacheStorage, CachedResponse, DiskCacheStorage, MemoryCacheStorage};
pub use fetcher::{Fetcher, HttpFetcher};
pub use manifest::{Manifest, SHELL_PAGE, SHELL_PATHS};
pub use request::{AssetRequest, AssetResponse, Destination, FetchOutcome, Method, ResponseKind};
pub use worker::{CacheStatus, OfflineWorker, WorkerState};

/// Name of the current cache generation.
pub const DEFAULT_CACHE_NAME: &str = "pinitdown-pwa-cache";

/// Hosts serving the map library and icon font.
pub const DEFAULT_THIRD_PARTY_HOSTS: &[&str] = &["unpkg.com", "cdnjs.cloudflare.com"];

/// Versioned CDN paths pinned at install time.
pub const DEFAULT_THIRD_PARTY_ASSETS: &[&str] = &[
    "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css",
    "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js",
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.0.0/css/all.min.css",
];
