use std::fmt;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::Url;
use tracing::{debug, error, info, warn};

use super::cache::{CacheStorage, CachedResponse};
use super::fetcher::Fetcher;
use super::manifest::Manifest;
use super::request::{AssetRequest, Destination, FetchOutcome, Method};
use crate::config::Config;
use crate::error::{CacheError, FetchError};
use crate::utils::age_display;

/// Worker lifecycle: `Uninstalled → Installing → Installed → Activating → Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Uninstalled,
    Installing,
    /// Installed and waiting for activation.
    Installed,
    Activating,
    Active,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Uninstalled => write!(f, "uninstalled"),
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "waiting"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Active => write!(f, "active"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub state: WorkerState,
    pub cache_name: String,
    pub generations: Vec<String>,
    pub entries: usize,
    /// Manifest URLs with no cached copy.
    pub missing: Vec<String>,
    pub newest: Option<DateTime<Utc>>,
}

impl CacheStatus {
    pub fn age_display(&self) -> String {
        self.newest
            .map(age_display)
            .unwrap_or_else(|| "never".to_string())
    }

    pub fn summary(&self) -> String {
        format!(
            "{} ({}): {} cached, {} missing, updated {}",
            self.cache_name,
            self.state,
            self.entries,
            self.missing.len(),
            self.age_display()
        )
    }
}

pub struct OfflineWorker<S, F> {
    storage: S,
    fetcher: F,
    manifest: Manifest,
    cache_name: String,
    third_party_hosts: Vec<String>,
    state: WorkerState,
}

impl<S: CacheStorage, F: Fetcher> OfflineWorker<S, F> {
    pub fn new(
        storage: S,
        fetcher: F,
        manifest: Manifest,
        cache_name: impl Into<String>,
        third_party_hosts: Vec<String>,
    ) -> Self {
        Self {
            storage,
            fetcher,
            manifest,
            cache_name: cache_name.into(),
            third_party_hosts,
            state: WorkerState::Uninstalled,
        }
    }

    pub fn from_config(storage: S, fetcher: F, config: &Config) -> Result<Self, FetchError> {
        let manifest = Manifest::build(&config.app_origin, &config.third_party_assets)?;
        Ok(Self::new(
            storage,
            fetcher,
            manifest,
            config.cache_name.clone(),
            config.third_party_hosts.clone(),
        ))
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Whether fetches are being intercepted.
    pub fn is_controlling(&self) -> bool {
        self.state == WorkerState::Active
    }

    /// Pick up the state left by an earlier run. Only a complete current
    /// generation with no stale ones beside it is active; an incomplete one
    /// or one still awaiting activation is waiting.
    pub fn restore(&mut self) -> Result<WorkerState, CacheError> {
        let keys = self.storage.keys()?;
        self.state = if !keys.iter().any(|k| *k == self.cache_name) {
            WorkerState::Uninstalled
        } else if keys.len() > 1 || !self.missing_urls()?.is_empty() {
            WorkerState::Installed
        } else {
            WorkerState::Active
        };
        debug!(cache = %self.cache_name, state = %self.state, "Worker state restored");
        Ok(self.state)
    }

    /// Fetch every manifest entry into the current generation.
    ///
    /// Entries that fail are left out and reported together in
    /// `CacheError::InstallIncomplete`; the worker then stays installed but
    /// waiting. On full success it skips waiting and activates at once.
    pub async fn install(&mut self) -> Result<(), CacheError> {
        info!(cache = %self.cache_name, entries = self.manifest.len(), "Installing");
        self.state = WorkerState::Installing;

        if let Err(e) = self.storage.open(&self.cache_name) {
            error!(cache = %self.cache_name, error = %e, "Failed to open cache");
            self.state = WorkerState::Uninstalled;
            return Err(e.into());
        }

        let requests: Vec<AssetRequest> = self
            .manifest
            .urls()
            .iter()
            .map(|url| AssetRequest::get(url.as_str()))
            .collect();
        let results = join_all(requests.iter().map(|r| self.fetcher.fetch(r))).await;

        let mut missing = Vec::new();
        for (request, result) in requests.iter().zip(results) {
            match result {
                Ok(response) if response.is_ok() => {
                    if let Err(e) = self.storage.put(&self.cache_name, &request.url, &response) {
                        warn!(url = %request.url, error = %e, "Failed to store asset");
                        missing.push(request.url.clone());
                    }
                }
                Ok(response) => {
                    warn!(url = %request.url, status = response.status, "Asset not cached");
                    missing.push(request.url.clone());
                }
                Err(e) => {
                    warn!(url = %request.url, error = %e, "Asset fetch failed");
                    missing.push(request.url.clone());
                }
            }
        }

        self.state = WorkerState::Installed;

        if !missing.is_empty() {
            let err = CacheError::InstallIncomplete {
                missing,
                total: requests.len(),
            };
            error!(cache = %self.cache_name, error = %err, "Caching failed");
            return Err(err);
        }

        info!(cache = %self.cache_name, "Installation complete");
        self.activate()?;
        Ok(())
    }

    /// Delete every generation but the current one and take control.
    /// Returns the names of the deleted generations.
    pub fn activate(&mut self) -> Result<Vec<String>, CacheError> {
        info!(cache = %self.cache_name, "Activating");
        self.state = WorkerState::Activating;

        let mut deleted = Vec::new();
        for name in self.storage.keys()? {
            if name != self.cache_name {
                info!(cache = %name, "Clearing old cache");
                if self.storage.delete(&name)? {
                    deleted.push(name);
                }
            }
        }

        self.state = WorkerState::Active;
        info!(cache = %self.cache_name, "Activation complete, now controlling clients");
        Ok(deleted)
    }

    /// Answer an intercepted request.
    pub async fn handle_fetch(&mut self, request: &AssetRequest) -> FetchOutcome {
        if request.method != Method::Get || !self.is_controlling() {
            return FetchOutcome::Passthrough;
        }

        if self.is_third_party(&request.url) {
            self.cache_first(request).await
        } else {
            self.network_first(request).await
        }
    }

    /// Answer a request like `handle_fetch`, performing passed-through
    /// requests directly on the network.
    pub async fn respond(&mut self, request: &AssetRequest) -> FetchOutcome {
        match self.handle_fetch(request).await {
            FetchOutcome::Passthrough => {
                debug!(url = %request.url, state = %self.state, "Not intercepted, fetching directly");
                match self.fetcher.fetch(request).await {
                    Ok(response) => FetchOutcome::Network(response),
                    Err(e) => FetchOutcome::Failed(e),
                }
            }
            outcome => outcome,
        }
    }

    fn is_third_party(&self, url: &str) -> bool {
        let Ok(url) = Url::parse(url) else {
            return false;
        };
        let Some(host) = url.host_str() else {
            return false;
        };
        self.third_party_hosts.iter().any(|h| {
            host == h
                || host
                    .strip_suffix(h.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    fn cached(&self, url: &str) -> Option<CachedResponse> {
        match self.storage.match_url(&self.cache_name, url) {
            Ok(hit) => hit,
            Err(e) => {
                warn!(url, error = %e, "Cache lookup failed");
                None
            }
        }
    }

    async fn cache_first(&mut self, request: &AssetRequest) -> FetchOutcome {
        if let Some(hit) = self.cached(&request.url) {
            return FetchOutcome::Cache(hit.response);
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    if let Err(e) = self.storage.put(&self.cache_name, &request.url, &response) {
                        warn!(url = %request.url, error = %e, "Failed to cache asset");
                    }
                }
                FetchOutcome::Network(response)
            }
            Err(e) => {
                warn!(url = %request.url, error = %e, "CDN fetch failed");
                match self.cached(&request.url) {
                    Some(hit) => FetchOutcome::Cache(hit.response),
                    None => FetchOutcome::Failed(e),
                }
            }
        }
    }

    async fn network_first(&mut self, request: &AssetRequest) -> FetchOutcome {
        match self.fetcher.fetch(request).await {
            Ok(response) => FetchOutcome::Network(response),
            Err(e) => {
                error!(url = %request.url, error = %e, "Fetch failed");
                if request.destination == Destination::Document {
                    if let Some(hit) = self.cached(&self.manifest.shell_page()) {
                        return FetchOutcome::Fallback(hit.response);
                    }
                }
                FetchOutcome::Failed(e)
            }
        }
    }

    /// Manifest URLs with no copy in the current generation.
    fn missing_urls(&self) -> Result<Vec<String>, CacheError> {
        let entries = self.storage.entries(&self.cache_name)?;
        Ok(self
            .manifest
            .urls()
            .iter()
            .filter(|url| !entries.iter().any(|e| &e.url == *url))
            .cloned()
            .collect())
    }

    pub fn status(&self) -> Result<CacheStatus, CacheError> {
        let generations = self.storage.keys()?;
        let entries = self.storage.entries(&self.cache_name)?;
        Ok(CacheStatus {
            state: self.state,
            cache_name: self.cache_name.clone(),
            generations,
            entries: entries.len(),
            missing: self.missing_urls()?,
            newest: entries.iter().map(|e| e.cached_at).max(),
        })
    }
}
