use reqwest::Url;

use crate::error::FetchError;

/// App shell paths, relative to the app origin.
pub const SHELL_PATHS: &[&str] = &[
    "./",
    "./index.html",
    "./style.css",
    "./app.js",
    "./manifest.json",
    "./icons/icon-72x72.png",
    "./icons/icon-96x96.png",
    "./icons/icon-144x144.png",
    "./icons/icon-152x152.png",
    "./icons/icon-192x192.png",
    "./icons/icon-512x512.png",
    "./icons/mark.png",
];

/// The page served to documents while offline.
pub const SHELL_PAGE: &str = "./index.html";

/// The fixed, ordered list of URLs fetched at install time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    origin: Url,
    urls: Vec<String>,
}

impl Manifest {
    /// Shell paths resolved against `origin`, followed by the third-party
    /// URLs. Duplicates are dropped, first occurrence wins.
    pub fn build(origin: &str, third_party: &[String]) -> Result<Self, FetchError> {
        let origin = Url::parse(origin).map_err(|_| FetchError::InvalidUrl(origin.to_string()))?;

        let mut urls: Vec<String> = Vec::with_capacity(SHELL_PATHS.len() + third_party.len());
        for path in SHELL_PATHS {
            let url = origin
                .join(path)
                .map_err(|_| FetchError::InvalidUrl(path.to_string()))?;
            urls.push(url.to_string());
        }
        for raw in third_party {
            let url = Url::parse(raw).map_err(|_| FetchError::InvalidUrl(raw.clone()))?;
            urls.push(url.to_string());
        }

        let mut seen = std::collections::HashSet::new();
        urls.retain(|u| seen.insert(u.clone()));

        Ok(Self { origin, urls })
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.iter().any(|u| u == url)
    }

    /// Absolute URL of the offline fallback page.
    pub fn shell_page(&self) -> String {
        self.origin
            .join(SHELL_PAGE)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| self.origin.to_string())
    }

    /// Resolve a possibly relative URL against the app origin.
    pub fn resolve(&self, url: &str) -> Result<String, FetchError> {
        self.origin
            .join(url)
            .map(|u| u.to_string())
            .map_err(|_| FetchError::InvalidUrl(url.to_string()))
    }
}
