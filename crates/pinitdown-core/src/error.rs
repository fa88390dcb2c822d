use thiserror::Error;

/// A save rejected before touching the collection.
///
/// The display text is the prompt shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a title and content for the note.")]
    MissingText,

    #[error("Please select a location on the map for the note.")]
    MissingLocation,

    #[error("Invalid location coordinates. Please click the map again.")]
    InvalidLocation,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Stored notes are not valid JSON: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("Failed to serialize notes: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Offline: {0}")]
    Offline(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache install incomplete, {} of {total} entries missing", .missing.len())]
    InstallIncomplete { missing: Vec<String>, total: usize },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
