use serde::{Deserialize, Serialize};

use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Other,
}

impl Method {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            _ => Method::Other,
        }
    }
}

/// What the requested resource will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
    Other,
}

impl Destination {
    /// Best guess from the URL path, for requests that don't say.
    pub fn guess(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let last = path.rsplit('/').next().unwrap_or("");
        match last.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
            None => Destination::Document,
            Some(ext) => match ext.as_str() {
                "html" | "htm" => Destination::Document,
                "js" | "mjs" => Destination::Script,
                "css" => Destination::Style,
                "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "ico" => Destination::Image,
                "woff" | "woff2" | "ttf" | "otf" => Destination::Font,
                "json" | "webmanifest" => Destination::Manifest,
                _ => Destination::Other,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub url: String,
    pub method: Method,
    pub destination: Destination,
}

impl AssetRequest {
    pub fn get(url: impl Into<String>) -> Self {
        let url = url.into();
        let destination = Destination::guess(&url);
        Self {
            url,
            method: Method::Get,
            destination,
        }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }
}

/// Response type in the fetch sense: `Basic` for direct responses,
/// `Opaque` when the body came from somewhere else than asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Basic,
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
    pub url: String,
    pub status: u16,
    pub kind: ResponseKind,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl AssetResponse {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Worth writing back into the cache at runtime.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.kind == ResponseKind::Basic
    }
}

/// How an intercepted request was answered.
#[derive(Debug)]
pub enum FetchOutcome {
    Network(AssetResponse),
    Cache(AssetResponse),
    /// The cached shell page, served for a document while offline.
    Fallback(AssetResponse),
    /// Not intercepted; the caller performs the request itself.
    Passthrough,
    Failed(FetchError),
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&AssetResponse> {
        match self {
            FetchOutcome::Network(r) | FetchOutcome::Cache(r) | FetchOutcome::Fallback(r) => Some(r),
            FetchOutcome::Passthrough | FetchOutcome::Failed(_) => None,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            FetchOutcome::Network(_) => "network",
            FetchOutcome::Cache(_) => "cache",
            FetchOutcome::Fallback(_) => "fallback",
            FetchOutcome::Passthrough => "passthrough",
            FetchOutcome::Failed(_) => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_guess() {
        assert_eq!(Destination::guess("http://localhost:8080/"), Destination::Document);
        assert_eq!(Destination::guess("http://localhost:8080/index.html"), Destination::Document);
        assert_eq!(Destination::guess("https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"), Destination::Script);
        assert_eq!(Destination::guess("http://x/style.css?v=2"), Destination::Style);
        assert_eq!(Destination::guess("http://x/icons/icon-72x72.png"), Destination::Image);
    }

    #[test]
    fn test_cacheable_requires_basic_200() {
        let mut resp = AssetResponse {
            url: "u".to_string(),
            status: 200,
            kind: ResponseKind::Basic,
            content_type: None,
            body: vec![],
        };
        assert!(resp.is_cacheable());
        resp.kind = ResponseKind::Opaque;
        assert!(!resp.is_cacheable());
        resp.kind = ResponseKind::Basic;
        resp.status = 204;
        assert!(resp.is_ok());
        assert!(!resp.is_cacheable());
    }

    #[test]
    fn test_response_kind_names() {
        assert_eq!(serde_json::to_string(&ResponseKind::Opaque).unwrap(), "\"opaque\"");
        assert!(serde_json::from_str::<ResponseKind>("\"cors\"").is_err());
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::parse("get"), Method::Get);
        assert_eq!(Method::parse("PATCH"), Method::Other);
    }
}
