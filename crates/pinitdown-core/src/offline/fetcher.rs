//! Network access for the offline worker.

use std::future::Future;
use std::time::Duration;

use reqwest::{header, Client, Url};
use tracing::debug;

use super::request::{AssetRequest, AssetResponse, Method, ResponseKind};
use crate::error::FetchError;

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub trait Fetcher {
    /// Perform the request. Any HTTP status is a response; only transport
    /// failures are errors.
    fn fetch(
        &self,
        request: &AssetRequest,
    ) -> impl Future<Output = Result<AssetResponse, FetchError>> + Send;
}

/// Fetcher over reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    offline: bool,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            offline: false,
        })
    }

    /// A fetcher that fails every request, for running without network.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    fn method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Other => reqwest::Method::OPTIONS,
        }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse, FetchError> {
        if self.offline {
            return Err(FetchError::Offline(request.url.clone()));
        }

        let url = Url::parse(&request.url).map_err(|_| FetchError::InvalidUrl(request.url.clone()))?;
        let requested_host = url.host_str().map(str::to_string);

        let response = self
            .client
            .request(Self::method(request.method), url)
            .send()
            .await?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        // No CORS in a native client; a redirect to another host is the
        // only case where the body is not the one asked for.
        let kind = if final_url.host_str().map(str::to_string) == requested_host {
            ResponseKind::Basic
        } else {
            ResponseKind::Opaque
        };
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        debug!(url = %request.url, status, bytes = body.len(), "Fetched");
        Ok(AssetResponse {
            url: final_url.to_string(),
            status,
            kind,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_fetcher_fails_fast() {
        let fetcher = HttpFetcher::new().unwrap().offline(true);
        let result = fetcher.fetch(&AssetRequest::get("https://unpkg.com/x.js")).await;
        assert!(matches!(result, Err(FetchError::Offline(_))));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let fetcher = HttpFetcher::new().unwrap();
        let result = fetcher.fetch(&AssetRequest::get("not a url")).await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }
}
