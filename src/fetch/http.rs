//! reqwest-backed fetcher

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::debug;

use super::{FetchResponse, Fetcher, RequestOptions};
use crate::error::FetchError;

// == HTTP Fetcher ==
/// Fetcher issuing real HTTP requests.
///
/// Relative URLs such as `/api/exercises` are resolved against `base_url`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the absolute URL a request for `url` goes to.
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, options: &RequestOptions) -> Result<FetchResponse, FetchError> {
        let method = Method::from_bytes(options.method_or_default().to_ascii_uppercase().as_bytes())
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
        let target = self.resolve(url);
        debug!("{} {}", method, target);

        let mut request = self.client.request(method, &target);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.body {
            request = request.body(body.clone());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(FetchResponse::new(status, headers, body))
    }
}
