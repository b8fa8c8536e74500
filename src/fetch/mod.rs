//! Fetch Module
//!
//! The network capability the read-through wrapper delegates to, and the
//! request/response types exchanged with it.

mod http;

pub use http::HttpFetcher;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchError;

// == Request Options ==
/// Options accompanying a fetch, mirroring the browser `fetch` init object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// HTTP method, None = GET
    pub method: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn with_method(method: impl Into<String>) -> Self {
        Self {
            method: Some(method.into()),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Returns the method to send, defaulting to GET.
    pub fn method_or_default(&self) -> &str {
        self.method.as_deref().unwrap_or("GET")
    }

    /// True when the request is an idempotent read the cache may serve.
    pub fn is_cacheable(&self) -> bool {
        self.method_or_default().eq_ignore_ascii_case("GET")
    }
}

// == Response Body ==
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Raw bytes as received, parsed on demand
    Raw(Vec<u8>),
    /// Already-parsed payload, used for responses served from cache
    Json(Value),
}

// == Fetch Response ==
/// Response returned by a fetcher or synthesized from a cache hit.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    /// True for 2xx statuses
    pub ok: bool,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
    /// True when served from the cache without touching the network
    pub cached: bool,
}

impl FetchResponse {
    /// Builds a network response from raw parts.
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            status,
            ok: (200..300).contains(&status),
            headers,
            body: ResponseBody::Raw(body),
            cached: false,
        }
    }

    /// Builds the response handed out on a cache hit.
    pub fn from_cache(data: Value) -> Self {
        Self {
            status: 200,
            ok: true,
            headers: Vec::new(),
            body: ResponseBody::Json(data),
            cached: true,
        }
    }

    /// Parses the body as JSON.
    ///
    /// Can be called any number of times; the body is never consumed.
    pub fn json(&self) -> Result<Value, FetchError> {
        match &self.body {
            ResponseBody::Json(value) => Ok(value.clone()),
            ResponseBody::Raw(bytes) => Ok(serde_json::from_slice(bytes)?),
        }
    }

    /// Returns the body bytes, rendering cached payloads as JSON.
    pub fn bytes(&self) -> Vec<u8> {
        match &self.body {
            ResponseBody::Json(value) => value.to_string().into_bytes(),
            ResponseBody::Raw(bytes) => bytes.clone(),
        }
    }

    /// Returns the body as text, rendering cached payloads as JSON.
    pub fn text(&self) -> String {
        match &self.body {
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Raw(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Looks up a header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

// == Fetcher ==
/// Issues HTTP-like requests.
///
/// Timeouts and cancellation are the implementation's concern.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, options: &RequestOptions) -> Result<FetchResponse, FetchError>;
}
