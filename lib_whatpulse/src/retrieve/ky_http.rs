//! # HTTP Retrieval Utilities
//!
//! This module provides an asynchronous API client wrapper around `reqwest`.
//! It handles base URLs, query strings, JSON bodies and a bounded timeout,
//! and reports HTTP failures as data (`ApiResponse::success == false`)
//! instead of errors. Only transport-level problems become an `Err`.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

/// A standardized container for API responses.
///
/// This struct wraps the deserialized data along with metadata about the
/// HTTP transaction.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The successfully deserialized response body, if any.
    pub data: Option<T>,
    /// The raw error body returned by the server if the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
}

impl<T> ApiResponse<T> {
    /// True only for an exact `200 OK`, which is what the WhatPulse APIs
    /// return on success.
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }
}

/// A flexible asynchronous HTTP client bound to one base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// The underlying client, reused across calls for connection pooling.
    inner: reqwest::Client,
    /// The base URL to which all relative paths are appended.
    base_url: Url,
}

impl ApiClient {
    /// The per-request timeout used by every WhatPulse call.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a new `ApiClient`.
    ///
    /// # Arguments
    /// * `base_url` - The absolute base URL (e.g., "http://localhost:3490").
    /// * `timeout` - Upper bound for a whole request, connect included.
    ///
    /// # Errors
    /// Returns an error if `base_url` is not a valid absolute URL or the
    /// underlying client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut url = Url::parse(base_url)?;
        if url.cannot_be_a_base() {
            anyhow::bail!("URL cannot be used as a base: {}", base_url);
        }
        // A trailing bare '?' carries no parameters and would break query appending.
        if url.query() == Some("") {
            url.set_query(None);
        }

        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("whatpulse-bridge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner,
            base_url: url,
        })
    }

    /// Appends `path` to the path of the base URL, keeping any path prefix
    /// and query of the base (unlike `Url::join`, which would drop both for
    /// absolute paths).
    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        if !path.is_empty() {
            let joined = format!(
                "{}/{}",
                url.path().trim_end_matches('/'),
                path.trim_start_matches('/')
            );
            url.set_path(&joined);
        }
        url
    }

    /// Builds and sends a request, returning the raw response.
    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> anyhow::Result<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let full_url = self.endpoint(path);
        let mut req = self.inner.request(method, full_url);

        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(b) = body {
            req = req.json(b);
        }

        Ok(req.send().await?)
    }

    /// Performs a request and deserializes a successful body as JSON.
    ///
    /// # Arguments
    /// * `method` - The HTTP verb (GET, POST, etc.).
    /// * `path` - The path to append to the base URL ("" for the base itself).
    /// * `query` - Query string pairs, appended in order.
    /// * `body` - Optional serializable object to send as the JSON body.
    ///
    /// # Errors
    /// Returns an error if the network exchange or the JSON
    /// decoding of a 2xx body fails. Non-2xx statuses are returned as
    /// `Ok` with `success == false`.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> anyhow::Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(method, path, query, body).await?;
        let status = response.status();

        if status.is_success() {
            let data = response.json::<T>().await?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
            })
        } else {
            // Capture the error body as a string for diagnostics
            let error_text = response.text().await.ok();
            Ok(ApiResponse {
                data: None,
                error_body: error_text,
                status: status.as_u16(),
                success: false,
            })
        }
    }

    /// Like [`ApiClient::request`], but keeps the body as text whatever the
    /// status. Used for endpoints whose success body is empty or not JSON.
    pub async fn request_text<B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> anyhow::Result<ApiResponse<String>>
    where
        B: Serialize + ?Sized,
    {
        let response = self.send(method, path, query, body).await?;
        let status = response.status();
        let success = status.is_success();
        let text = response.text().await?;

        Ok(ApiResponse {
            data: success.then(|| text.clone()),
            error_body: (!success).then_some(text),
            status: status.as_u16(),
            success,
        })
    }
}
