//! # Dual-Source Data Client
//!
//! Maintains two independently throttled caches, one per WhatPulse source:
//!
//! - **Public**: the remote web API, `GET {base}?userid=<id>&format=json`
//!   (or `user=<name>`), refreshed at most once an hour.
//! - **Client**: the local client process, `GET {base}/v1/all-stats`,
//!   refreshed at most every 30 seconds.
//!
//! `refresh` fetches whichever sources are due, concurrently, and hands back
//! a `Snapshot` that shares the cached payloads. A failed fetch is logged and
//! leaves the cache and its timestamp untouched, so the next call retries
//! immediately while the previous payload keeps being served. A 200 whose
//! body is not a non-empty JSON object counts as a failed fetch.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, trace};

use crate::error::WhatPulseError;
use crate::retrieve::ky_http::ApiClient;

/// Public web API endpoint.
pub const PUBLIC_API_URL: &str = "https://api.whatpulse.org/user.php";
/// Where the WhatPulse client listens by default.
pub const DEFAULT_CLIENT_API_URL: &str = "http://localhost:3490";
/// Minimum seconds between two public API fetches.
pub const PUBLIC_REFRESH_SECS: i64 = 3600;
/// Minimum seconds between two client API fetches.
pub const CLIENT_REFRESH_SECS: i64 = 30;

const CLIENT_STATS_PATH: &str = "/v1/all-stats";

/// Which remote source a payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// The remote public web API.
    Public,
    /// The local client process API.
    Client,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Public => f.write_str("public"),
            Source::Client => f.write_str("client"),
        }
    }
}

/// Which sources an adapter instance polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiType {
    /// Public web API only.
    #[default]
    Public,
    /// Local client API only.
    Client,
    /// Both, client preferred for raw counters.
    Both,
}

impl ApiType {
    /// The public source is polled.
    pub fn uses_public(self) -> bool {
        matches!(self, ApiType::Public | ApiType::Both)
    }

    /// The local client source is polled and client actions are available.
    pub fn uses_client(self) -> bool {
        matches!(self, ApiType::Client | ApiType::Both)
    }
}

impl fmt::Display for ApiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiType::Public => f.write_str("public"),
            ApiType::Client => f.write_str("client"),
            ApiType::Both => f.write_str("both"),
        }
    }
}

impl FromStr for ApiType {
    type Err = WhatPulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(ApiType::Public),
            "client" => Ok(ApiType::Client),
            "both" => Ok(ApiType::Both),
            _ => Err(WhatPulseError::UnknownApiType(s.to_string())),
        }
    }
}

/// Who to ask the public API about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Numeric account id, sent as `userid=`.
    UserId(String),
    /// Account name, sent as `user=`.
    Username(String),
}

impl Identity {
    /// Picks the identity to use, preferring the user id. Blank values are
    /// treated as absent.
    pub fn from_parts(username: Option<&str>, userid: Option<&str>) -> Option<Self> {
        fn non_blank(s: Option<&str>) -> Option<String> {
            s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
        }
        non_blank(userid)
            .map(Identity::UserId)
            .or_else(|| non_blank(username).map(Identity::Username))
    }

    /// The query parameter carrying this identity.
    pub fn query_pair(&self) -> (&'static str, &str) {
        match self {
            Identity::UserId(id) => ("userid", id),
            Identity::Username(name) => ("user", name),
        }
    }

    /// Used in entity unique ids.
    pub fn value(&self) -> &str {
        match self {
            Identity::UserId(v) | Identity::Username(v) => v,
        }
    }
}

/// Per-source throttle and cache.
///
/// A source is due when it has never been fetched successfully or when
/// `now >= last_fetch + interval`. Only `record_success` moves the
/// timestamp, so a failed fetch keeps the source due.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState {
    last_fetch_unix: Option<i64>,
    refresh_interval_secs: i64,
    cached_payload: Option<Arc<Value>>,
}

impl FetchState {
    /// An empty state that is due immediately.
    pub fn new(refresh_interval_secs: i64) -> Self {
        Self {
            last_fetch_unix: None,
            refresh_interval_secs,
            cached_payload: None,
        }
    }

    /// Whether a fetch should be attempted at `now` (unix seconds).
    pub fn is_due(&self, now: i64) -> bool {
        match self.last_fetch_unix {
            None => true,
            Some(last) => now >= last.saturating_add(self.refresh_interval_secs),
        }
    }

    /// Stores a freshly fetched payload and advances the timestamp.
    pub fn record_success(&mut self, now: i64, payload: Value) {
        self.cached_payload = Some(Arc::new(payload));
        self.last_fetch_unix = Some(now);
    }

    /// Unix time of the last successful fetch.
    pub fn last_fetch_unix(&self) -> Option<i64> {
        self.last_fetch_unix
    }

    /// Minimum seconds between fetches.
    pub fn refresh_interval_secs(&self) -> i64 {
        self.refresh_interval_secs
    }

    /// The last successfully fetched payload, shared.
    pub fn cached_payload(&self) -> Option<Arc<Value>> {
        self.cached_payload.clone()
    }
}

/// The merged view handed to the resolver. Payloads are shared with the
/// client's caches, never copied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Last good public API payload.
    pub public: Option<Arc<Value>>,
    /// Last good client API payload.
    pub client: Option<Arc<Value>>,
}

impl Snapshot {
    /// Neither source has produced data yet.
    pub fn is_empty(&self) -> bool {
        self.public.is_none() && self.client.is_none()
    }
}

/// Everything needed to build a `StatsClient`.
#[derive(Debug, Clone)]
pub struct StatsClientOptions {
    /// Which sources to poll.
    pub api_type: ApiType,
    /// Required when the public source is enabled.
    pub identity: Option<Identity>,
    /// Public API base URL.
    pub public_api_url: String,
    /// Local client API base URL.
    pub client_api_url: String,
    /// Bound for each request.
    pub request_timeout: Duration,
    /// Minimum seconds between public fetches.
    pub public_refresh_secs: i64,
    /// Minimum seconds between client fetches.
    pub client_refresh_secs: i64,
}

impl Default for StatsClientOptions {
    fn default() -> Self {
        Self {
            api_type: ApiType::default(),
            identity: None,
            public_api_url: PUBLIC_API_URL.to_string(),
            client_api_url: DEFAULT_CLIENT_API_URL.to_string(),
            request_timeout: ApiClient::DEFAULT_TIMEOUT,
            public_refresh_secs: PUBLIC_REFRESH_SECS,
            client_refresh_secs: CLIENT_REFRESH_SECS,
        }
    }
}

/// One throttled source: its HTTP client, request shape and cache.
#[derive(Debug)]
struct SourceChannel {
    source: Source,
    api: ApiClient,
    path: &'static str,
    query: Vec<(&'static str, String)>,
    state: Mutex<FetchState>,
}

impl SourceChannel {
    async fn fetch(&self) -> anyhow::Result<Value> {
        let query: Vec<(&str, &str)> = self.query.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let response = self
            .api
            .request::<Value, ()>(Method::GET, self.path, &query, None)
            .await
            .with_context(|| format!("Error fetching WhatPulse {} API data", self.source))?;

        if !response.is_ok() {
            anyhow::bail!(
                "Unable to perform {} API request: status {}, body {}",
                self.source,
                response.status,
                response.error_body.unwrap_or_default()
            );
        }

        match response.data {
            Some(Value::Object(fields)) if !fields.is_empty() => Ok(Value::Object(fields)),
            other => anyhow::bail!(
                "WhatPulse {} API returned no usable data: {}",
                self.source,
                other.map(|v| v.to_string()).unwrap_or_default()
            ),
        }
    }

    /// Check-due, fetch and advance as one critical section, so concurrent
    /// callers never start a second fetch of the same source.
    async fn refresh(&self, now: i64) -> Option<Arc<Value>> {
        let mut state = self.state.lock().await;

        if state.is_due(now) {
            debug!(source = %self.source, "Refreshing WhatPulse data");
            match self.fetch().await {
                Ok(payload) => {
                    state.record_success(now, payload);
                    info!(source = %self.source, "WhatPulse data updated");
                }
                Err(e) => {
                    error!(source = %self.source, error = %format!("{e:#}"), "WhatPulse fetch failed, keeping cached data");
                }
            }
        } else {
            trace!(source = %self.source, "WhatPulse data still fresh");
        }

        state.cached_payload()
    }
}

/// The dual-source data client. One instance per adapter, shared by every
/// sensor of that adapter.
#[derive(Debug)]
pub struct StatsClient {
    api_type: ApiType,
    identity: Option<Identity>,
    public: Option<SourceChannel>,
    client: Option<SourceChannel>,
}

impl StatsClient {
    /// Builds the client for the enabled sources.
    ///
    /// # Errors
    /// - `MissingIdentity` when the public source is enabled without an identity.
    /// - `InvalidUrl` when an enabled source's base URL does not parse.
    pub fn new(options: StatsClientOptions) -> Result<Self, WhatPulseError> {
        let public = if options.api_type.uses_public() {
            let identity = options.identity.as_ref().ok_or(WhatPulseError::MissingIdentity)?;
            let (key, value) = identity.query_pair();
            Some(SourceChannel {
                source: Source::Public,
                api: build_api(&options.public_api_url, options.request_timeout)?,
                path: "",
                query: vec![(key, value.to_string()), ("format", "json".to_string())],
                state: Mutex::new(FetchState::new(options.public_refresh_secs)),
            })
        } else {
            None
        };

        let client = if options.api_type.uses_client() {
            Some(SourceChannel {
                source: Source::Client,
                api: build_api(&options.client_api_url, options.request_timeout)?,
                path: CLIENT_STATS_PATH,
                query: Vec::new(),
                state: Mutex::new(FetchState::new(options.client_refresh_secs)),
            })
        } else {
            None
        };

        Ok(Self {
            api_type: options.api_type,
            identity: options.identity,
            public,
            client,
        })
    }

    /// Sources this client polls.
    pub fn api_type(&self) -> ApiType {
        self.api_type
    }

    /// The public identity, if any.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Refreshes due sources against the wall clock.
    pub async fn refresh(&self) -> Snapshot {
        self.refresh_at(chrono::Utc::now().timestamp()).await
    }

    /// Refreshes due sources as of `now` (unix seconds). The two sources are
    /// fetched concurrently and independently.
    pub async fn refresh_at(&self, now: i64) -> Snapshot {
        let (public, client) = tokio::join!(
            refresh_channel(self.public.as_ref(), now),
            refresh_channel(self.client.as_ref(), now),
        );
        Snapshot { public, client }
    }

    /// The current cache contents, without any network activity.
    pub async fn snapshot(&self) -> Snapshot {
        let (public, client) = tokio::join!(
            cached(self.public.as_ref()),
            cached(self.client.as_ref()),
        );
        Snapshot { public, client }
    }

    /// A copy of a source's throttle state, `None` if the source is disabled.
    pub async fn fetch_state(&self, source: Source) -> Option<FetchState> {
        let channel = match source {
            Source::Public => self.public.as_ref(),
            Source::Client => self.client.as_ref(),
        }?;
        Some(channel.state.lock().await.clone())
    }
}

async fn refresh_channel(channel: Option<&SourceChannel>, now: i64) -> Option<Arc<Value>> {
    match channel {
        Some(c) => c.refresh(now).await,
        None => None,
    }
}

async fn cached(channel: Option<&SourceChannel>) -> Option<Arc<Value>> {
    match channel {
        Some(c) => c.state.lock().await.cached_payload(),
        None => None,
    }
}

fn build_api(url: &str, timeout: Duration) -> Result<ApiClient, WhatPulseError> {
    ApiClient::new(url, timeout).map_err(|e| WhatPulseError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn never_fetched_is_due() {
        assert!(FetchState::new(30).is_due(0));
    }

    #[test]
    fn due_exactly_at_interval_boundary() {
        let mut state = FetchState::new(30);
        state.record_success(1_000, json!({}));
        assert!(!state.is_due(1_000));
        assert!(!state.is_due(1_029));
        assert!(state.is_due(1_030));
    }

    #[test]
    fn record_success_replaces_payload() {
        let mut state = FetchState::new(3600);
        state.record_success(10, json!({"Keys": 1}));
        state.record_success(4000, json!({"Keys": 2}));
        assert_eq!(state.last_fetch_unix(), Some(4000));
        assert_eq!(*state.cached_payload().unwrap(), json!({"Keys": 2}));
    }

    #[test]
    fn identity_prefers_userid() {
        assert_eq!(
            Identity::from_parts(Some("alice"), Some("42")),
            Some(Identity::UserId("42".into()))
        );
        assert_eq!(
            Identity::from_parts(Some("alice"), Some("  ")),
            Some(Identity::Username("alice".into()))
        );
        assert_eq!(Identity::from_parts(None, None), None);
        assert_eq!(Identity::UserId("42".into()).query_pair(), ("userid", "42"));
        assert_eq!(Identity::Username("bob".into()).query_pair(), ("user", "bob"));
    }

    #[test]
    fn api_type_parsing() {
        assert_eq!("Both".parse::<ApiType>().unwrap(), ApiType::Both);
        assert_eq!(" client ".parse::<ApiType>().unwrap(), ApiType::Client);
        assert!(matches!("local".parse::<ApiType>(), Err(WhatPulseError::UnknownApiType(_))));
        assert!(ApiType::Both.uses_public() && ApiType::Both.uses_client());
        assert!(!ApiType::Public.uses_client());
        assert!(!ApiType::Client.uses_public());
    }

    #[test]
    fn public_source_requires_identity() {
        let err = StatsClient::new(StatsClientOptions::default()).unwrap_err();
        assert!(matches!(err, WhatPulseError::MissingIdentity));
    }

    #[test]
    fn client_only_needs_no_identity() {
        let client = StatsClient::new(StatsClientOptions {
            api_type: ApiType::Client,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.api_type(), ApiType::Client);
        assert!(client.identity().is_none());
    }

    #[test]
    fn bad_client_url_is_a_configuration_error() {
        let err = StatsClient::new(StatsClientOptions {
            api_type: ApiType::Client,
            client_api_url: "localhost:3490/api".into(),
            ..Default::default()
        });
        // "localhost:3490/api" parses as a cannot-be-a-base URL with scheme "localhost"
        assert!(matches!(err, Err(WhatPulseError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn disabled_sources_stay_empty() {
        let client = StatsClient::new(StatsClientOptions {
            api_type: ApiType::Client,
            // Nothing listens here; the fetch fails fast and is swallowed.
            client_api_url: "http://127.0.0.1:9".into(),
            request_timeout: Duration::from_millis(500),
            ..Default::default()
        })
        .unwrap();

        let snapshot = client.refresh_at(100).await;
        assert!(snapshot.is_empty());
        assert!(client.fetch_state(Source::Public).await.is_none());
        let state = client.fetch_state(Source::Client).await.unwrap();
        assert_eq!(state.last_fetch_unix(), None);
    }
}
