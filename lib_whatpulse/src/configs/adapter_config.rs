//! Adapter configuration.
//!
//! `AdapterConfig` is the loose, everything-optional shape read from files,
//! environment variables and command lines. It is both a serde struct and a
//! set of clap arguments, so a host can flatten it into its own parser and
//! file format; layers are combined with `merge`. `validate` turns it into
//! `AdapterSettings` or fails with a configuration error, which is fatal:
//! the adapter does not start.

use std::fmt;
use std::time::Duration;

use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WhatPulseError;
use crate::retrieve::ky_http::ApiClient;
use crate::stats::catalog::{self, MetricDescriptor, DEFAULT_METRICS};
use crate::stats::client::{
    ApiType, Identity, StatsClientOptions, CLIENT_REFRESH_SECS, DEFAULT_CLIENT_API_URL,
    PUBLIC_API_URL, PUBLIC_REFRESH_SECS,
};

/// Default cadence of the host polling loop.
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 30;

#[derive(Args, Default, Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AdapterConfig {
    #[arg(long, env = "WHATPULSE_USERNAME", help = "WhatPulse account name for the public API.")]
    pub username: Option<String>,

    #[arg(long, env = "WHATPULSE_USERID", help = "WhatPulse account id for the public API; wins over the username.")]
    pub userid: Option<String>,

    #[arg(long, env = "WHATPULSE_API_TYPE", help = "Sources to poll: public, client or both.")]
    pub api_type: Option<ApiType>,

    #[arg(long, env = "WHATPULSE_CLIENT_API_URL", help = "Base URL of the local WhatPulse client API.")]
    pub client_api_url: Option<String>,

    #[arg(long, env = "WHATPULSE_PUBLIC_API_URL", help = "URL of the public WhatPulse web API.")]
    pub public_api_url: Option<String>,

    #[arg(long, env = "WHATPULSE_SENSORS", value_delimiter = ',', help = "Comma separated metric ids to expose.")]
    pub sensors: Option<Vec<String>>,

    #[arg(long, env = "WHATPULSE_REQUEST_TIMEOUT_SECS", help = "Timeout in seconds for each API request.")]
    pub request_timeout_secs: Option<u64>,

    #[arg(long, env = "WHATPULSE_SCAN_INTERVAL_SECS", help = "Seconds between two sensor updates.")]
    pub scan_interval_secs: Option<u64>,
}

impl AdapterConfig {
    /// Merges two configs; `other` overrides `self` for every `Some` value.
    pub fn merge(self, other: AdapterConfig) -> AdapterConfig {
        AdapterConfig {
            username: other.username.or(self.username),
            userid: other.userid.or(self.userid),
            api_type: other.api_type.or(self.api_type),
            client_api_url: other.client_api_url.or(self.client_api_url),
            public_api_url: other.public_api_url.or(self.public_api_url),
            sensors: other.sensors.or(self.sensors),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            scan_interval_secs: other.scan_interval_secs.or(self.scan_interval_secs),
        }
    }

    /// Checks the configuration and fills in defaults.
    ///
    /// # Errors
    /// - `MissingIdentity` if the public API is enabled without username/userid.
    /// - `UnknownMetric` for a sensor id missing from the catalog.
    /// - `InvalidUrl` for an unparsable API URL of an enabled source.
    pub fn validate(self) -> Result<AdapterSettings, WhatPulseError> {
        let api_type = self.api_type.unwrap_or_default();

        let identity = Identity::from_parts(self.username.as_deref(), self.userid.as_deref());
        if api_type.uses_public() && identity.is_none() {
            return Err(WhatPulseError::MissingIdentity);
        }
        if self.username.is_some() && self.userid.is_some() {
            debug!("Both username and userid configured, using userid");
        }

        let client_api_url = self
            .client_api_url
            .unwrap_or_else(|| DEFAULT_CLIENT_API_URL.to_string());
        let public_api_url = self
            .public_api_url
            .unwrap_or_else(|| PUBLIC_API_URL.to_string());
        if api_type.uses_client() {
            check_url(&client_api_url)?;
        }
        if api_type.uses_public() {
            check_url(&public_api_url)?;
        }

        let metrics = match self.sensors {
            Some(ids) => ids
                .iter()
                .map(|id| catalog::lookup(id.trim()))
                .collect::<Result<Vec<_>, _>>()?,
            None => DEFAULT_METRICS
                .iter()
                .map(|id| catalog::lookup(id))
                .collect::<Result<Vec<_>, _>>()?,
        };

        let request_timeout = self
            .request_timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(ApiClient::DEFAULT_TIMEOUT);
        let scan_interval = Duration::from_secs(
            self.scan_interval_secs
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_SCAN_INTERVAL_SECS),
        );

        Ok(AdapterSettings {
            api_type,
            identity,
            client_api_url,
            public_api_url,
            metrics,
            request_timeout,
            scan_interval,
        })
    }
}

fn check_url(url: &str) -> Result<(), WhatPulseError> {
    ApiClient::new(url, ApiClient::DEFAULT_TIMEOUT)
        .map(|_| ())
        .map_err(|e| WhatPulseError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

/// Validated adapter settings.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub api_type: ApiType,
    pub identity: Option<Identity>,
    pub client_api_url: String,
    pub public_api_url: String,
    /// Selected metrics, in configuration order.
    pub metrics: Vec<&'static MetricDescriptor>,
    pub request_timeout: Duration,
    pub scan_interval: Duration,
}

impl AdapterSettings {
    /// Options for the dual-source client, with the standard refresh rates.
    pub fn stats_options(&self) -> StatsClientOptions {
        StatsClientOptions {
            api_type: self.api_type,
            identity: self.identity.clone(),
            public_api_url: self.public_api_url.clone(),
            client_api_url: self.client_api_url.clone(),
            request_timeout: self.request_timeout,
            public_refresh_secs: PUBLIC_REFRESH_SECS,
            client_refresh_secs: CLIENT_REFRESH_SECS,
        }
    }
}

impl fmt::Display for AdapterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metrics: Vec<&str> = self.metrics.iter().map(|m| m.id).collect();
        write!(
            f,
            "AdapterSettings
    API type: {},
    Identity: {},
    Client API: {},
    Public API: {},
    Sensors: {},
    Request timeout: {}s,
    Scan interval: {}s
",
            self.api_type,
            self.identity.as_ref().map(Identity::value).unwrap_or("-"),
            self.client_api_url,
            self.public_api_url,
            metrics.join(", "),
            self.request_timeout.as_secs(),
            self.scan_interval.as_secs()
        )
    }
}
