//! # Host Adapter Module
//!
//! Wires the statistics core into a host: one shared `StatsClient`, one
//! parametrized `MetricSensor` per selected metric, the `pulse` and
//! `open_window` buttons and the `activate_profile` service when the local
//! client is enabled, and a `SensorPoller` to keep everything fresh.
//!
//! The host itself is abstract: it only has to implement `EntitySink`.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Sensor and button types, and the host sink trait.
pub mod entity;
/// The self-scheduling update loop.
pub mod poller;

use std::sync::Arc;

use tracing::{info, warn};

use crate::configs::adapter_config::AdapterSettings;
use crate::error::WhatPulseError;
use crate::stats::actions::{Action, ActionInvoker, ProfileId};
use crate::stats::client::{ApiType, StatsClient};

pub use entity::{ActionButton, ButtonInfo, EntitySink, MetricSensor, SensorState};
pub use poller::SensorPoller;

/// One configured adapter instance.
#[derive(Debug)]
pub struct Adapter {
    settings: AdapterSettings,
    client: Arc<StatsClient>,
    invoker: Option<Arc<ActionInvoker>>,
    buttons: Vec<ActionButton>,
}

impl Adapter {
    /// Builds the data client and, if the local client is enabled, the
    /// action invoker and buttons.
    ///
    /// # Errors
    /// Any configuration error from building the clients.
    pub fn setup(settings: AdapterSettings) -> Result<Self, WhatPulseError> {
        let client = Arc::new(StatsClient::new(settings.stats_options())?);

        let (invoker, buttons) = if settings.api_type.uses_client() {
            let invoker = Arc::new(ActionInvoker::new(&settings.client_api_url, settings.request_timeout)?);
            info!(client_api_url = %settings.client_api_url, "Setting up WhatPulse buttons");
            let buttons = vec![
                ActionButton::pulse(invoker.clone()),
                ActionButton::open_window(invoker.clone()),
            ];
            (Some(invoker), buttons)
        } else {
            (None, Vec::new())
        };

        Ok(Self {
            settings,
            client,
            invoker,
            buttons,
        })
    }

    /// The validated settings this adapter runs with.
    pub fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    /// The shared data client.
    pub fn client(&self) -> Arc<StatsClient> {
        self.client.clone()
    }

    /// One sensor per selected metric, minus the ones the enabled sources
    /// can never answer.
    pub fn sensors(&self) -> Vec<MetricSensor> {
        let api_type = self.settings.api_type;
        self.settings
            .metrics
            .iter()
            .copied()
            .filter(|metric| match api_type {
                ApiType::Public if metric.is_client_only() => {
                    warn!(metric = metric.id, "Skipping sensor as it requires client API access");
                    false
                }
                ApiType::Client if metric.is_public_only() => {
                    warn!(metric = metric.id, "Skipping sensor as it requires public API access");
                    false
                }
                _ => true,
            })
            .map(|metric| MetricSensor::new(metric, self.client.identity()))
            .collect()
    }

    /// Buttons exposed to the host; empty when the local client is disabled.
    pub fn buttons(&self) -> &[ActionButton] {
        &self.buttons
    }

    /// Builds a poller over fresh sensors and registers buttons with `sink`.
    pub fn poller(&self, sink: Arc<dyn EntitySink>) -> SensorPoller {
        for button in &self.buttons {
            sink.register_button(button.info());
        }
        let poller = SensorPoller::new(
            self.client.clone(),
            self.sensors(),
            sink,
            self.settings.scan_interval,
        );
        poller.register_all();
        poller
    }

    /// Presses the button bound to `action_id`.
    ///
    /// # Errors
    /// `UnknownAction` if no such button is exposed.
    pub async fn press(&self, action_id: &str) -> Result<bool, WhatPulseError> {
        let button = self
            .buttons
            .iter()
            .find(|b| b.action().id() == action_id)
            .ok_or_else(|| WhatPulseError::UnknownAction(action_id.to_string()))?;
        Ok(button.press().await)
    }

    /// The `activate_profile` service. `client_api_url` overrides the
    /// configured client for this call only.
    ///
    /// # Errors
    /// - `ClientApiDisabled` when the local client is not enabled.
    /// - `InvalidUrl` for an unparsable override.
    pub async fn activate_profile(
        &self,
        profile_id: ProfileId,
        client_api_url: Option<&str>,
    ) -> Result<bool, WhatPulseError> {
        let configured = self.invoker.as_ref().ok_or(WhatPulseError::ClientApiDisabled)?;
        let action = Action::ActivateProfile(profile_id);

        match client_api_url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => {
                let invoker = ActionInvoker::new(url, self.settings.request_timeout)?;
                Ok(invoker.invoke(&action).await)
            }
            None => Ok(configured.invoke(&action).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs::adapter_config::AdapterConfig;

    fn adapter(api_type: ApiType, sensors: &[&str]) -> Adapter {
        let settings = AdapterConfig {
            userid: Some("42".into()),
            api_type: Some(api_type),
            sensors: Some(sensors.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        Adapter::setup(settings).unwrap()
    }

    fn sensor_ids(adapter: &Adapter) -> Vec<&'static str> {
        adapter.sensors().iter().map(|s| s.metric().id).collect()
    }

    const MIXED: [&str; 5] = ["Keys", "RankKeys", "UptimeShort", "UnpulsedKeys", "RealtimeUpload"];

    #[test]
    fn public_skips_client_only_sensors() {
        let a = adapter(ApiType::Public, &MIXED);
        assert_eq!(sensor_ids(&a), vec!["Keys", "RankKeys", "UptimeShort"]);
        assert!(a.buttons().is_empty());
    }

    #[test]
    fn client_skips_public_only_sensors() {
        let a = adapter(ApiType::Client, &MIXED);
        assert_eq!(sensor_ids(&a), vec!["Keys", "UnpulsedKeys", "RealtimeUpload"]);
        let ids: Vec<_> = a.buttons().iter().map(|b| b.action().id()).collect();
        assert_eq!(ids, vec!["pulse", "open_window"]);
    }

    #[test]
    fn both_keeps_everything() {
        let a = adapter(ApiType::Both, &MIXED);
        assert_eq!(sensor_ids(&a), MIXED.to_vec());
        assert_eq!(a.buttons().len(), 2);
    }

    #[tokio::test]
    async fn service_requires_client_api() {
        let a = adapter(ApiType::Public, &["Keys"]);
        let id = ProfileId::try_from(1).unwrap();
        assert!(matches!(
            a.activate_profile(id, None).await,
            Err(WhatPulseError::ClientApiDisabled)
        ));
    }

    #[tokio::test]
    async fn unknown_button_is_an_error() {
        let a = adapter(ApiType::Client, &["Keys"]);
        assert!(matches!(a.press("reboot").await, Err(WhatPulseError::UnknownAction(_))));
    }

    #[tokio::test]
    async fn bad_override_url_is_an_error() {
        let a = adapter(ApiType::Client, &["Keys"]);
        let id = ProfileId::try_from(1).unwrap();
        assert!(matches!(
            a.activate_profile(id, Some("nope")).await,
            Err(WhatPulseError::InvalidUrl { .. })
        ));
    }
}
