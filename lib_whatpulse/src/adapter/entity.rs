//! # Host Entities
//!
//! The single, catalog-driven sensor type and the button type, plus the
//! `EntitySink` seam through which a host registers and publishes them.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::stats::actions::{Action, ActionInvoker};
use crate::stats::catalog::MetricDescriptor;
use crate::stats::client::{Identity, Snapshot};
use crate::stats::resolver::{self, MetricAttributes, ResolvedMetric};

/// What a host sees of a sensor after an update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub unique_id: String,
    pub metric_id: &'static str,
    pub name: String,
    pub icon: &'static str,
    pub unit: &'static str,
    pub state: Option<Value>,
    pub attributes: MetricAttributes,
}

/// What a host sees of a button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonInfo {
    pub unique_id: String,
    pub action_id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

/// Host capability: "register entity with attributes X".
///
/// Implementations must be cheap and non-blocking; they are called from the
/// polling task.
pub trait EntitySink: Send + Sync {
    /// Adds or replaces the current state of a sensor.
    fn publish_sensor(&self, state: SensorState);

    /// Makes a button known to the host.
    fn register_button(&self, button: ButtonInfo);
}

/// One sensor per selected metric. Sensors hold no connection of their own:
/// the poller refreshes the shared data client and hands each sensor the
/// resulting snapshot.
#[derive(Debug, Clone)]
pub struct MetricSensor {
    metric: &'static MetricDescriptor,
    unique_id: String,
    last: ResolvedMetric,
}

impl MetricSensor {
    /// `identity` is the public account the sensor reports on; `None` for a
    /// client-only adapter.
    pub fn new(metric: &'static MetricDescriptor, identity: Option<&Identity>) -> Self {
        let owner = identity.map(Identity::value).unwrap_or("client");
        Self {
            unique_id: format!("whatpulse_{}_{}", owner, metric.id),
            metric,
            last: ResolvedMetric::default(),
        }
    }

    pub fn metric(&self) -> &'static MetricDescriptor {
        self.metric
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> String {
        format!("WhatPulse {}", self.metric.display_name)
    }

    /// Re-resolves this metric against a fresh snapshot.
    pub fn update(&mut self, snapshot: &Snapshot) {
        self.last = resolver::resolve_descriptor(self.metric, snapshot);
    }

    pub fn state(&self) -> SensorState {
        SensorState {
            unique_id: self.unique_id.clone(),
            metric_id: self.metric.id,
            name: self.name(),
            icon: self.metric.icon,
            unit: self.metric.unit,
            state: self.last.value.clone(),
            attributes: self.last.attributes.clone(),
        }
    }
}

/// A host button bound to one parameterless client action.
#[derive(Debug, Clone)]
pub struct ActionButton {
    action: Action,
    name: &'static str,
    icon: &'static str,
    description: &'static str,
    invoker: Arc<ActionInvoker>,
}

impl ActionButton {
    /// "WhatPulse Pulse": trigger a manual pulse.
    pub fn pulse(invoker: Arc<ActionInvoker>) -> Self {
        Self {
            action: Action::Pulse,
            name: "WhatPulse Pulse",
            icon: "mdi:pulse",
            description: "Trigger a manual pulse",
            invoker,
        }
    }

    /// "WhatPulse Open Client": show the client window.
    pub fn open_window(invoker: Arc<ActionInvoker>) -> Self {
        Self {
            action: Action::OpenWindow,
            name: "WhatPulse Open Client",
            icon: "mdi:window-maximize",
            description: "Show the WhatPulse client window",
            invoker,
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn info(&self) -> ButtonInfo {
        ButtonInfo {
            unique_id: format!("whatpulse_button_{}", self.action.id()),
            action_id: self.action.id(),
            name: self.name,
            icon: self.icon,
            description: self.description,
        }
    }

    /// Performs the action once; `true` on success.
    pub async fn press(&self) -> bool {
        self.invoker.invoke(&self.action).await
    }
}
