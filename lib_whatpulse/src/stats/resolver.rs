//! # Metric Resolver
//!
//! Turns a `Snapshot` into the value and attributes of one metric. Pure:
//! no I/O, no state, same input gives the same output.
//!
//! Order of evaluation:
//!
//! 1. Client document, by `client_path` (skipped for rank metrics). A hit on
//!    a realtime path returns right away.
//! 2. Public document. Rank metrics read `Ranks[rank_key]` and return.
//!    Otherwise the top-level field named like the metric fills the value if
//!    the client did not, and pulse/rank/team attributes are attached
//!    whichever source supplied the value.
//! 3. Nothing found: null value, null source. Not an error.

use serde::Serialize;
use serde_json::Value;

use crate::error::WhatPulseError;
use crate::stats::catalog::{self, MetricDescriptor};
use crate::stats::client::Snapshot;

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// The local client API.
    Client,
    /// The public web API.
    Public,
}

/// Auxiliary attributes published next to a metric's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricAttributes {
    /// Human readable time of the last pulse. Always published, `null`
    /// when unknown.
    pub last_pulse: Option<Value>,
    /// Unix time of the last pulse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_pulse_timestamp: Option<Value>,
    /// The user's leaderboard position for this metric. Always published,
    /// `null` when unknown.
    pub rank: Option<Value>,
    /// The user's team.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_name: Option<Value>,
    /// The team's leaderboard position for this metric.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_rank: Option<Value>,
    /// Which source supplied the value; `None` when nothing did.
    pub data_source: Option<DataSource>,
}

/// The outcome of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedMetric {
    /// The surfaced value, `None` before any source produced one.
    pub value: Option<Value>,
    /// Pulse, rank and team context.
    pub attributes: MetricAttributes,
}

/// Follows `path` through nested objects. Any missing key, any non-object
/// on the way, or a JSON `null` at the end yields `None`.
pub fn navigate<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let found = path
        .iter()
        .try_fold(root, |node, key| node.as_object()?.get(*key))?;
    (!found.is_null()).then_some(found)
}

/// Resolves a metric by id.
///
/// # Errors
/// `WhatPulseError::UnknownMetric` if the id is not in the catalog.
pub fn resolve(metric_id: &str, snapshot: &Snapshot) -> Result<ResolvedMetric, WhatPulseError> {
    let descriptor = catalog::lookup(metric_id)?;
    Ok(resolve_descriptor(descriptor, snapshot))
}

/// Resolves an already looked-up metric.
pub fn resolve_descriptor(metric: &MetricDescriptor, snapshot: &Snapshot) -> ResolvedMetric {
    let mut resolved = ResolvedMetric::default();

    if !metric.is_rank {
        if let (Some(path), Some(client)) = (metric.client_path, snapshot.client.as_deref()) {
            if let Some(value) = navigate(client, path) {
                resolved.value = Some(value.clone());
                resolved.attributes.data_source = Some(DataSource::Client);

                if metric.is_realtime() {
                    return resolved;
                }
            }
        }
    }

    let Some(public) = snapshot.public.as_deref() else {
        return resolved;
    };

    let own_rank = metric
        .rank_key
        .and_then(|key| navigate(public, &["Ranks", key]))
        .cloned();

    if metric.is_rank {
        if let Some(rank) = own_rank {
            resolved.value = Some(rank);
            resolved.attributes.data_source = Some(DataSource::Public);
        }
        return resolved;
    }

    if resolved.value.is_none() {
        if let Some(value) = navigate(public, &[metric.id]) {
            resolved.value = Some(value.clone());
            resolved.attributes.data_source = Some(DataSource::Public);
        }
    }

    let attrs = &mut resolved.attributes;
    attrs.last_pulse = navigate(public, &["LastPulse"]).cloned();
    attrs.last_pulse_timestamp = navigate(public, &["LastPulseUnixTimestamp"]).cloned();
    attrs.rank = own_rank;

    if let Some(team) = public.get("Team").filter(|t| t.is_object()) {
        attrs.team_name = navigate(team, &["Name"]).cloned();
        attrs.team_rank = metric
            .rank_key
            .and_then(|key| navigate(team, &["Ranks", key]))
            .cloned();
    }

    resolved
}
