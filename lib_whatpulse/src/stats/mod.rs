//! # WhatPulse Statistics Module
//!
//! Everything that knows about WhatPulse data lives here. The host-facing
//! wiring (`adapter`) only ever calls into these four pieces.
//!
//! ## Contained Modules:
//!
//! - **`catalog`**: The static registry of every supported metric, with the
//!   keys needed to find it in either API.
//! - **`client`**: The dual-source data client. Two independently throttled
//!   caches (public web API, local client API) merged into one `Snapshot`.
//! - **`resolver`**: Decides, per metric, which source's value to surface
//!   and which rank/team/pulse attributes to attach.
//! - **`actions`**: Fire-and-forget POSTs against the local client API
//!   (manual pulse, open window, activate profile).

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// The static registry of supported metrics.
pub mod catalog;
/// The dual-source, independently throttled data client.
pub mod client;
/// Source-priority and fallback rules per metric.
pub mod resolver;
/// One-shot actions against the local client API.
pub mod actions;

// --- Public API Re-exports ---
pub use actions::{Action, ActionInvoker, ProfileId};
pub use catalog::MetricDescriptor;
pub use client::{ApiType, FetchState, Identity, Snapshot, Source, StatsClient, StatsClientOptions};
pub use resolver::{DataSource, MetricAttributes, ResolvedMetric};
