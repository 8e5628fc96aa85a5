//! # lib_whatpulse
//!
//! Building blocks for bridging WhatPulse statistics into a home-automation
//! host. Each folder is a module gated behind a cargo feature of the same
//! name; `full` (the default) enables everything.
//!
//! - **`retrieve`**: generic async HTTP client with bounded timeouts.
//! - **`stats`**: metric catalog, dual-source data client, metric resolver
//!   and the local client action invoker.
//! - **`configs`**: adapter configuration, file loading and validation.
//! - **`adapter`**: host-facing sensors, buttons, entity sink and poller.
//! - **`loggers`**: `tracing` subscriber setup.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod error;

#[cfg(feature = "retrieve")]
pub mod retrieve;

#[cfg(feature = "stats")]
pub mod stats;

#[cfg(feature = "configs")]
pub mod configs;

#[cfg(feature = "adapter")]
pub mod adapter;

#[cfg(feature = "loggers")]
pub mod loggers;

pub use error::WhatPulseError;
