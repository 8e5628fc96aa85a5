//! Error taxonomy for setup and configuration.
//!
//! Only fatal conditions live here. Fetch and action failures are transient:
//! they are logged where they happen and degrade to stale data or `false`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WhatPulseError {
    #[error("Either username or userid must be provided when using the public API")]
    MissingIdentity,

    #[error("Unknown metric id: {0}")]
    UnknownMetric(String),

    #[error("Unknown API type: {0} (expected public, client or both)")]
    UnknownApiType(String),

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Profile id must be a positive integer, got {0}")]
    InvalidProfileId(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("The client API is not enabled for this adapter")]
    ClientApiDisabled,
}
