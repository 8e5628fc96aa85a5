//! # Configuration Modules
//!
//! The adapter's configuration model: what the user writes (JSON file, CLI,
//! environment) and the validated settings the rest of the crate consumes.

/// Raw configuration, layering and validation into `AdapterSettings`.
pub mod adapter_config;

pub use adapter_config::{AdapterConfig, AdapterSettings};
