//! # Data Retrieval Module
//!
//! Generic HTTP plumbing shared by the WhatPulse data client and the action
//! invoker, so both talk to the network the same way: one `reqwest` client
//! per base URL, one bounded timeout per request, one response envelope.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: A generic HTTP `ApiClient` built on `reqwest`, with base
//!   URL handling, query strings, JSON bodies and a standardized
//!   `ApiResponse` that never turns an HTTP error status into an `Err`.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Generic HTTP API client with a bounded per-request timeout.
pub mod ky_http;
