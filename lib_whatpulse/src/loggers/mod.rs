/// Sets up `tracing` with console and daily rotating JSON file output.
pub mod logger;

pub use logger::{setup_logging, LoggingOptions};
