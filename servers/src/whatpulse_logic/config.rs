use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use lib_whatpulse::configs::AdapterConfig;
use lib_whatpulse::stats::client::ApiType;

const DEFAULT_CONFIG_FILE: &str = "server_whatpulse.conf";
const DEFAULT_PORT: u16 = 9003;

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[command(about = "WhatPulse statistics bridge", version)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    #[arg(long, env = "WHATPULSE_PORT", help = "Port for the HTTP surface.")]
    pub port: Option<u16>,

    #[arg(long, env = "WHATPULSE_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[arg(long, env = "WHATPULSE_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[arg(long, env = "WHATPULSE_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[command(flatten)]
    #[serde(flatten)]
    pub adapter: AdapterConfig,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            adapter: self.adapter.merge(other.adapter),
        }
    }

    /// The adapter part of the configuration. Unset keys are left for
    /// `AdapterConfig::validate` to default.
    pub fn adapter_config(&self) -> AdapterConfig {
        self.adapter.clone()
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"))
    }

    pub fn log_level(&self) -> String {
        self.log_level.clone().unwrap_or_else(|| "info".to_string())
    }
}

fn defaults() -> Config {
    Config {
        port: Some(DEFAULT_PORT),
        log_dir: Some(PathBuf::from("./logs")),
        log_level: Some("info".to_string()),
        ..Default::default()
    }
}

/// Defaults, then the JSON file, then environment variables and CLI flags.
pub fn load_config() -> anyhow::Result<Config> {
    load_config_from(Config::parse())
}

/// Layers `cli` over the configuration file it points at (or the default
/// file) over the built-in defaults.
///
/// A missing file is skipped; an unreadable or malformed one is an error.
pub fn load_config_from(cli: Config) -> anyhow::Result<Config> {
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = defaults();

    if config_file_path.exists() {
        let config_str = fs::read_to_string(&config_file_path)
            .with_context(|| format!("Failed to read config file: {}", config_file_path.display()))?;
        let file_config = serde_json::from_str::<Config>(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", config_file_path.display()))?;
        current_config = current_config.merge(file_config);
    }

    Ok(current_config.merge(cli))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn cli_overrides_file_overrides_defaults() {
        let file = config_file(
            r#"{"port": 8080, "userid": "42", "api_type": "both", "sensors": ["Keys", "Clicks"]}"#,
        );
        let cli = Config {
            config_path: Some(file.path().to_path_buf()),
            adapter: AdapterConfig {
                api_type: Some(ApiType::Client),
                ..Default::default()
            },
            ..Default::default()
        };

        let config = load_config_from(cli).unwrap();
        assert_eq!(config.port(), 8080);
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.adapter.api_type, Some(ApiType::Client));
        assert_eq!(config.adapter.userid.as_deref(), Some("42"));
        assert_eq!(
            config.adapter.sensors,
            Some(vec!["Keys".to_string(), "Clicks".to_string()])
        );
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Config {
            config_path: Some(dir.path().join("absent.conf")),
            ..Default::default()
        };
        let config = load_config_from(cli).unwrap();
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.log_dir(), PathBuf::from("./logs"));
    }

    #[test]
    fn malformed_file_is_fatal() {
        let file = config_file(r#"{"api_type": "sideways"}"#);
        let cli = Config {
            config_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert!(load_config_from(cli).is_err());
    }

    #[test]
    fn adapter_part_validates() {
        let config = Config {
            adapter: AdapterConfig {
                username: Some("alice".into()),
                sensors: Some(vec!["Keys".into()]),
                scan_interval_secs: Some(60),
                ..Default::default()
            },
            ..defaults()
        };
        let settings = config.adapter_config().validate().unwrap();
        assert_eq!(settings.metrics.len(), 1);
        assert_eq!(settings.scan_interval.as_secs(), 60);
    }

    #[test]
    fn cli_flags_parse() {
        let cli = Config::try_parse_from([
            "server_whatpulse",
            "--api-type",
            "both",
            "--sensors",
            "Keys,RankKeys",
            "--userid",
            "7",
        ])
        .unwrap();
        assert_eq!(cli.adapter.api_type, Some(ApiType::Both));
        assert_eq!(
            cli.adapter.sensors,
            Some(vec!["Keys".to_string(), "RankKeys".to_string()])
        );
        assert_eq!(cli.adapter.userid.as_deref(), Some("7"));
    }
}
