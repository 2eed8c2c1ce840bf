use std::fs::File;
use std::io::prelude::*;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::pricing::{DEFAULT_HISTORY_TTL, DEFAULT_QUOTE_TTL, DEFAULT_REFRESH_PACING, TtlPolicy};

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub log_level: String,
    pub port: u16,
    pub refresh_pacing_secs: u64,
    pub quote_ttl_secs: u64,
    pub history_ttl_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            port: DEFAULT_PORT,
            refresh_pacing_secs: DEFAULT_REFRESH_PACING.as_secs(),
            quote_ttl_secs: DEFAULT_QUOTE_TTL.as_secs(),
            history_ttl_secs: DEFAULT_HISTORY_TTL.as_secs(),
        }
    }
}

impl Settings {
    /// Reads a JSON settings file; missing keys keep their defaults.
    pub fn read_config_file(path: &str) -> Result<Settings> {
        let mut file = File::open(path).with_context(|| format!("opening settings file {path}"))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("parsing settings file {path}"))?;
        Ok(settings)
    }

    pub fn refresh_pacing(&self) -> Duration {
        Duration::from_secs(self.refresh_pacing_secs)
    }

    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy {
            quote_ttl: Duration::from_secs(self.quote_ttl_secs),
            history_ttl: Duration::from_secs(self.history_ttl_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_keep_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "logLevel": "debug", "port": 9000 }"#).expect("valid json");
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.refresh_pacing(), Duration::from_secs(12));
        assert_eq!(settings.ttl_policy(), TtlPolicy::default());
    }

    #[test]
    fn reads_settings_from_disk() {
        let path = std::env::temp_dir().join(format!("networth-settings-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "quoteTtlSecs": 60 }"#).expect("write settings");
        let settings =
            Settings::read_config_file(path.to_str().expect("utf-8 path")).expect("readable");
        std::fs::remove_file(&path).ok();
        assert_eq!(settings.ttl_policy().quote_ttl, Duration::from_secs(60));
        assert_eq!(settings.port, DEFAULT_PORT);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Settings::read_config_file("/definitely/not/here.json").is_err());
    }
}
