use log::*;
use serde::{Deserialize, Serialize};
use std::{fs::read_to_string, path::Path, time::Duration};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub tick_interval_ms: u64,
    pub field_width: f64,
    pub field_height: f64,
    pub spawn_jitter: f64,
    pub pen_color: String,
    pub alert_secs: u64,
}

impl Default for Board {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            field_width: 800.0,
            field_height: 500.0,
            spawn_jitter: 5.0,
            pen_color: "#ffffff".to_string(),
            alert_secs: 4,
        }
    }
}

impl Board {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn alert_duration(&self) -> Duration {
        Duration::from_secs(self.alert_secs)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portal {
    pub url: String,
    pub access_token: String,
    pub require_https: bool,
    pub timeout_secs: u64,
}

impl Default for Portal {
    fn default() -> Self {
        Self {
            url: "https://api.academy.example".to_string(),
            access_token: String::new(),
            require_https: true,
            timeout_secs: 10,
        }
    }
}

impl Portal {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn token(&self) -> Option<&str> {
        if self.access_token.is_empty() {
            None
        } else {
            Some(&self.access_token)
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub board: Board,
    pub portal: Portal,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Config {
    pub fn new_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_file = read_to_string(path).inspect_err(|e| {
            error!("Failed to read config file: {e}");
        })?;

        toml::from_str(&config_file)
            .inspect_err(|e| error!("Failed to parse config file: {e}"))
            .map_err(ConfigError::from)
    }
}
