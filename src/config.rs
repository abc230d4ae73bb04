use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::MatchError;
use crate::feed::FeedSettings;
use crate::remote::RandomUserHttpClient;

pub const DEFAULT_CONFIG_FILE: &str = "match-mate.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub max_refill_attempts: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub fault_injection: Option<FaultInjectionEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FaultInjectionEntry {
    pub rate: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub base_url: String,
    pub feed: FeedSettings,
    pub timeout: Duration,
    pub data_dir: Utf8PathBuf,
    pub seed: Option<u64>,
    pub fault_injection: Option<FaultInjectionEntry>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `match-mate.json` in the working directory when no
    /// path is given. Only a missing default file falls back to defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, MatchError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| MatchError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| MatchError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, MatchError> {
        let defaults = FeedSettings::default();
        let feed = FeedSettings::new(
            config.page_size.unwrap_or(defaults.page_size),
            config.batch_size.unwrap_or(defaults.batch_size),
            config
                .max_refill_attempts
                .unwrap_or(defaults.max_refill_attempts),
        )?;

        if let Some(fault) = &config.fault_injection
            && !(0.0..=1.0).contains(&fault.rate)
        {
            return Err(MatchError::ConfigParse(format!(
                "fault_injection.rate must be within [0, 1], got {}",
                fault.rate
            )));
        }

        let data_dir = match config.data_dir {
            Some(dir) => Utf8PathBuf::from(dir),
            None => default_data_dir()?,
        };

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            base_url: config
                .base_url
                .unwrap_or_else(|| RandomUserHttpClient::DEFAULT_BASE_URL.to_string()),
            feed,
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(30)),
            data_dir,
            seed: config.seed,
            fault_injection: config.fault_injection,
        })
    }
}

pub fn default_data_dir() -> Result<Utf8PathBuf, MatchError> {
    BaseDirs::new()
        .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.data_dir().join("match-mate")).ok())
        .ok_or_else(|| MatchError::StorageFailure("unable to resolve data directory".to_string()))
}
