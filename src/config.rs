use crate::storage::resolve_data_path;
use std::{env, path::PathBuf, time::Duration};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    /// Remote backend; remote sync is off when unset.
    pub api_base_url: Option<String>,
    pub api_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, std::io::Error> {
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let api_base_url = env::var("HABIT_API_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let api_timeout = env::var("HABIT_API_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS);

        Ok(Self {
            port,
            data_path: resolve_data_path()?,
            api_base_url,
            api_timeout: Duration::from_secs(api_timeout),
        })
    }
}
