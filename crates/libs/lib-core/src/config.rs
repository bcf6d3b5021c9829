//! # Application Configuration
//!
//! This module manages configuration loaded from environment variables.
//! All configuration is validated on startup to fail fast if misconfigured.
//!
//! ## Variables
//!
//! | Variable | Default |
//! |---|---|
//! | `NETWORK` | `polkadot` |
//! | `PRICE_API_URL` | `https://api.binance.com/api/v3/ticker/24hr` |
//! | `PRICE_POLL_INTERVAL_SECS` | `30` |
//! | `PRICE_FETCH_TIMEOUT_SECS` | `10` |
//! | `ENABLED_SERVICES` | `binance_spot` |
//! | `LOCAL_STORE_PATH` | `data/local_store.json` |
//!
//! ## Global Config Access
//!
//! Use [`core_config()`] to access the global configuration instance:
//!
//! ```rust,no_run
//! use lib_core::config::core_config;
//!
//! let config = core_config();
//! let interval = config.price_poll_interval_secs;
//! ```
//!
//! The config must be initialized once at application startup using [`init_config()`].

use lib_utils::envs::{get_env_list, get_env_or, get_env_parse_or};
use lib_utils::validation::{validate_http_url, validate_not_empty, validate_range};
use serde::Serialize;
use std::sync::OnceLock;

pub const DEFAULT_PRICE_API_URL: &str = "https://api.binance.com/api/v3/ticker/24hr";
pub const DEFAULT_PRICE_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_PRICE_FETCH_TIMEOUT_SECS: u64 = 10;

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug, Serialize)]
pub struct Config {
    /// Active network name (`polkadot`, `kusama`, `westend`)
    pub network: String,

    /// 24h ticker endpoint queried with `?symbol=<TICKER>`
    pub price_api_url: String,

    /// Price polling period in seconds
    ///
    /// Valid range: 5-3600
    pub price_poll_interval_secs: u64,

    /// HTTP timeout for a single price request
    ///
    /// Valid range: 1-120
    pub price_fetch_timeout_secs: u64,

    /// Enabled external services (e.g. `binance_spot`)
    pub enabled_services: Vec<String>,

    /// JSON file backing the durable local store
    pub local_store_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: "polkadot".to_string(),
            price_api_url: DEFAULT_PRICE_API_URL.to_string(),
            price_poll_interval_secs: DEFAULT_PRICE_POLL_INTERVAL_SECS,
            price_fetch_timeout_secs: DEFAULT_PRICE_FETCH_TIMEOUT_SECS,
            enabled_services: vec!["binance_spot".to_string()],
            local_store_path: "data/local_store.json".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let defaults = Config::default();

        let network = get_env_or("NETWORK", &defaults.network).to_lowercase();
        let price_api_url = get_env_or("PRICE_API_URL", &defaults.price_api_url);

        let price_poll_interval_secs =
            get_env_parse_or("PRICE_POLL_INTERVAL_SECS", defaults.price_poll_interval_secs)
                .map_err(|e| format!("PRICE_POLL_INTERVAL_SECS must be a valid number: {}", e))?;

        let price_fetch_timeout_secs =
            get_env_parse_or("PRICE_FETCH_TIMEOUT_SECS", defaults.price_fetch_timeout_secs)
                .map_err(|e| format!("PRICE_FETCH_TIMEOUT_SECS must be a valid number: {}", e))?;

        let enabled_services = get_env_list("ENABLED_SERVICES", "binance_spot");
        let local_store_path = get_env_or("LOCAL_STORE_PATH", &defaults.local_store_path);

        Ok(Self {
            network,
            price_api_url,
            price_poll_interval_secs,
            price_fetch_timeout_secs,
            enabled_services,
            local_store_path,
        })
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        validate_not_empty(&self.network, "NETWORK")?;
        validate_not_empty(&self.local_store_path, "LOCAL_STORE_PATH")?;
        validate_http_url(&self.price_api_url, "PRICE_API_URL")?;
        validate_range(self.price_poll_interval_secs, 5, 3600, "PRICE_POLL_INTERVAL_SECS")?;
        validate_range(self.price_fetch_timeout_secs, 1, 120, "PRICE_FETCH_TIMEOUT_SECS")?;
        Ok(())
    }
}

/// Global configuration instance (initialized once at startup).
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Initialize the global configuration.
///
/// # Errors
///
/// Returns an error if:
/// - Environment variables are invalid
/// - Configuration validation fails
/// - Config has already been initialized
pub fn init_config() -> Result<&'static Config, String> {
    let config = Config::from_env()?;
    config.validate()?;

    CONFIG
        .set(config)
        .map_err(|_| "Config has already been initialized".to_string())?;
    Ok(core_config())
}

/// Get a reference to the global configuration.
///
/// # Panics
///
/// Panics if [`init_config()`] has not been called yet.
pub fn core_config() -> &'static Config {
    CONFIG.get().expect("Config must be initialized with init_config() before use")
}
