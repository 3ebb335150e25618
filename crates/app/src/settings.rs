//! Handles settings for the application. Configuration is written in
//! `settings.toml`; any key can be overridden from the environment with the
//! `RIDEPAY__` prefix, e.g. `RIDEPAY__GATEWAY__SECRET_KEY`.
//!
//! See `settings.toml` for the configuration.
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use gateway::GatewayConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct Ledger {
    /// Share of a `both` credit that lands in the deposit bucket.
    #[serde(default = "default_deposit_percent")]
    pub both_credit_deposit_percent: u8,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            both_credit_deposit_percent: default_deposit_percent(),
        }
    }
}

fn default_deposit_percent() -> u8 {
    50
}

#[derive(Debug, Deserialize)]
pub struct Gateway {
    pub base_url: String,
    pub api_key: String,
    pub secret_key: String,
    pub contract_code: String,
    pub redirect_url: Option<String>,
    pub token_safety_margin_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl Gateway {
    pub fn to_config(&self) -> GatewayConfig {
        let mut config = GatewayConfig::new(
            &self.base_url,
            &self.api_key,
            &self.secret_key,
            &self.contract_code,
        );
        config.redirect_url = self.redirect_url.clone();
        if let Some(secs) = self.token_safety_margin_secs {
            config.token_safety_margin = Duration::from_secs(secs);
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        config
    }
}

#[derive(Debug, Deserialize)]
pub struct Reconciler {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Pending payments younger than this are left to the webhook.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

fn default_interval_secs() -> u64 {
    300
}

fn default_stale_after_secs() -> u64 {
    900
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    #[serde(default)]
    pub ledger: Ledger,
    pub gateway: Option<Gateway>,
    pub reconciler: Option<Reconciler>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings"))
            .add_source(
                Environment::with_prefix("RIDEPAY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }
}
