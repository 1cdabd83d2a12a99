//! Configuration management for the swap sender
//!
//! Loads configuration from TOML files with environment variable substitution.

use crate::ledger::CommitmentLevel;

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "SWAP_SENDER_CONFIG";

lazy_static! {
    static ref ENV_VAR_PATTERN: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub rpc: RpcConfig,
    #[serde(default)]
    pub sender: SenderConfig,
    #[serde(default)]
    pub swap_api: SwapApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    /// Endpoints in failover order
    pub urls: Vec<String>,
    #[serde(default = "default_rpc_timeout_ms")]
    pub timeout_ms: u64,
    /// Commitment used for blockhash and block height reads
    #[serde(default)]
    pub commitment: CommitmentLevel,
    /// How long a submitted payload counts as a duplicate
    #[serde(default = "default_duplicate_window_ms")]
    pub duplicate_window_ms: u64,
}

/// Defaults for `SendOptions`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    pub max_confirmation_attempts: u32,
    pub confirmation_poll_interval_ms: u64,
    pub resend_interval_ms: u64,
    pub block_height_expiry_buffer: u64,
    pub rpc_retry_delay_ms: u64,
    pub skip_confirmation_check: bool,
    pub skip_preflight: bool,
    pub commitment: CommitmentLevel,
    pub max_retries: Option<usize>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            max_confirmation_attempts: 30,
            confirmation_poll_interval_ms: 1_000,
            resend_interval_ms: 1_000,
            block_height_expiry_buffer: 150,
            rpc_retry_delay_ms: 1_000,
            skip_confirmation_check: false,
            skip_preflight: true,
            commitment: CommitmentLevel::Confirmed,
            max_retries: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SwapApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for SwapApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://swap-api.solanatracker.io".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

fn default_rpc_timeout_ms() -> u64 {
    10_000
}

fn default_duplicate_window_ms() -> u64 {
    2_000
}

impl Settings {
    /// Load settings from the file named by `SWAP_SENDER_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml(&config_str)
    }

    /// Parse settings from TOML text
    pub fn from_toml(input: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(input);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.rpc.urls.is_empty() {
            anyhow::bail!("At least one RPC URL must be configured");
        }

        if self.rpc.urls.iter().any(|u| u.trim().is_empty()) {
            anyhow::bail!("RPC URLs must not be empty");
        }

        if self.sender.max_confirmation_attempts == 0 && !self.sender.skip_confirmation_check {
            anyhow::bail!("max_confirmation_attempts must be at least 1");
        }

        if self.sender.resend_interval_ms == 0 {
            anyhow::bail!("resend_interval_ms must be greater than zero");
        }

        if self.sender.skip_confirmation_check {
            tracing::warn!("Confirmation checks are disabled - sends are reported before landing");
        }

        Ok(())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();

    for cap in ENV_VAR_PATTERN.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
