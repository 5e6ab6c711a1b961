//! Bot configuration from the environment

use crate::ledger::LedgerError;
use crate::transport::{TransportError, DEFAULT_API_URL};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CURRENCY: &str = "₽";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Bot token not set. Set BUDGET_BOT_TOKEN (or TOKEN).")]
    MissingToken,
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Anything that stops the bot from coming up
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Cannot prepare ledger directory: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Telegram API unreachable: {0}")]
    Transport(#[from] TransportError),
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub ledger_path: PathBuf,
    pub api_url: String,
    pub poll_timeout: Duration,
    pub currency: String,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let token = var("BUDGET_BOT_TOKEN")
            .or_else(|| var("TOKEN"))
            .ok_or(ConfigError::MissingToken)?;

        let ledger_path = var("BUDGET_LEDGER_PATH").map_or_else(
            || {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.budget-bot/budget.db"))
            },
            PathBuf::from,
        );

        let api_url = var("BUDGET_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let poll_timeout = match var("BUDGET_POLL_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Invalid {
                    name: "BUDGET_POLL_TIMEOUT_SECS",
                    value,
                })?,
            None => Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        };

        let currency = var("BUDGET_CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        Ok(Self {
            token,
            ledger_path,
            api_url,
            poll_timeout,
            currency,
        })
    }
}
