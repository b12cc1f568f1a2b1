use std::env;

use tempora_common::error::{TemporaError, TemporaResult};

use crate::partner::PartnerConfig;

#[derive(Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: String,
    pub partner: PartnerConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    /// Loads `.env` file if present, then reads required vars.
    pub fn from_env() -> TemporaResult<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: get_var("DATABASE_URL")?,
            log_level: get_var_or("LOG_LEVEL", "info"),
            partner: PartnerConfig::from_env()?,
        })
    }
}

/// Read a variable, treating an unset or blank value as missing.
pub(crate) fn non_blank_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn get_var(key: &str) -> TemporaResult<String> {
    non_blank_var(key)
        .ok_or_else(|| TemporaError::Config(format!("{key} is required but not set")))
}

pub(crate) fn get_var_or(key: &str, default: &str) -> String {
    non_blank_var(key).unwrap_or_else(|| default.to_owned())
}

pub(crate) fn get_parsed_or<T>(key: &str, default: T) -> TemporaResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_blank_var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| TemporaError::Config(format!("invalid {key}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
pub(crate) fn set_partner_vars() {
    env::set_var("PARTNER_CLIENT_ID", "client-id");
    env::set_var("PARTNER_CLIENT_SECRET", "client-secret");
    env::set_var("PARTNER_TOKEN_URL", "https://auth.example.com/oauth2/token");
    env::set_var("PARTNER_API_BASE_URL", "https://api.example.com");
}

#[cfg(test)]
pub(crate) fn clear_partner_vars() {
    for key in [
        "PARTNER_CLIENT_ID",
        "PARTNER_CLIENT_SECRET",
        "PARTNER_TOKEN_URL",
        "PARTNER_API_BASE_URL",
        "PARTNER_TOKEN_TIMEOUT_SECS",
        "PARTNER_TIMEOUT_SECS",
        "PARTNER_ORGANIZATIONS",
    ] {
        env::remove_var(key);
    }
}
