use std::env;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

// Client configuration for the booking screens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub availability_path: String,
    pub debounce_ms: u64,
    pub timeout_ms: u64,
    pub currency_symbol: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            availability_path: "/check-availability".to_string(),
            debounce_ms: 500,
            timeout_ms: 10_000,
            currency_symbol: "$".to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by any `BOOKING_*` variables present in the environment.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("BOOKING_BASE_URL") {
            config.base_url = v;
        }
        if let Some(v) = lookup("BOOKING_AVAILABILITY_PATH") {
            config.availability_path = v;
        }
        if let Some(v) = lookup("BOOKING_DEBOUNCE_MS") {
            config.debounce_ms = parse_number("BOOKING_DEBOUNCE_MS", &v)?;
        }
        if let Some(v) = lookup("BOOKING_TIMEOUT_MS") {
            config.timeout_ms = parse_number("BOOKING_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("BOOKING_CURRENCY_SYMBOL") {
            config.currency_symbol = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::ConfigError("base_url must not be empty".to_string()));
        }
        if self.debounce_ms == 0 {
            return Err(ClientError::ConfigError("debounce_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn availability_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.availability_path.trim_start_matches('/')
        )
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, ClientError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ClientError::ConfigError(format!("{key}={value:?}: {e}")))
}
