//! Environment-driven configuration.
//!
//! Required variables depend on the mode: `DILEMMA_API_URL` points the quiz
//! at a deployed generation endpoint, `GEMINI_API_KEY` enables direct
//! generation against the generative-language API. At least one must be
//! present.

use crate::quiz::session::DEFAULT_TOTAL;
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("neither DILEMMA_API_URL nor GEMINI_API_KEY is set")]
    NoDilemmaSource,

    #[error("{var} is not a valid URL: {reason}")]
    InvalidUrl { var: &'static str, reason: String },

    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Deployed generation endpoint; preferred when present.
    pub dilemma_api_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_api_url: String,
    pub gemini_model: String,
    pub total_dilemmas: usize,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dilemma_api_url: None,
            gemini_api_key: None,
            gemini_api_url: DEFAULT_GEMINI_API_URL.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            total_dilemmas: DEFAULT_TOTAL,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }
}

impl Config {
    /// Read configuration from the process environment, validating as we
    /// go. Missing optional variables fall back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        config.dilemma_api_url = non_empty_var("DILEMMA_API_URL");
        config.gemini_api_key = non_empty_var("GEMINI_API_KEY");

        if let Some(api_url) = non_empty_var("GEMINI_API_URL") {
            config.gemini_api_url = api_url;
        }
        if let Some(model) = non_empty_var("GEMINI_MODEL") {
            config.gemini_model = model;
        }
        if let Some(total) = non_empty_var("TOTAL_DILEMMAS") {
            config.total_dilemmas = parse_positive("TOTAL_DILEMMAS", &total)?;
        }
        if let Some(seconds) = non_empty_var("REQUEST_TIMEOUT_SECONDS") {
            config.request_timeout =
                Duration::from_secs(parse_positive("REQUEST_TIMEOUT_SECONDS", &seconds)? as u64);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.dilemma_api_url.is_none() && self.gemini_api_key.is_none() {
            return Err(ConfigError::NoDilemmaSource);
        }
        if let Some(url) = &self.dilemma_api_url {
            Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
                var: "DILEMMA_API_URL",
                reason: e.to_string(),
            })?;
        }
        Url::parse(&self.gemini_api_url).map_err(|e| ConfigError::InvalidUrl {
            var: "GEMINI_API_URL",
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_positive(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        }),
    }
}
