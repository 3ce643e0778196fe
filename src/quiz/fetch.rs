//! One-shot dilemma acquisition.
//!
//! A fetcher performs exactly one request per invocation; retry is a
//! user-initiated action at the session layer, never done here.

use crate::quiz::payload::{DilemmaPayload, OptionCountRule, PayloadValidator, ValidationError};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timeout - the dilemma service took too long to respond")]
    Timeout,

    #[error("connection error - unable to reach the dilemma service")]
    Connect,

    #[error("network error: {0}")]
    Transport(String),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("the service returned a body that is not valid JSON: {0}")]
    Decode(String),

    #[error("the service returned incomplete or malformed data: {0}")]
    InvalidPayload(#[from] ValidationError),
}

/// Source of dilemmas, one payload per call.
///
/// The session controller only sees this seam; the endpoint-backed and
/// direct-generation implementations are interchangeable behind it.
#[async_trait::async_trait]
pub trait DilemmaFetcher: Send + Sync {
    async fn fetch(&self) -> Result<DilemmaPayload, FetchError>;
}

#[async_trait::async_trait]
impl DilemmaFetcher for Box<dyn DilemmaFetcher> {
    async fn fetch(&self) -> Result<DilemmaPayload, FetchError> {
        (**self).fetch().await
    }
}

/// Fetches dilemmas from a deployed generation endpoint
/// (`GET {url}` returning a `DilemmaPayload` body, or a non-success status
/// with `{ "error": "..." }` when generation failed).
pub struct HttpFetcher {
    client: Client,
    url: String,
    validator: PayloadValidator,
}

impl HttpFetcher {
    pub fn new(url: String, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            url,
            validator: PayloadValidator::new(OptionCountRule::AtLeastTwo),
        })
    }
}

#[async_trait::async_trait]
impl DilemmaFetcher for HttpFetcher {
    async fn fetch(&self) -> Result<DilemmaPayload, FetchError> {
        debug!(url = %self.url, "requesting dilemma");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.ok();
            let message = api_error_message(status, body.as_ref());
            warn!(status = status.as_u16(), %message, "dilemma request failed");
            return Err(FetchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(self.validator.validate(&raw)?)
    }
}

/// Best-available message for a non-success response. Prefers the server's
/// own `{ "error": ... }` field; the body may be missing or not JSON at all,
/// in which case the status carries the message.
fn api_error_message(status: reqwest::StatusCode, body: Option<&Value>) -> String {
    body.and_then(|b| b.get("error"))
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| format!("server error: {status}"))
}

fn classify_transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_connect() {
        FetchError::Connect
    } else {
        FetchError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn error_body_message_is_preferred() {
        let body = json!({ "error": "generation failed upstream" });
        assert_eq!(
            api_error_message(StatusCode::INTERNAL_SERVER_ERROR, Some(&body)),
            "generation failed upstream"
        );
    }

    #[test]
    fn json_body_without_error_field_falls_back_to_status() {
        let body = json!({ "detail": "something else entirely" });
        assert_eq!(
            api_error_message(StatusCode::BAD_GATEWAY, Some(&body)),
            "server error: 502 Bad Gateway"
        );

        // Non-string error values are no better than no message at all.
        let body = json!({ "error": 42 });
        assert_eq!(
            api_error_message(StatusCode::BAD_GATEWAY, Some(&body)),
            "server error: 502 Bad Gateway"
        );
    }

    #[test]
    fn absent_or_non_json_body_falls_back_to_status() {
        assert_eq!(
            api_error_message(StatusCode::SERVICE_UNAVAILABLE, None),
            "server error: 503 Service Unavailable"
        );
    }

    #[test]
    fn validator_errors_convert_into_fetch_errors() {
        let err: FetchError = ValidationError::MissingDilemma.into();
        assert!(err
            .to_string()
            .contains("missing or empty 'dilemma' field"));
    }

    #[test]
    fn api_error_carries_server_message() {
        let err = FetchError::Api {
            status: 500,
            message: "generation failed upstream".to_string(),
        };
        assert_eq!(err.to_string(), "generation failed upstream");
    }
}
