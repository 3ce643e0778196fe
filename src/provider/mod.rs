//! Direct dilemma generation against the Google generative-language API.
//!
//! This is the other side of the fetcher seam: instead of asking a deployed
//! endpoint for a finished payload, [`GeminiProvider`] prompts the model
//! itself, cleans up the returned text, and runs it through the strict
//! validator before anything downstream sees it. The model is asked for
//! JSON-only output, but residual markdown fences still show up often
//! enough that stripping them is part of the contract.

use crate::quiz::fetch::{DilemmaFetcher, FetchError};
use crate::quiz::payload::{DilemmaPayload, OptionCountRule, PayloadValidator, ValidationError};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const DILEMMA_PROMPT: &str = "\
Generate ONE concise ethical dilemma from the field of health care (medicine, \
nursing, health management, biomedical research, etc.).
The dilemma must be presented as a situation followed by a multiple-choice \
question with exactly 3 options (A, B, C).
Provide specific feedback for EACH of the 3 options, briefly explaining the \
ethical implications or the reasons why that option might be chosen or \
considered problematic.

MANDATORY response format (only the JSON object, no extra text and no \
markdown fences):
{
  \"dilemma\": \"Description of the ethical situation...\",
  \"question\": \"The specific question for the user...\",
  \"options\": [
    {\"id\": \"A\", \"text\": \"Text of option A...\"},
    {\"id\": \"B\", \"text\": \"Text of option B...\"},
    {\"id\": \"C\", \"text\": \"Text of option C...\"}
  ],
  \"feedback\": {
    \"A\": \"Feedback if A is chosen...\",
    \"B\": \"Feedback if B is chosen...\",
    \"C\": \"Feedback if C is chosen...\"
  }
}

Make sure the JSON is valid and follows this structure strictly. Keys must be \
double-quoted and the strings must not contain unnecessary line breaks.";

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request timeout - the generative API took too long to respond")]
    Timeout,

    #[error("connection error - unable to reach the generative API")]
    Connect,

    #[error("network error: {0}")]
    Transport(String),

    #[error("generative API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("the model returned no usable candidate{reason}")]
    NoCandidate { reason: String },

    #[error("the model response could not be interpreted as JSON: {0}")]
    Unparsable(String),

    #[error("the generated dilemma failed validation: {0}")]
    InvalidShape(#[from] ValidationError),
}

impl ProviderError {
    /// Collapse provider failures into the fetcher taxonomy. Transport
    /// problems keep their kind; everything else surfaces the way the
    /// serverless wrapper would, as a generation failure message.
    fn into_fetch_error(self) -> FetchError {
        match self {
            ProviderError::Timeout => FetchError::Timeout,
            ProviderError::Connect => FetchError::Connect,
            ProviderError::Transport(msg) => FetchError::Transport(msg),
            other => FetchError::Api {
                status: 500,
                message: format!("failed to generate the dilemma with the AI: {other}"),
            },
        }
    }
}

// Wire types for the generateContent endpoint.

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize, Deserialize, Debug)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug)]
struct Part {
    text: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Serialize, Debug)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

pub struct GeminiProvider {
    client: Client,
    endpoint: String,
    fences: Regex,
    validator: PayloadValidator,
}

impl GeminiProvider {
    pub fn new(
        api_url: &str,
        model: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to create HTTP client: {e}")))?;
        let endpoint = format!(
            "{}/models/{}:generateContent?key={}",
            api_url.trim_end_matches('/'),
            model,
            api_key
        );
        let fences = fence_regex()
            .map_err(|e| ProviderError::Unparsable(format!("invalid fence pattern: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            fences,
            validator: PayloadValidator::new(OptionCountRule::ExactlyThree),
        })
    }

    /// Prompt the model for one dilemma and validate what comes back.
    pub async fn generate(&self) -> Result<DilemmaPayload, ProviderError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: DILEMMA_PROMPT.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: "BLOCK_MEDIUM_AND_ABOVE",
                })
                .collect(),
        };

        debug!("requesting dilemma generation");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<Value>().await {
                Ok(body) => body
                    .pointer("/error/message")
                    .and_then(Value::as_str)
                    .map(String::from)
                    .unwrap_or_else(|| format!("status {status}")),
                Err(_) => format!("status {status}"),
            };
            warn!(status = status.as_u16(), %message, "generation request failed");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transport(format!("failed to read response body: {e}")))?;

        let text = extract_text(body)?;
        let cleaned = self.fences.replace_all(&text, "");
        let raw: Value = serde_json::from_str(cleaned.trim()).map_err(|e| {
            warn!(error = %e, "model text was not valid JSON");
            ProviderError::Unparsable(e.to_string())
        })?;

        Ok(self.validator.validate(&raw)?)
    }
}

#[async_trait::async_trait]
impl DilemmaFetcher for GeminiProvider {
    async fn fetch(&self) -> Result<DilemmaPayload, FetchError> {
        self.generate().await.map_err(ProviderError::into_fetch_error)
    }
}

fn classify_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else if e.is_connect() {
        ProviderError::Connect
    } else {
        ProviderError::Transport(e.to_string())
    }
}

// Residual markdown fences around the JSON payload, opening or closing.
fn fence_regex() -> Result<Regex, regex::Error> {
    Regex::new(r"^\s*```(?:json)?\s*|\s*```\s*$")
}

/// Pull the generated text out of the first candidate, turning safety
/// blocks and empty candidates into specific errors.
fn extract_text(body: GenerateResponse) -> Result<String, ProviderError> {
    if let Some(feedback) = &body.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            return Err(ProviderError::NoCandidate {
                reason: format!(" (prompt blocked: {reason})"),
            });
        }
    }
    let candidate = body
        .candidates
        .into_iter()
        .next()
        .ok_or(ProviderError::NoCandidate {
            reason: String::new(),
        })?;
    let finish_reason = candidate.finish_reason.clone();
    let text = candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .map(|p| p.text)
        .filter(|t| !t.trim().is_empty());
    match text {
        Some(text) => Ok(text),
        None => Err(ProviderError::NoCandidate {
            reason: finish_reason
                .map(|r| format!(" (finish reason: {r})"))
                .unwrap_or_default(),
        }),
    }
}
