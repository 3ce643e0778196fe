//! Dilemma payload model and shape validation.
//!
//! The generative model is asked for strict JSON, but what actually comes
//! back is only ever trusted after passing [`PayloadValidator`]. Validation
//! is a pure function over a decoded [`serde_json::Value`]; every check has
//! its own error kind so failures name the violated constraint.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One selectable answer choice within a dilemma.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DilemmaOption {
    pub id: String,
    pub text: String,
}

/// One validated question unit: scenario, question, labeled options and
/// per-option feedback keyed by option id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DilemmaPayload {
    pub dilemma: String,
    pub question: String,
    pub options: Vec<DilemmaOption>,
    pub feedback: HashMap<String, String>,
}

impl DilemmaPayload {
    /// Feedback text for an option id, if the payload carries one.
    pub fn feedback_for(&self, option_id: &str) -> Option<&str> {
        self.feedback.get(option_id).map(String::as_str)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("missing or empty 'dilemma' field")]
    MissingDilemma,

    #[error("missing or empty 'question' field")]
    MissingQuestion,

    #[error("'options' must be an array of {expected}, got {got}")]
    InvalidOptionsShape { expected: &'static str, got: usize },

    #[error("option at index {index} is missing a non-empty 'id' or 'text'")]
    MalformedOption { index: usize },

    #[error("missing or empty 'feedback' object")]
    MissingFeedback,

    #[error("no feedback entry for option '{option_id}'")]
    FeedbackOptionMismatch { option_id: String },
}

/// How many options a payload must carry to be accepted.
///
/// The generation contract promises exactly three, but the consuming side
/// historically tolerated any two-or-more. Both strictness levels are kept
/// as explicit configurations: the fetcher accepts `AtLeastTwo`, the
/// provider validates its own synthesis with `ExactlyThree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionCountRule {
    AtLeastTwo,
    ExactlyThree,
}

impl OptionCountRule {
    fn accepts(self, len: usize) -> bool {
        match self {
            OptionCountRule::AtLeastTwo => len >= 2,
            OptionCountRule::ExactlyThree => len == 3,
        }
    }

    fn expectation(self) -> &'static str {
        match self {
            OptionCountRule::AtLeastTwo => "at least 2 options",
            OptionCountRule::ExactlyThree => "exactly 3 options",
        }
    }
}

pub struct PayloadValidator {
    option_count: OptionCountRule,
}

impl PayloadValidator {
    pub fn new(option_count: OptionCountRule) -> Self {
        Self { option_count }
    }

    /// Decide acceptance of a raw decoded value and normalize it into a
    /// [`DilemmaPayload`]. Checks run in a fixed order; the first failure
    /// wins. Option order is preserved and extra feedback keys are
    /// tolerated.
    pub fn validate(&self, raw: &Value) -> Result<DilemmaPayload, ValidationError> {
        let obj = raw.as_object().ok_or(ValidationError::NotAnObject)?;

        let dilemma = non_empty_string(obj.get("dilemma"))
            .ok_or(ValidationError::MissingDilemma)?;
        let question = non_empty_string(obj.get("question"))
            .ok_or(ValidationError::MissingQuestion)?;

        let raw_options = obj
            .get("options")
            .and_then(Value::as_array)
            .ok_or(ValidationError::InvalidOptionsShape {
                expected: self.option_count.expectation(),
                got: 0,
            })?;
        if !self.option_count.accepts(raw_options.len()) {
            return Err(ValidationError::InvalidOptionsShape {
                expected: self.option_count.expectation(),
                got: raw_options.len(),
            });
        }

        let mut options = Vec::with_capacity(raw_options.len());
        for (index, raw_option) in raw_options.iter().enumerate() {
            let option = raw_option
                .as_object()
                .and_then(|o| {
                    Some(DilemmaOption {
                        id: non_empty_string(o.get("id"))?,
                        text: non_empty_string(o.get("text"))?,
                    })
                })
                .ok_or(ValidationError::MalformedOption { index })?;
            options.push(option);
        }

        let raw_feedback = obj
            .get("feedback")
            .and_then(Value::as_object)
            .filter(|f| !f.is_empty())
            .ok_or(ValidationError::MissingFeedback)?;

        let mut feedback = HashMap::with_capacity(raw_feedback.len());
        for (key, value) in raw_feedback {
            if let Some(text) = value.as_str() {
                feedback.insert(key.clone(), text.to_string());
            }
        }
        for option in &options {
            if !feedback.contains_key(&option.id) {
                return Err(ValidationError::FeedbackOptionMismatch {
                    option_id: option.id.clone(),
                });
            }
        }

        Ok(DilemmaPayload {
            dilemma,
            question,
            options,
            feedback,
        })
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?;
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
