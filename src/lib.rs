//! AI-generated ethical dilemma quiz for the health domain.
//!
//! The [`quiz`] module carries the core session state machine and payload
//! validation; [`provider`] talks to the generative-language API directly;
//! [`terminal`] is the stdout display layer used by the binary.

pub mod config;
pub mod provider;
pub mod quiz;
pub mod terminal;

pub use config::{Config, ConfigError};
pub use quiz::{
    DilemmaFetcher, DilemmaOption, DilemmaPayload, FetchError, HttpFetcher, Phase,
    QuestionView, Renderer, SessionController, SessionState, ValidationError,
};
