//! # Ethical Dilemma Quiz
//!
//! The core of the application: fetching AI-generated dilemmas, validating
//! their shape, and sequencing a session through them.
//!
//! ## Architecture
//!
//! ```text
//! DilemmaFetcher (one request) → PayloadValidator (accept/reject)
//!        → SessionController (state machine) → Renderer (display layer)
//! ```
//!
//! The controller is the only owner of session state; the fetcher and
//! renderer are collaborators behind traits so the whole flow runs headless
//! in tests.

pub mod fetch;
pub mod payload;
pub mod render;
pub mod session;

// Re-export commonly used types for easier access
pub use fetch::{DilemmaFetcher, FetchError, HttpFetcher};
pub use payload::{
    DilemmaOption, DilemmaPayload, OptionCountRule, PayloadValidator, ValidationError,
};
pub use render::{QuestionView, Renderer};
pub use session::{Phase, SessionController, SessionState, DEFAULT_TOTAL, FALLBACK_FEEDBACK};
