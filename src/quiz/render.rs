//! State-to-instructions boundary between the session controller and
//! whatever actually draws the quiz.
//!
//! The controller computes view values and hands them over; it never touches
//! a display surface itself, which keeps the state machine testable without
//! one.

use crate::quiz::payload::DilemmaOption;

/// Everything a display layer needs to present one dilemma.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    /// 1-based position shown to the user ("Dilemma 3 of 20").
    pub number: usize,
    pub total: usize,
    pub dilemma: String,
    pub question: String,
    pub options: Vec<DilemmaOption>,
    /// Currently highlighted option, if any. At most one.
    pub selected: Option<String>,
}

/// Side-effecting display collaborator. Implementations must not mutate
/// session state; they only reflect it.
pub trait Renderer {
    fn render_loading(&mut self);
    fn render_question(&mut self, view: &QuestionView);
    fn render_feedback(&mut self, text: &str);
    fn render_error(&mut self, message: &str);
    fn render_finished(&mut self, total: usize);
}
