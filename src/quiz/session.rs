//! Quiz session state machine.
//!
//! One session walks through a fixed number of dilemmas, fetching them
//! strictly one at a time. All transitions happen on a single logical
//! thread: every fetch is awaited inline from a `&mut self` method, so at
//! most one request is ever in flight and a stale response can never
//! overwrite newer state.
//!
//! ```text
//! Loading ──ok──▶ Presenting ──select──▶ Presenting
//!    │                 │
//!   err              submit
//!    ▼                 ▼
//!  Error ──retry──▶ Revealed ──advance──▶ Loading | Finished ──restart──▶ Loading
//! ```

use crate::quiz::fetch::DilemmaFetcher;
use crate::quiz::payload::DilemmaPayload;
use crate::quiz::render::{QuestionView, Renderer};
use tracing::{debug, info, warn};

/// Canonical session length.
pub const DEFAULT_TOTAL: usize = 20;

/// Shown when the selected option has no feedback entry. Validation makes
/// this unreachable in practice, but a gap here is tolerated rather than
/// treated as an error.
pub const FALLBACK_FEEDBACK: &str = "No specific feedback is available for this option.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Error,
    Presenting,
    Revealed,
    Finished,
}

/// The single mutable value of a session. Owned exclusively by the
/// controller; rendering reads derived views, never this directly.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// How many dilemmas have been advanced past (0-based position).
    /// Increments only on explicit advance, never on error or retry.
    pub question_index: usize,
    pub current: Option<DilemmaPayload>,
    pub selected: Option<String>,
    pub phase: Phase,
    pub last_error: Option<String>,
}

impl SessionState {
    fn fresh() -> Self {
        Self {
            question_index: 0,
            current: None,
            selected: None,
            phase: Phase::Loading,
            last_error: None,
        }
    }
}

/// Drives a session over a fetcher and a renderer. Every user-facing event
/// maps onto one method; methods outside their legal phase are no-ops.
pub struct SessionController<F, R> {
    fetcher: F,
    renderer: R,
    total: usize,
    state: SessionState,
}

impl<F: DilemmaFetcher, R: Renderer> SessionController<F, R> {
    pub fn new(fetcher: F, renderer: R, total: usize) -> Self {
        Self {
            fetcher,
            renderer,
            total,
            state: SessionState::fresh(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Begin the session: load the dilemma at position 0.
    pub async fn start(&mut self) {
        info!(total = self.total, "starting quiz session");
        self.load_current().await;
    }

    /// User picked an option. Single-selection semantics: a new pick always
    /// replaces the prior one.
    pub fn select(&mut self, option_id: &str) {
        if self.state.phase != Phase::Presenting {
            return;
        }
        let known = self
            .state
            .current
            .as_ref()
            .map(|p| p.options.iter().any(|o| o.id == option_id))
            .unwrap_or(false);
        if !known {
            warn!(option_id, "ignoring selection of unknown option");
            return;
        }
        self.state.selected = Some(option_id.to_string());
        let view = self.current_view();
        self.renderer.render_question(&view);
    }

    /// Reveal feedback for the current selection. Submitting with no
    /// selection is a guarded no-op. The selection is consumed here: it is
    /// only meaningful while presenting.
    pub fn submit(&mut self) {
        if self.state.phase != Phase::Presenting {
            return;
        }
        let Some(selected) = self.state.selected.take() else {
            return;
        };
        let feedback = self
            .state
            .current
            .as_ref()
            .and_then(|p| p.feedback_for(&selected))
            .unwrap_or(FALLBACK_FEEDBACK)
            .to_string();
        self.state.phase = Phase::Revealed;
        self.renderer.render_feedback(&feedback);
    }

    /// Move past the current dilemma: either load the next one or finish
    /// the session. The index increments exactly once per advance,
    /// independent of whether the next fetch succeeds.
    pub async fn advance(&mut self) {
        if self.state.phase != Phase::Revealed {
            return;
        }
        self.state.question_index += 1;
        if self.state.question_index < self.total {
            self.load_current().await;
        } else {
            info!(total = self.total, "session complete");
            self.state.phase = Phase::Finished;
            self.state.current = None;
            self.state.selected = None;
            self.renderer.render_finished(self.total);
        }
    }

    /// Re-attempt the fetch for the current position after a failure. The
    /// position is unchanged by failed attempts, so no progress is lost.
    pub async fn retry(&mut self) {
        if self.state.phase != Phase::Error {
            return;
        }
        self.load_current().await;
    }

    /// Reset the session from the terminal screen and begin again at
    /// position 0.
    pub async fn restart(&mut self) {
        if self.state.phase != Phase::Finished {
            return;
        }
        info!("restarting session");
        self.state = SessionState::fresh();
        self.load_current().await;
    }

    async fn load_current(&mut self) {
        self.state.phase = Phase::Loading;
        self.state.last_error = None;
        self.renderer.render_loading();

        match self.fetcher.fetch().await {
            Ok(payload) => {
                debug!(
                    index = self.state.question_index,
                    options = payload.options.len(),
                    "dilemma loaded"
                );
                self.state.current = Some(payload);
                self.state.selected = None;
                self.state.phase = Phase::Presenting;
                let view = self.current_view();
                self.renderer.render_question(&view);
            }
            Err(e) => {
                warn!(index = self.state.question_index, error = %e, "dilemma load failed");
                let message = e.to_string();
                self.state.phase = Phase::Error;
                self.state.last_error = Some(message.clone());
                self.renderer.render_error(&message);
            }
        }
    }

    fn current_view(&self) -> QuestionView {
        // Only called with a payload present (Presenting phase).
        let payload = self
            .state
            .current
            .as_ref()
            .cloned()
            .unwrap_or_else(|| DilemmaPayload {
                dilemma: String::new(),
                question: String::new(),
                options: Vec::new(),
                feedback: Default::default(),
            });
        QuestionView {
            number: self.state.question_index + 1,
            total: self.total,
            dilemma: payload.dilemma,
            question: payload.question,
            options: payload.options,
            selected: self.state.selected.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::fetch::FetchError;
    use crate::quiz::payload::DilemmaOption;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn sample_payload() -> DilemmaPayload {
        let mut feedback = HashMap::new();
        feedback.insert("A".to_string(), "fA".to_string());
        feedback.insert("B".to_string(), "fB".to_string());
        feedback.insert("C".to_string(), "fC".to_string());
        DilemmaPayload {
            dilemma: "A triage scenario.".to_string(),
            question: "Choose:".to_string(),
            options: vec![
                DilemmaOption { id: "A".to_string(), text: "Do X".to_string() },
                DilemmaOption { id: "B".to_string(), text: "Do Y".to_string() },
                DilemmaOption { id: "C".to_string(), text: "Do Z".to_string() },
            ],
            feedback,
        }
    }

    /// Replays a scripted sequence of fetch outcomes; once the script is
    /// exhausted every further fetch succeeds with the sample payload.
    struct ScriptedFetcher {
        script: Mutex<VecDeque<Result<DilemmaPayload, FetchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn always_ok() -> Self {
            Self::with_script(Vec::new())
        }

        fn with_script(script: Vec<Result<DilemmaPayload, FetchError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl<'a> DilemmaFetcher for &'a ScriptedFetcher {
        async fn fetch(&self) -> Result<DilemmaPayload, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(sample_payload()))
        }
    }

    #[derive(Debug, PartialEq, Eq)]
    enum Event {
        Loading,
        Question { number: usize, selected: Option<String> },
        Feedback(String),
        Error(String),
        Finished(usize),
    }

    #[derive(Default)]
    struct RecordingRenderer {
        events: Vec<Event>,
    }

    impl Renderer for RecordingRenderer {
        fn render_loading(&mut self) {
            self.events.push(Event::Loading);
        }
        fn render_question(&mut self, view: &QuestionView) {
            self.events.push(Event::Question {
                number: view.number,
                selected: view.selected.clone(),
            });
        }
        fn render_feedback(&mut self, text: &str) {
            self.events.push(Event::Feedback(text.to_string()));
        }
        fn render_error(&mut self, message: &str) {
            self.events.push(Event::Error(message.to_string()));
        }
        fn render_finished(&mut self, total: usize) {
            self.events.push(Event::Finished(total));
        }
    }

    fn controller(
        fetcher: &ScriptedFetcher,
        total: usize,
    ) -> SessionController<&ScriptedFetcher, RecordingRenderer> {
        SessionController::new(fetcher, RecordingRenderer::default(), total)
    }

    #[tokio::test]
    async fn start_presents_first_dilemma() {
        let fetcher = ScriptedFetcher::always_ok();
        let mut quiz = controller(&fetcher, 20);
        quiz.start().await;

        assert_eq!(quiz.state().phase, Phase::Presenting);
        assert_eq!(quiz.state().question_index, 0);
        assert!(quiz.state().selected.is_none());
        assert_eq!(
            quiz.renderer.events,
            vec![
                Event::Loading,
                Event::Question { number: 1, selected: None }
            ]
        );
    }

    #[tokio::test]
    async fn end_to_end_select_submit_advance() {
        let fetcher = ScriptedFetcher::always_ok();
        let mut quiz = controller(&fetcher, 20);
        quiz.start().await;

        quiz.select("B");
        assert_eq!(quiz.state().selected.as_deref(), Some("B"));

        quiz.submit();
        assert_eq!(quiz.state().phase, Phase::Revealed);
        assert!(quiz.renderer.events.contains(&Event::Feedback("fB".to_string())));
        // The selection is consumed by the reveal.
        assert!(quiz.state().selected.is_none());

        quiz.advance().await;
        assert_eq!(quiz.state().question_index, 1);
        assert_eq!(quiz.state().phase, Phase::Presenting);
        assert_eq!(fetcher.calls(), 2); // advance issued a new fetch
    }

    #[tokio::test]
    async fn monotonic_progression_ends_in_finished() {
        let fetcher = ScriptedFetcher::always_ok();
        let total = 3;
        let mut quiz = controller(&fetcher, total);
        quiz.start().await;

        for k in 1..=total {
            quiz.select("A");
            quiz.submit();
            quiz.advance().await;
            assert_eq!(quiz.state().question_index, k);
        }

        assert_eq!(quiz.state().phase, Phase::Finished);
        assert_eq!(fetcher.calls(), total); // no fetch after the last advance
        assert_eq!(quiz.renderer.events.last(), Some(&Event::Finished(total)));
    }

    #[tokio::test]
    async fn fetch_failure_enters_error_and_retry_preserves_position() {
        let fetcher = ScriptedFetcher::with_script(vec![
            Ok(sample_payload()),
            Err(FetchError::Timeout),
        ]);
        let mut quiz = controller(&fetcher, 20);
        quiz.start().await;

        // Advance into the failing fetch for position 1.
        quiz.select("A");
        quiz.submit();
        quiz.advance().await;
        assert_eq!(quiz.state().phase, Phase::Error);
        assert_eq!(quiz.state().question_index, 1);
        assert!(quiz.state().last_error.is_some());

        // Retry succeeds; position unchanged by the failed attempt.
        quiz.retry().await;
        assert_eq!(quiz.state().phase, Phase::Presenting);
        assert_eq!(quiz.state().question_index, 1);
    }

    #[tokio::test]
    async fn selection_is_exclusive() {
        let fetcher = ScriptedFetcher::always_ok();
        let mut quiz = controller(&fetcher, 20);
        quiz.start().await;

        quiz.select("A");
        quiz.select("B");
        assert_eq!(quiz.state().selected.as_deref(), Some("B"));
        assert_eq!(
            quiz.renderer.events.last(),
            Some(&Event::Question { number: 1, selected: Some("B".to_string()) })
        );
    }

    #[tokio::test]
    async fn submit_without_selection_is_a_noop() {
        let fetcher = ScriptedFetcher::always_ok();
        let mut quiz = controller(&fetcher, 20);
        quiz.start().await;

        quiz.submit();
        assert_eq!(quiz.state().phase, Phase::Presenting);
        assert!(!quiz
            .renderer
            .events
            .iter()
            .any(|e| matches!(e, Event::Feedback(_))));
    }

    #[tokio::test]
    async fn unknown_option_id_is_ignored() {
        let fetcher = ScriptedFetcher::always_ok();
        let mut quiz = controller(&fetcher, 20);
        quiz.start().await;

        quiz.select("Z");
        assert!(quiz.state().selected.is_none());
    }

    #[tokio::test]
    async fn missing_feedback_entry_falls_back() {
        let mut payload = sample_payload();
        payload.feedback.remove("B");
        let fetcher = ScriptedFetcher::with_script(vec![Ok(payload)]);
        let mut quiz = controller(&fetcher, 20);
        quiz.start().await;

        quiz.select("B");
        quiz.submit();
        assert_eq!(quiz.state().phase, Phase::Revealed);
        assert_eq!(
            quiz.renderer.events.last(),
            Some(&Event::Feedback(FALLBACK_FEEDBACK.to_string()))
        );
    }

    #[tokio::test]
    async fn restart_resets_everything() {
        let fetcher = ScriptedFetcher::always_ok();
        let total = 2;
        let mut quiz = controller(&fetcher, total);
        quiz.start().await;
        for _ in 0..total {
            quiz.select("C");
            quiz.submit();
            quiz.advance().await;
        }
        assert_eq!(quiz.state().phase, Phase::Finished);

        quiz.restart().await;
        assert_eq!(quiz.state().question_index, 0);
        assert!(quiz.state().last_error.is_none());
        assert_eq!(quiz.state().phase, Phase::Presenting);
        assert_eq!(
            quiz.renderer.events.last(),
            Some(&Event::Question { number: 1, selected: None })
        );
    }

    #[tokio::test]
    async fn out_of_phase_events_do_nothing() {
        let fetcher = ScriptedFetcher::with_script(vec![Err(FetchError::Connect)]);
        let mut quiz = controller(&fetcher, 20);
        quiz.start().await;
        assert_eq!(quiz.state().phase, Phase::Error);

        // None of these are legal from Error.
        quiz.select("A");
        quiz.submit();
        quiz.advance().await;
        quiz.restart().await;
        assert_eq!(quiz.state().phase, Phase::Error);
        assert_eq!(quiz.state().question_index, 0);
        assert_eq!(fetcher.calls(), 1);
    }
}
