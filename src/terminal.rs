//! Terminal front-end: draws session views on stdout.

use crate::quiz::render::{QuestionView, Renderer};

#[derive(Default)]
pub struct TerminalRenderer;

impl Renderer for TerminalRenderer {
    fn render_loading(&mut self) {
        println!();
        println!("Generating dilemma...");
    }

    fn render_question(&mut self, view: &QuestionView) {
        println!();
        println!("Dilemma {} of {}", view.number, view.total);
        println!("{}", "-".repeat(60));
        println!("{}", view.dilemma);
        println!();
        println!("{}", view.question);
        println!();
        for option in &view.options {
            let marker = if view.selected.as_deref() == Some(option.id.as_str()) {
                ">"
            } else {
                " "
            };
            println!("{} [{}] {}", marker, option.id, option.text);
        }
        println!();
        match &view.selected {
            Some(id) => println!("Selected {id}. Press Enter to submit, or pick another option."),
            None => println!("Type an option id (A, B, C) to select it."),
        }
    }

    fn render_feedback(&mut self, text: &str) {
        println!();
        println!("Feedback:");
        println!("  {text}");
        println!();
        println!("Press 'n' for the next dilemma.");
    }

    fn render_error(&mut self, message: &str) {
        println!();
        println!("Error: {message}");
        println!("Press 'r' to retry.");
    }

    fn render_finished(&mut self, total: usize) {
        println!();
        println!("You have completed all {total} dilemmas. Thank you for reflecting!");
        println!("Press 's' to start over, or 'q' to quit.");
    }
}
