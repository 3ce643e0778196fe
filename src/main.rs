//! Terminal quiz runner: wires a dilemma source, the session controller and
//! the stdout renderer into an input loop.

use anyhow::{Context, Result};
use dilemmas::provider::GeminiProvider;
use dilemmas::quiz::{DilemmaFetcher, HttpFetcher, Phase, SessionController};
use dilemmas::terminal::TerminalRenderer;
use dilemmas::Config;
use std::io::{self, BufRead, Write};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    let fetcher = build_fetcher(&config)?;

    let mut quiz = SessionController::new(fetcher, TerminalRenderer, config.total_dilemmas);
    quiz.start().await;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush().ok();
        let Some(line) = lines.next() else { break };
        let input = line.context("failed to read input")?.trim().to_uppercase();

        if input == "Q" {
            break;
        }

        let phase = quiz.state().phase;
        match phase {
            Phase::Presenting => {
                if input.is_empty() {
                    quiz.submit();
                } else {
                    quiz.select(&input);
                }
            }
            Phase::Revealed => {
                if input == "N" || input.is_empty() {
                    quiz.advance().await;
                }
            }
            Phase::Error => {
                if input == "R" || input.is_empty() {
                    quiz.retry().await;
                }
            }
            Phase::Finished => {
                if input == "S" {
                    quiz.restart().await;
                }
            }
            Phase::Loading => {}
        }
    }

    info!("session ended");
    Ok(())
}

/// Prefer a deployed generation endpoint when configured; otherwise talk to
/// the generative API directly.
fn build_fetcher(config: &Config) -> Result<Box<dyn DilemmaFetcher>> {
    if let Some(url) = &config.dilemma_api_url {
        let fetcher = HttpFetcher::new(url.clone(), config.request_timeout)
            .context("failed to set up endpoint fetcher")?;
        return Ok(Box::new(fetcher));
    }
    let api_key = config
        .gemini_api_key
        .as_deref()
        .context("GEMINI_API_KEY is not set")?;
    let provider = GeminiProvider::new(
        &config.gemini_api_url,
        &config.gemini_model,
        api_key,
        config.request_timeout,
    )
    .context("failed to set up generative provider")?;
    Ok(Box::new(provider))
}
