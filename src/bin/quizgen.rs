//! quizgen: generate quiz questions from the command line.
//!
//! Usage:
//!   quizgen --topic volcanoes --kind open_ended --amount 3
//!   quizgen --topic "solar system" --kind mcq --amount 5 --shuffle
//!
//! The API key comes from the OS keyring (service `quizgen`, user `gemini`) or
//! `GEMINI_API_KEY`.

use anyhow::{Context, Result};
use clap::Parser;
use quizgen::quiz::{QuestionKind, QuizGenerator, QuizRequest};
use quizgen::telemetry::JsonLinesAttemptSink;
use quizgen::{ClientConfig, StrictOutputClient};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use std::sync::Arc;

/// Generate quiz questions with a language model
#[derive(Parser)]
#[command(name = "quizgen")]
#[command(about = "Generate validated quiz questions", long_about = None)]
#[command(version)]
struct Cli {
    /// Quiz topic (4 to 50 characters)
    #[arg(long)]
    topic: String,

    /// Question kind
    #[arg(long, value_parser = ["mcq", "open_ended"], default_value = "open_ended")]
    kind: String,

    /// Number of questions (1 to 10)
    #[arg(long, default_value = "3")]
    amount: u32,

    /// YAML client configuration; environment overrides still apply
    #[arg(long)]
    config: Option<PathBuf>,

    /// Attempt bound for this run
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Print store-ready questions with shuffled options
    #[arg(long)]
    shuffle: bool,

    /// Write one JSON line per attempt to stderr
    #[arg(long)]
    trace_attempts: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ClientConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ClientConfig::from_env()?,
    };

    let mut client =
        StrictOutputClient::from_config(&config, None).context("building Gemini client")?;
    if cli.trace_attempts {
        let sink = Arc::new(JsonLinesAttemptSink::new(std::io::stderr()));
        client = rebuild_with_sink(client, &config, sink);
    }

    let mut generator = QuizGenerator::new(client);
    if let Some(attempts) = cli.max_attempts {
        generator = generator.with_max_attempts(attempts);
    }

    let kind: QuestionKind = cli.kind.parse()?;
    let request = QuizRequest::new(cli.topic, kind, cli.amount);
    let quiz = generator.generate(&request).await?;

    let output = if cli.shuffle {
        let prepared = quiz.into_prepared(&mut rand::thread_rng());
        serde_json::to_string_pretty(&prepared)?
    } else {
        serde_json::to_string_pretty(&quiz)?
    };
    println!("{}", output);
    Ok(())
}

fn rebuild_with_sink(
    client: StrictOutputClient,
    config: &ClientConfig,
    sink: Arc<JsonLinesAttemptSink<std::io::Stderr>>,
) -> StrictOutputClient {
    StrictOutputClient::builder(client.model().clone())
        .apply_config(config)
        .attempt_sink(sink)
        .build()
}

/// `RUST_LOG` directives when set and valid, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_honours_rust_log() {
        assert_eq!(log_filter(Some("debug")).to_string(), "debug");
        assert_eq!(log_filter(Some("quizgen=trace")).to_string(), "quizgen=trace");
    }

    #[test]
    fn test_log_filter_defaults_to_info() {
        assert_eq!(log_filter(None).to_string(), "info");
        assert_eq!(log_filter(Some("  ")).to_string(), "info");
    }
}
