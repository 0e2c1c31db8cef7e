use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use quiz_core::{QuestionSource, QuizController, StaticQuestionSource, TriviaApiSource};
use shared::protocol::{Intent, SessionState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, Settings};
use render::Renderer;

const HELP: &str = "Commands: start, 1-9 (select), submit (or empty line), pause, resume, next, retry, help, quit";

#[derive(Parser, Debug)]
#[command(name = "quiz", about = "Timed multiple-choice trivia quiz")]
struct Args {
    /// TOML settings file (defaults to ./quiz.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Use the built-in question bank instead of the trivia service.
    #[arg(long)]
    offline: bool,
    #[arg(long)]
    count: Option<usize>,
    #[arg(long)]
    duration_ms: Option<u64>,
    #[arg(long)]
    base_url: Option<String>,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if self.offline {
            settings.offline = true;
        }
        if let Some(count) = self.count {
            settings.question_count = count;
        }
        if let Some(duration_ms) = self.duration_ms {
            settings.question_duration_ms = duration_ms;
        }
        if let Some(base_url) = &self.base_url {
            settings.trivia_base_url = base_url.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Intent(Intent),
    /// 1-based option number.
    Select(usize),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let word = line.trim().to_ascii_lowercase();
    let command = match word.as_str() {
        "" | "submit" | "s" => Command::Intent(Intent::SubmitAnswer),
        "start" => Command::Intent(Intent::StartQuiz),
        "pause" | "p" => Command::Intent(Intent::PauseTimer),
        "resume" | "r" => Command::Intent(Intent::ResumeTimer),
        "next" | "n" => Command::Intent(Intent::MoveToNextQuestion),
        "retry" => Command::Intent(Intent::Retry),
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => match other.parse::<usize>() {
            Ok(n @ 1..=9) => Command::Select(n),
            _ => return None,
        },
    };
    Some(command)
}

/// Maps an option number to the option text of the question on screen.
fn selection_for(state: &SessionState, number: usize) -> Option<String> {
    let question = state.progress()?.current_question()?;
    question.options().get(number.checked_sub(1)?).cloned()
}

fn build_source(settings: &Settings) -> Result<Arc<dyn QuestionSource>> {
    if settings.offline {
        let bank = StaticQuestionSource::sample_bank()?.with_shuffle(true);
        info!(questions = bank.len(), "quiz: using offline question bank");
        return Ok(Arc::new(bank));
    }
    let source = TriviaApiSource::new(&settings.trivia_base_url, settings.request_timeout())?;
    info!(base_url = %settings.trivia_base_url, "quiz: using trivia service");
    Ok(Arc::new(source))
}

async fn render_states(mut states: impl Stream<Item = SessionState> + Unpin) {
    let mut renderer = Renderer::default();
    while let Some(state) = states.next().await {
        for line in renderer.render(&state) {
            println!("{line}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    args.apply(&mut settings);
    let quiz_settings = settings.quiz_settings();
    quiz_settings.validate()?;

    let controller = QuizController::new(build_source(&settings)?, quiz_settings);
    let renderer = tokio::spawn(render_states(controller.state_stream()));

    println!("{HELP}");
    println!("Type `start` to begin a new quiz.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Some(Command::Intent(intent)) => {
                controller.dispatch(intent).await;
            }
            Some(Command::Select(number)) => {
                let state = controller.snapshot().await;
                match selection_for(&state, number) {
                    Some(choice) => {
                        controller.dispatch(Intent::SelectAnswer(choice)).await;
                    }
                    None => println!("There is no option {number} right now."),
                }
            }
            Some(Command::Help) => println!("{HELP}"),
            Some(Command::Quit) => break,
            None => warn!(input = line.trim(), "quiz: unknown command"),
        }
    }

    controller.shutdown().await;
    renderer.abort();
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
