use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use quiz_core::{question_source::DEFAULT_TRIVIA_BASE_URL, settings, QuizSettings};
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "quiz.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub question_duration_ms: u64,
    pub tick_interval_ms: u64,
    pub feedback_delay_ms: u64,
    pub question_count: usize,
    pub trivia_base_url: String,
    pub request_timeout_ms: u64,
    pub offline: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            question_duration_ms: millis(settings::DEFAULT_QUESTION_DURATION),
            tick_interval_ms: millis(settings::DEFAULT_TICK_INTERVAL),
            feedback_delay_ms: millis(settings::DEFAULT_FEEDBACK_DELAY),
            question_count: settings::DEFAULT_QUESTION_COUNT,
            trivia_base_url: DEFAULT_TRIVIA_BASE_URL.into(),
            request_timeout_ms: 10_000,
            offline: false,
        }
    }
}

impl Settings {
    pub fn quiz_settings(&self) -> QuizSettings {
        QuizSettings::default()
            .with_question_duration(Duration::from_millis(self.question_duration_ms))
            .with_tick_interval(Duration::from_millis(self.tick_interval_ms))
            .with_feedback_delay(Duration::from_millis(self.feedback_delay_ms))
            .with_question_count(self.question_count)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Keys accepted in `quiz.toml`. Anything missing keeps its default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    question_duration_ms: Option<u64>,
    tick_interval_ms: Option<u64>,
    feedback_delay_ms: Option<u64>,
    question_count: Option<usize>,
    trivia_base_url: Option<String>,
    request_timeout_ms: Option<u64>,
    offline: Option<bool>,
}

/// Defaults, then the TOML file, then environment overrides.
///
/// A missing `quiz.toml` in the working directory is fine; a missing file
/// named explicitly with `--config` is an error.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (path, required) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.question_duration_ms {
        settings.question_duration_ms = v;
    }
    if let Some(v) = file_cfg.tick_interval_ms {
        settings.tick_interval_ms = v;
    }
    if let Some(v) = file_cfg.feedback_delay_ms {
        settings.feedback_delay_ms = v;
    }
    if let Some(v) = file_cfg.question_count {
        settings.question_count = v;
    }
    if let Some(v) = file_cfg.trivia_base_url {
        settings.trivia_base_url = v;
    }
    if let Some(v) = file_cfg.request_timeout_ms {
        settings.request_timeout_ms = v;
    }
    if let Some(v) = file_cfg.offline {
        settings.offline = v;
    }
    Ok(())
}

/// `APP__*` aliases win over the `QUIZ_*` names when both are set.
fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str, alias: &str| lookup(alias).or_else(|| lookup(name));

    if let Some(v) = parsed(var("QUIZ_QUESTION_DURATION_MS", "APP__QUESTION_DURATION_MS")) {
        settings.question_duration_ms = v;
    }
    if let Some(v) = parsed(var("QUIZ_TICK_INTERVAL_MS", "APP__TICK_INTERVAL_MS")) {
        settings.tick_interval_ms = v;
    }
    if let Some(v) = parsed(var("QUIZ_FEEDBACK_DELAY_MS", "APP__FEEDBACK_DELAY_MS")) {
        settings.feedback_delay_ms = v;
    }
    if let Some(v) = parsed(var("QUIZ_QUESTION_COUNT", "APP__QUESTION_COUNT")) {
        settings.question_count = v;
    }
    if let Some(v) = var("QUIZ_TRIVIA_BASE_URL", "APP__TRIVIA_BASE_URL") {
        settings.trivia_base_url = v;
    }
    if let Some(v) = parsed(var("QUIZ_REQUEST_TIMEOUT_MS", "APP__REQUEST_TIMEOUT_MS")) {
        settings.request_timeout_ms = v;
    }
}

fn parsed<T: std::str::FromStr>(raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(value = %raw, "config: ignoring unparsable environment value");
            None
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
