use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriviaSourceError {
    #[error("invalid trivia base url {raw:?}")]
    InvalidBaseUrl {
        raw: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build trivia http client")]
    Client(#[source] reqwest::Error),
    #[error("trivia request failed")]
    Request(#[from] reqwest::Error),
    #[error("trivia service responded with status {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("{name} must be greater than zero")]
    ZeroDuration { name: &'static str },
    #[error("question_count must be greater than zero")]
    ZeroQuestionCount,
    #[error("tick interval {tick:?} exceeds question duration {question:?}")]
    TickLongerThanQuestion { tick: Duration, question: Duration },
}
