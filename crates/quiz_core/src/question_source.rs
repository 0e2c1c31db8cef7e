use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::{seq::SliceRandom, Rng};
use reqwest::Client;
use serde::Deserialize;
use shared::{domain::Question, error::QuestionError};
use tracing::{debug, warn};
use url::Url;

use crate::error::TriviaSourceError;

pub const DEFAULT_TRIVIA_BASE_URL: &str = "https://the-trivia-api.com";

/// Supplies the ordered questions for one quiz attempt.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn fetch_questions(&self, count: usize) -> Result<Vec<Question>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TriviaQuestion {
    id: String,
    question: TriviaQuestionText,
    correct_answer: String,
    incorrect_answers: Vec<String>,
    difficulty: String,
}

#[derive(Debug, Deserialize)]
struct TriviaQuestionText {
    text: String,
}

impl TriviaQuestion {
    fn into_question<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Question, QuestionError> {
        let mut options = self.incorrect_answers;
        options.push(self.correct_answer.clone());
        options.shuffle(rng);
        Question::new(
            self.id,
            self.question.text,
            options,
            self.correct_answer,
            self.difficulty,
        )
    }
}

/// Fetches questions from a Trivia API v2 compatible service.
pub struct TriviaApiSource {
    http: Client,
    base_url: Url,
}

impl TriviaApiSource {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, TriviaSourceError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(TriviaSourceError::Client)?;
        Self::with_client(http, base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, TriviaSourceError> {
        let trimmed = base_url.trim();
        let normalized = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{trimmed}/")
        };
        let base_url = Url::parse(&normalized).map_err(|source| {
            TriviaSourceError::InvalidBaseUrl {
                raw: base_url.to_string(),
                source,
            }
        })?;
        Ok(Self { http, base_url })
    }

    fn questions_url(&self, count: usize) -> Result<Url, TriviaSourceError> {
        let mut url = self
            .base_url
            .join("v2/questions")
            .map_err(|source| TriviaSourceError::InvalidBaseUrl {
                raw: self.base_url.to_string(),
                source,
            })?;
        url.query_pairs_mut()
            .append_pair("limit", &count.to_string());
        Ok(url)
    }
}

#[async_trait]
impl QuestionSource for TriviaApiSource {
    async fn fetch_questions(&self, count: usize) -> Result<Vec<Question>> {
        let url = self.questions_url(count)?;
        debug!(%url, count, "trivia: fetching questions");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(TriviaSourceError::Request)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TriviaSourceError::Status(status).into());
        }
        let payload: Vec<TriviaQuestion> =
            response.json().await.map_err(TriviaSourceError::Request)?;

        let mut rng = rand::thread_rng();
        let mut questions = Vec::with_capacity(payload.len());
        for raw in payload {
            match raw.into_question(&mut rng) {
                Ok(question) => questions.push(question),
                Err(err) => warn!("trivia: skipping malformed question: {err}"),
            }
        }
        Ok(questions)
    }
}

/// Serves questions from a fixed in-memory bank.
pub struct StaticQuestionSource {
    bank: Vec<Question>,
    shuffle: bool,
}

impl StaticQuestionSource {
    pub fn new(bank: Vec<Question>) -> Self {
        Self {
            bank,
            shuffle: false,
        }
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// General-knowledge bank used for offline play.
    pub fn sample_bank() -> Result<Self, QuestionError> {
        const BANK: &[(&str, &str, &[&str], &str, &str)] = &[
            ("offline-1", "What is the capital of Australia?", &["Sydney", "Canberra", "Melbourne", "Perth"], "Canberra", "easy"),
            ("offline-2", "Which planet is known as the Red Planet?", &["Venus", "Jupiter", "Mars", "Mercury"], "Mars", "easy"),
            ("offline-3", "Who wrote 'Pride and Prejudice'?", &["Charlotte Bronte", "Jane Austen", "Mary Shelley", "George Eliot"], "Jane Austen", "medium"),
            ("offline-4", "What is the chemical symbol for gold?", &["Ag", "Gd", "Au", "Go"], "Au", "easy"),
            ("offline-5", "In which year did the Berlin Wall fall?", &["1987", "1989", "1991", "1985"], "1989", "medium"),
            ("offline-6", "What is the largest ocean on Earth?", &["Atlantic", "Indian", "Arctic", "Pacific"], "Pacific", "easy"),
            ("offline-7", "How many bones are in the adult human body?", &["186", "206", "226", "246"], "206", "medium"),
            ("offline-8", "Which composer wrote 'The Four Seasons'?", &["Bach", "Vivaldi", "Handel", "Mozart"], "Vivaldi", "medium"),
            ("offline-9", "What is the smallest prime number?", &["0", "1", "2", "3"], "2", "easy"),
            ("offline-10", "Which element has atomic number 1?", &["Helium", "Oxygen", "Hydrogen", "Lithium"], "Hydrogen", "hard"),
        ];

        let bank = BANK
            .iter()
            .map(|(id, text, options, correct, difficulty)| {
                Question::new(
                    *id,
                    *text,
                    options.iter().map(|option| option.to_string()).collect(),
                    *correct,
                    *difficulty,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(bank))
    }

    pub fn len(&self) -> usize {
        self.bank.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bank.is_empty()
    }
}

#[async_trait]
impl QuestionSource for StaticQuestionSource {
    async fn fetch_questions(&self, count: usize) -> Result<Vec<Question>> {
        let mut questions = self.bank.clone();
        if self.shuffle {
            questions.shuffle(&mut rand::thread_rng());
        }
        questions.truncate(count);
        Ok(questions)
    }
}

#[cfg(test)]
#[path = "tests/question_source_tests.rs"]
mod tests;
