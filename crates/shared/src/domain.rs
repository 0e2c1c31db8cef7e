use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::QuestionError;

/// Identifies one quiz attempt, from `StartQuiz` until `Retry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: String,
    text: String,
    options: Vec<String>,
    correct_answer: String,
    difficulty: String,
}

impl Question {
    /// Builds a question, rejecting option lists that cannot be answered.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
        difficulty: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let id = id.into();
        let correct_answer = correct_answer.into();

        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                id,
                count: options.len(),
            });
        }

        let mut seen = HashSet::with_capacity(options.len());
        for option in &options {
            if !seen.insert(option.as_str()) {
                return Err(QuestionError::DuplicateOption {
                    id,
                    option: option.clone(),
                });
            }
        }

        if !seen.contains(correct_answer.as_str()) {
            return Err(QuestionError::CorrectAnswerMissing { id, correct_answer });
        }

        Ok(Self {
            id,
            text: text.into(),
            options,
            correct_answer,
            difficulty: difficulty.into(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    pub fn difficulty(&self) -> &str {
        &self.difficulty
    }

    pub fn is_correct(&self, choice: &str) -> bool {
        self.correct_answer == choice
    }
}

/// Final outcome of one question. Built once, when the question resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub question_id: String,
    pub selected_answer: String,
    pub is_correct: bool,
    pub correct_answer: String,
}

impl AnswerResult {
    /// A missing selection is recorded as an empty answer and is never correct.
    pub fn resolve(question: &Question, selection: Option<&str>) -> Self {
        let selected_answer = selection.unwrap_or_default().to_string();
        let is_correct = selection.is_some_and(|choice| question.is_correct(choice));
        Self {
            question_id: question.id.clone(),
            selected_answer,
            is_correct,
            correct_answer: question.correct_answer.clone(),
        }
    }

    pub fn timed_out(question: &Question) -> Self {
        Self::resolve(question, None)
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
