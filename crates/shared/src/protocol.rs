use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{AnswerResult, Question, SessionId};

/// Events the session controller may act on. Anything arriving in a state
/// that does not accept it is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Intent {
    StartQuiz,
    SelectAnswer(String),
    SubmitAnswer,
    TimerExpired,
    MoveToNextQuestion,
    PauseTimer,
    ResumeTimer,
    Retry,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::StartQuiz => "start_quiz",
            Intent::SelectAnswer(_) => "select_answer",
            Intent::SubmitAnswer => "submit_answer",
            Intent::TimerExpired => "timer_expired",
            Intent::MoveToNextQuestion => "move_to_next_question",
            Intent::PauseTimer => "pause_timer",
            Intent::ResumeTimer => "resume_timer",
            Intent::Retry => "retry",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizProgress {
    pub session_id: SessionId,
    pub questions: Vec<Question>,
    pub current_index: usize,
    pub remaining_time_ms: u64,
    /// Keyed by question index; holds entries below `current_index`, plus
    /// `current_index` once that question is locked.
    pub answers: BTreeMap<usize, AnswerResult>,
    pub pending_selection: Option<String>,
    pub timer_running: bool,
    pub question_locked: bool,
}

impl QuizProgress {
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn current_answer(&self) -> Option<&AnswerResult> {
        self.answers.get(&self.current_index)
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Fair,
    Poor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSummary {
    pub total_questions: usize,
    pub correct_count: usize,
    pub answers: Vec<AnswerResult>,
}

impl QuizSummary {
    pub fn percentage(&self) -> usize {
        if self.total_questions == 0 {
            return 0;
        }
        self.correct_count * 100 / self.total_questions
    }

    pub fn band(&self) -> ScoreBand {
        match self.percentage() {
            80.. => ScoreBand::Excellent,
            60.. => ScoreBand::Fair,
            _ => ScoreBand::Poor,
        }
    }
}

/// Read-only copy of the controller state handed to renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SessionState {
    Initial,
    Loading,
    Failed { message: String },
    InProgress(QuizProgress),
    Completed(QuizSummary),
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Initial => "initial",
            SessionState::Loading => "loading",
            SessionState::Failed { .. } => "failed",
            SessionState::InProgress(_) => "in_progress",
            SessionState::Completed(_) => "completed",
        }
    }

    pub fn progress(&self) -> Option<&QuizProgress> {
        match self {
            SessionState::InProgress(progress) => Some(progress),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<&QuizSummary> {
        match self {
            SessionState::Completed(summary) => Some(summary),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
