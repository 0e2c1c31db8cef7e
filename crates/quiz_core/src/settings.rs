use std::time::Duration;

use crate::error::SettingsError;

pub const DEFAULT_QUESTION_DURATION: Duration = Duration::from_millis(10_000);
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_FEEDBACK_DELAY: Duration = Duration::from_millis(1_500);
pub const DEFAULT_QUESTION_COUNT: usize = 10;

/// Timing and sizing knobs for one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSettings {
    pub question_duration: Duration,
    pub tick_interval: Duration,
    /// Pause between resolving a question and auto-advancing.
    pub feedback_delay: Duration,
    pub question_count: usize,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            question_duration: DEFAULT_QUESTION_DURATION,
            tick_interval: DEFAULT_TICK_INTERVAL,
            feedback_delay: DEFAULT_FEEDBACK_DELAY,
            question_count: DEFAULT_QUESTION_COUNT,
        }
    }
}

impl QuizSettings {
    pub fn with_question_duration(mut self, duration: Duration) -> Self {
        self.question_duration = duration;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_feedback_delay(mut self, delay: Duration) -> Self {
        self.feedback_delay = delay;
        self
    }

    pub fn with_question_count(mut self, count: usize) -> Self {
        self.question_count = count;
        self
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.question_duration.is_zero() {
            return Err(SettingsError::ZeroDuration {
                name: "question_duration",
            });
        }
        if self.tick_interval.is_zero() {
            return Err(SettingsError::ZeroDuration {
                name: "tick_interval",
            });
        }
        if self.question_count == 0 {
            return Err(SettingsError::ZeroQuestionCount);
        }
        if self.tick_interval > self.question_duration {
            return Err(SettingsError::TickLongerThanQuestion {
                tick: self.tick_interval,
                question: self.question_duration,
            });
        }
        Ok(())
    }

    pub(crate) fn question_duration_ms(&self) -> u64 {
        crate::duration_ms(self.question_duration)
    }
}
