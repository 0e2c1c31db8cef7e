use shared::{
    domain::SessionId,
    protocol::{QuizProgress, QuizSummary, ScoreBand, SessionState},
};

/// Turns the snapshot stream into terminal lines, printing only what changed
/// since the previous snapshot.
#[derive(Debug, Default)]
pub struct Renderer {
    label: Option<&'static str>,
    question: Option<(SessionId, usize)>,
    selection: Option<String>,
    locked: bool,
    running: bool,
    second: Option<u64>,
}

impl Renderer {
    pub fn render(&mut self, state: &SessionState) -> Vec<String> {
        let entered = self.label != Some(state.label());
        self.label = Some(state.label());
        if !matches!(state, SessionState::InProgress(_)) {
            self.question = None;
        }

        let mut lines = Vec::new();
        match state {
            SessionState::Initial if entered => {
                lines.push("Type `start` to begin a new quiz.".to_string());
            }
            SessionState::Loading if entered => {
                lines.push("Loading questions...".to_string());
            }
            SessionState::Failed { message } if entered => {
                lines.push(format!("Could not load questions: {message}"));
                lines.push("Type `start` to try again or `retry` to reset.".to_string());
            }
            SessionState::InProgress(progress) => self.render_progress(progress, &mut lines),
            SessionState::Completed(summary) if entered => render_summary(summary, &mut lines),
            _ => {}
        }
        lines
    }

    fn render_progress(&mut self, progress: &QuizProgress, lines: &mut Vec<String>) {
        let key = (progress.session_id, progress.current_index);
        if self.question != Some(key) {
            self.question = Some(key);
            self.selection = None;
            self.locked = false;
            self.running = true;
            self.second = None;
            if let Some(question) = progress.current_question() {
                lines.push(String::new());
                lines.push(format!(
                    "Question {}/{} [{}]",
                    progress.current_index + 1,
                    progress.questions.len(),
                    question.difficulty()
                ));
                lines.push(question.text().to_string());
                for (n, option) in question.options().iter().enumerate() {
                    lines.push(format!("  {}) {option}", n + 1));
                }
            }
        }

        if progress.question_locked {
            if !self.locked {
                self.locked = true;
                if let Some(answer) = progress.current_answer() {
                    lines.push(if answer.is_correct {
                        "Correct!".to_string()
                    } else if answer.selected_answer.is_empty() {
                        format!("Time's up! The answer was {}.", answer.correct_answer)
                    } else {
                        format!("Wrong. The answer was {}.", answer.correct_answer)
                    });
                }
                lines.push(if progress.is_last_question() {
                    "Type `next` for your score.".to_string()
                } else {
                    "Type `next` to continue.".to_string()
                });
            }
            return;
        }

        if progress.pending_selection != self.selection {
            self.selection = progress.pending_selection.clone();
            if let Some(choice) = &self.selection {
                lines.push(format!("Selected: {choice} (type `submit` to lock it in)"));
            }
        }

        if progress.timer_running != self.running {
            self.running = progress.timer_running;
            lines.push(if self.running { "Resumed." } else { "Paused." }.to_string());
        }

        let second = progress.remaining_time_ms.div_ceil(1_000);
        if self.second != Some(second) {
            self.second = Some(second);
            lines.push(format!("{second}s left"));
        }
    }
}

fn render_summary(summary: &QuizSummary, lines: &mut Vec<String>) {
    let band = match summary.band() {
        ScoreBand::Excellent => "excellent",
        ScoreBand::Fair => "fair",
        ScoreBand::Poor => "keep practicing",
    };
    lines.push(String::new());
    lines.push(format!(
        "Quiz complete: {}/{} correct ({}%, {band})",
        summary.correct_count,
        summary.total_questions,
        summary.percentage()
    ));
    for (n, answer) in summary.answers.iter().enumerate() {
        let mark = if answer.is_correct { '+' } else { '-' };
        lines.push(format!(
            "  {mark} {}. {}",
            n + 1,
            if answer.selected_answer.is_empty() {
                "(no answer)"
            } else {
                answer.selected_answer.as_str()
            }
        ));
    }
    lines.push("Type `retry` to play again.".to_string());
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
