use std::{
    collections::BTreeMap,
    panic::AssertUnwindSafe,
    sync::{Arc, Weak},
    time::Duration,
};

use anyhow::anyhow;
use async_trait::async_trait;
use futures::{FutureExt, Stream};
use shared::{
    domain::{AnswerResult, Question, SessionId},
    protocol::{Intent, QuizProgress, QuizSummary, SessionState},
};
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    task::JoinHandle,
};
use tokio_stream::{wrappers::BroadcastStream, StreamExt as _};
use tracing::{debug, error, info, warn};

pub mod error;
pub mod question_source;
pub mod schedule;
pub mod settings;
pub mod timer;

pub use error::{SettingsError, TriviaSourceError};
pub use question_source::{QuestionSource, StaticQuestionSource, TriviaApiSource};
pub use settings::QuizSettings;

use schedule::DelayedTask;
use timer::{CountdownTimer, TimerEvent};

pub const NO_QUESTIONS_MESSAGE: &str = "no questions available";
const STATE_CHANNEL_CAPACITY: usize = 256;

/// Host-facing handle over a quiz session.
#[async_trait]
pub trait QuizSession: Send + Sync {
    async fn dispatch(&self, intent: Intent) -> SessionState;
    async fn snapshot(&self) -> SessionState;
    fn subscribe(&self) -> broadcast::Receiver<SessionState>;
    async fn shutdown(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AdvanceTicket {
    epoch: u64,
    index: usize,
}

struct ControllerState {
    session: SessionState,
    /// Bumped whenever a new attempt starts or the current one is discarded.
    epoch: u64,
    timer: CountdownTimer,
    pending_advance: Option<DelayedTask>,
    timer_pump: Option<JoinHandle<()>>,
    closed: bool,
}

impl ControllerState {
    fn cancel_pending_advance(&mut self) {
        if let Some(task) = self.pending_advance.take() {
            task.cancel();
        }
    }
}

impl Drop for ControllerState {
    fn drop(&mut self) {
        self.timer.stop();
        self.cancel_pending_advance();
        if let Some(pump) = self.timer_pump.take() {
            pump.abort();
        }
    }
}

/// Single writer of the quiz session state.
///
/// Intents from the host, timer events and the delayed auto-advance all go
/// through one lock, so each transition sees and leaves a consistent state.
/// Every applied transition publishes a cloned snapshot; intents that are not
/// valid for the current state are dropped without publishing anything.
pub struct QuizController {
    source: Arc<dyn QuestionSource>,
    settings: QuizSettings,
    inner: Mutex<ControllerState>,
    states: broadcast::Sender<SessionState>,
}

impl QuizController {
    /// Must be called from within a tokio runtime.
    pub fn new(source: Arc<dyn QuestionSource>, settings: QuizSettings) -> Arc<Self> {
        let (states, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);
        let (timer, timer_events) = CountdownTimer::channel(settings.tick_interval);
        Arc::new_cyclic(|controller: &Weak<Self>| {
            let timer_pump = spawn_timer_pump(controller.clone(), timer_events);
            Self {
                source,
                settings,
                inner: Mutex::new(ControllerState {
                    session: SessionState::Initial,
                    epoch: 0,
                    timer,
                    pending_advance: None,
                    timer_pump: Some(timer_pump),
                    closed: false,
                }),
                states,
            }
        })
    }

    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    pub async fn snapshot(&self) -> SessionState {
        self.inner.lock().await.session.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionState> {
        self.states.subscribe()
    }

    /// Snapshots as a stream. Items dropped by a slow reader are skipped.
    pub fn state_stream(&self) -> impl Stream<Item = SessionState> + Send + Unpin + 'static {
        BroadcastStream::new(self.states.subscribe()).filter_map(|item| item.ok())
    }

    /// Applies one intent and returns the state after it.
    pub async fn dispatch(self: &Arc<Self>, intent: Intent) -> SessionState {
        if intent == Intent::StartQuiz {
            return self.start_quiz().await;
        }

        let mut guard = self.inner.lock().await;
        if guard.closed {
            return guard.session.clone();
        }
        let intent_name = intent.name();
        let applied = self.apply(&mut guard, intent);
        if applied {
            debug!(intent = intent_name, state = guard.session.label(), "quiz: transition");
            self.publish(&guard.session);
        } else {
            debug!(intent = intent_name, state = guard.session.label(), "quiz: intent ignored");
        }
        guard.session.clone()
    }

    /// Stops the timer, drops any scheduled advance and ignores all later
    /// intents.
    pub async fn shutdown(&self) {
        let mut guard = self.inner.lock().await;
        if guard.closed {
            return;
        }
        guard.closed = true;
        guard.epoch += 1;
        guard.timer.stop();
        guard.cancel_pending_advance();
        if let Some(pump) = guard.timer_pump.take() {
            pump.abort();
        }
        info!(state = guard.session.label(), "quiz: controller shut down");
    }

    async fn start_quiz(self: &Arc<Self>) -> SessionState {
        let epoch = {
            let mut guard = self.inner.lock().await;
            if guard.closed
                || !matches!(
                    guard.session,
                    SessionState::Initial | SessionState::Failed { .. }
                )
            {
                debug!(state = guard.session.label(), "quiz: start ignored");
                return guard.session.clone();
            }
            guard.epoch += 1;
            guard.timer.stop();
            guard.cancel_pending_advance();
            guard.session = SessionState::Loading;
            self.publish(&guard.session);
            guard.epoch
        };

        // The fetch and its outcome run detached so that dropping this future
        // cannot strand the session in `Loading`.
        let controller = Arc::clone(self);
        let count = self.settings.question_count;
        let loading = tokio::spawn(async move {
            let fetched = AssertUnwindSafe(controller.source.fetch_questions(count))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(anyhow!("question source panicked")));
            controller.finish_loading(epoch, fetched).await
        });

        match loading.await {
            Ok(state) => state,
            Err(err) => {
                error!("quiz: loading task failed: {err}");
                self.snapshot().await
            }
        }
    }

    async fn finish_loading(
        &self,
        epoch: u64,
        fetched: anyhow::Result<Vec<Question>>,
    ) -> SessionState {
        let mut guard = self.inner.lock().await;
        if guard.closed || guard.epoch != epoch || !matches!(guard.session, SessionState::Loading)
        {
            debug!(epoch, "quiz: discarding stale question fetch");
            return guard.session.clone();
        }

        guard.session = match fetched {
            Ok(questions) if questions.is_empty() => {
                warn!("quiz: question source returned no questions");
                SessionState::Failed {
                    message: NO_QUESTIONS_MESSAGE.to_string(),
                }
            }
            Ok(questions) => {
                let session_id = SessionId::new();
                info!(
                    session_id = %session_id,
                    questions = questions.len(),
                    "quiz: session started"
                );
                guard.timer.start(self.settings.question_duration);
                SessionState::InProgress(QuizProgress {
                    session_id,
                    questions,
                    current_index: 0,
                    remaining_time_ms: self.settings.question_duration_ms(),
                    answers: BTreeMap::new(),
                    pending_selection: None,
                    timer_running: true,
                    question_locked: false,
                })
            }
            Err(err) => {
                let message = format!("{err:#}");
                warn!("quiz: failed to load questions: {message}");
                SessionState::Failed { message }
            }
        };
        self.publish(&guard.session);
        guard.session.clone()
    }

    fn apply(self: &Arc<Self>, state: &mut ControllerState, intent: Intent) -> bool {
        match intent {
            Intent::StartQuiz => false,
            Intent::SelectAnswer(choice) => match &mut state.session {
                SessionState::InProgress(progress) if !progress.question_locked => {
                    progress.pending_selection = Some(choice);
                    true
                }
                _ => false,
            },
            Intent::SubmitAnswer => {
                let open = matches!(
                    &state.session,
                    SessionState::InProgress(progress)
                        if !progress.question_locked && progress.pending_selection.is_some()
                );
                open && self.resolve_current(state)
            }
            Intent::TimerExpired => {
                let open = matches!(
                    &state.session,
                    SessionState::InProgress(progress) if !progress.question_locked
                );
                open && self.resolve_current(state)
            }
            Intent::MoveToNextQuestion => {
                let locked = matches!(
                    &state.session,
                    SessionState::InProgress(progress) if progress.question_locked
                );
                if locked {
                    Self::advance(state, self.settings.question_duration);
                }
                locked
            }
            Intent::PauseTimer => match &mut state.session {
                SessionState::InProgress(progress)
                    if progress.timer_running && !progress.question_locked =>
                {
                    let Some(left) = state.timer.pause() else {
                        return false;
                    };
                    progress.remaining_time_ms = duration_ms(left);
                    progress.timer_running = false;
                    true
                }
                _ => false,
            },
            Intent::ResumeTimer => match &mut state.session {
                SessionState::InProgress(progress)
                    if !progress.timer_running
                        && !progress.question_locked
                        && progress.remaining_time_ms > 0 =>
                {
                    if state.timer.resume().is_none() {
                        return false;
                    }
                    progress.timer_running = true;
                    true
                }
                _ => false,
            },
            Intent::Retry => {
                let finished = matches!(
                    state.session,
                    SessionState::Failed { .. } | SessionState::Completed(_)
                );
                if finished {
                    state.epoch += 1;
                    state.timer.stop();
                    state.cancel_pending_advance();
                    state.session = SessionState::Initial;
                }
                finished
            }
        }
    }

    /// Commits the answer for the current question and schedules the move on.
    fn resolve_current(self: &Arc<Self>, state: &mut ControllerState) -> bool {
        state.timer.stop();
        let SessionState::InProgress(progress) = &mut state.session else {
            return false;
        };
        let index = progress.current_index;
        let Some(question) = progress.questions.get(index) else {
            error!(index, "quiz: current index out of range");
            return false;
        };

        let result = AnswerResult::resolve(question, progress.pending_selection.as_deref());
        info!(
            session_id = %progress.session_id,
            question_index = index,
            correct = result.is_correct,
            answered = !result.selected_answer.is_empty(),
            "quiz: question resolved"
        );
        progress.answers.insert(index, result);
        progress.question_locked = true;
        progress.timer_running = false;

        let ticket = AdvanceTicket {
            epoch: state.epoch,
            index,
        };
        let controller = Arc::downgrade(self);
        state.pending_advance = Some(DelayedTask::spawn(
            self.settings.feedback_delay,
            async move {
                if let Some(controller) = controller.upgrade() {
                    controller.run_scheduled_advance(ticket).await;
                }
            },
        ));
        true
    }

    async fn run_scheduled_advance(&self, ticket: AdvanceTicket) {
        let mut guard = self.inner.lock().await;
        if guard.closed || guard.epoch != ticket.epoch {
            return;
        }
        let due = matches!(
            &guard.session,
            SessionState::InProgress(progress)
                if progress.question_locked && progress.current_index == ticket.index
        );
        if !due {
            return;
        }
        Self::advance(&mut guard, self.settings.question_duration);
        debug!(state = guard.session.label(), "quiz: auto-advanced");
        self.publish(&guard.session);
    }

    fn advance(state: &mut ControllerState, question_duration: Duration) {
        state.cancel_pending_advance();
        let SessionState::InProgress(progress) = &mut state.session else {
            return;
        };

        let next = progress.current_index + 1;
        if next < progress.questions.len() {
            progress.current_index = next;
            progress.pending_selection = None;
            progress.question_locked = false;
            progress.timer_running = true;
            progress.remaining_time_ms = duration_ms(question_duration);
            state.timer.start(question_duration);
            return;
        }

        state.timer.stop();
        let answers: Vec<AnswerResult> = std::mem::take(&mut progress.answers)
            .into_values()
            .collect();
        let summary = QuizSummary {
            total_questions: progress.questions.len(),
            correct_count: answers.iter().filter(|answer| answer.is_correct).count(),
            answers,
        };
        info!(
            session_id = %progress.session_id,
            total = summary.total_questions,
            correct = summary.correct_count,
            "quiz: session completed"
        );
        state.session = SessionState::Completed(summary);
    }

    async fn on_timer_event(self: &Arc<Self>, event: TimerEvent) {
        let mut guard = self.inner.lock().await;
        if guard.closed {
            return;
        }

        match event {
            TimerEvent::Tick { run, remaining } => {
                if !guard.timer.accepts(run) {
                    return;
                }
                let SessionState::InProgress(progress) = &mut guard.session else {
                    return;
                };
                if progress.question_locked || !progress.timer_running {
                    return;
                }
                progress.remaining_time_ms = duration_ms(remaining);
                self.publish(&guard.session);
            }
            TimerEvent::Expired { run } => {
                if !guard.timer.accepts(run) {
                    debug!(run = run.0, "quiz: dropping expiry from a finished timer run");
                    return;
                }
                match &mut guard.session {
                    SessionState::InProgress(progress) if !progress.question_locked => {
                        progress.remaining_time_ms = 0;
                    }
                    other => {
                        error!(
                            run = run.0,
                            state = other.label(),
                            "quiz: live timer expired outside an open question"
                        );
                        guard.timer.stop();
                        return;
                    }
                }
                if self.apply(&mut guard, Intent::TimerExpired) {
                    self.publish(&guard.session);
                }
            }
        }
    }

    fn publish(&self, session: &SessionState) {
        // No receivers is fine.
        let _ = self.states.send(session.clone());
    }
}

fn spawn_timer_pump(
    controller: Weak<QuizController>,
    mut events: mpsc::UnboundedReceiver<TimerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(controller) = controller.upgrade() else {
                break;
            };
            controller.on_timer_event(event).await;
        }
    })
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl QuizSession for Arc<QuizController> {
    async fn dispatch(&self, intent: Intent) -> SessionState {
        QuizController::dispatch(self, intent).await
    }

    async fn snapshot(&self) -> SessionState {
        QuizController::snapshot(self).await
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionState> {
        QuizController::subscribe(self)
    }

    async fn shutdown(&self) {
        QuizController::shutdown(self).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
