use std::{sync::Arc, time::Duration};

use quiz_core::{QuizController, QuizSettings, StaticQuestionSource};
use shared::protocol::{Intent, ScoreBand, SessionState};

async fn wait(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn offline_bank_session_runs_to_completion_with_mixed_outcomes() {
    let source = StaticQuestionSource::sample_bank().expect("bank");
    let settings = QuizSettings::default().with_question_count(4);
    let controller = QuizController::new(Arc::new(source), settings);

    let mut state = controller.dispatch(Intent::StartQuiz).await;
    assert_eq!(state.progress().expect("started").questions.len(), 4);

    // q1 correct via submit, auto-advanced
    let correct = state
        .progress()
        .and_then(|p| p.current_question())
        .map(|q| q.correct_answer().to_string())
        .expect("question");
    controller.dispatch(Intent::SelectAnswer(correct)).await;
    controller.dispatch(Intent::SubmitAnswer).await;
    wait(1_600).await;

    // q2 wrong via submit, advanced manually
    state = controller.snapshot().await;
    let wrong = state
        .progress()
        .and_then(|p| p.current_question())
        .and_then(|q| q.options().iter().find(|o| !q.is_correct(o)).cloned())
        .expect("wrong option");
    controller.dispatch(Intent::SelectAnswer(wrong)).await;
    controller.dispatch(Intent::SubmitAnswer).await;
    controller.dispatch(Intent::MoveToNextQuestion).await;

    // q3 left to expire after a pause
    wait(4_000).await;
    controller.dispatch(Intent::PauseTimer).await;
    wait(30_000).await;
    controller.dispatch(Intent::ResumeTimer).await;
    wait(6_100).await;
    state = controller.snapshot().await;
    let p = state.progress().expect("in progress");
    assert_eq!(p.current_index, 2);
    assert!(p.question_locked);
    assert!(p.current_answer().expect("expired").selected_answer.is_empty());
    wait(1_500).await;

    // q4 correct via expiry with a pending selection
    state = controller.snapshot().await;
    let correct = state
        .progress()
        .and_then(|p| p.current_question())
        .map(|q| q.correct_answer().to_string())
        .expect("question");
    controller.dispatch(Intent::SelectAnswer(correct)).await;
    wait(10_000 + 1_500 + 100).await;

    let summary = match controller.snapshot().await {
        SessionState::Completed(summary) => summary,
        other => panic!("expected completion, got {other:?}"),
    };
    assert_eq!(summary.total_questions, 4);
    assert_eq!(summary.correct_count, 2);
    assert_eq!(summary.percentage(), 50);
    assert_eq!(summary.band(), ScoreBand::Poor);
    let ids: Vec<_> = summary
        .answers
        .iter()
        .map(|answer| answer.question_id.as_str())
        .collect();
    assert_eq!(ids, ["offline-1", "offline-2", "offline-3", "offline-4"]);

    assert_eq!(
        controller.dispatch(Intent::Retry).await,
        SessionState::Initial
    );
    controller.shutdown().await;
}
