use super::*;

fn summary(total: usize, correct: usize) -> QuizSummary {
    QuizSummary {
        total_questions: total,
        correct_count: correct,
        answers: Vec::new(),
    }
}

#[test]
fn summary_percentage_and_band_follow_thresholds() {
    assert_eq!(summary(10, 10).percentage(), 100);
    assert_eq!(summary(10, 8).band(), ScoreBand::Excellent);
    assert_eq!(summary(10, 7).band(), ScoreBand::Fair);
    assert_eq!(summary(10, 6).band(), ScoreBand::Fair);
    assert_eq!(summary(10, 5).band(), ScoreBand::Poor);
    assert_eq!(summary(3, 2).percentage(), 66);
}

#[test]
fn empty_summary_scores_zero() {
    let empty = summary(0, 0);
    assert_eq!(empty.percentage(), 0);
    assert_eq!(empty.band(), ScoreBand::Poor);
}

#[test]
fn intents_serialize_with_type_tag() {
    let raw = serde_json::to_value(Intent::SelectAnswer("Paris".to_string())).expect("json");
    assert_eq!(raw["type"], "select_answer");
    assert_eq!(raw["payload"], "Paris");

    let parsed: Intent = serde_json::from_str(r#"{"type":"timer_expired"}"#).expect("parse");
    assert_eq!(parsed, Intent::TimerExpired);
}

#[test]
fn failed_state_serializes_message() {
    let state = SessionState::Failed {
        message: "no questions".to_string(),
    };
    let raw = serde_json::to_value(&state).expect("json");
    assert_eq!(raw["type"], "failed");
    assert_eq!(raw["payload"]["message"], "no questions");
    assert_eq!(state.label(), "failed");
    assert!(state.progress().is_none());
}
