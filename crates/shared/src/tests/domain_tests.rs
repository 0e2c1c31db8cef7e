use super::*;

fn options(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn capital_question() -> Question {
    Question::new(
        "q-1",
        "Capital of France?",
        options(&["Lyon", "Paris", "Nice"]),
        "Paris",
        "easy",
    )
    .expect("valid question")
}

#[test]
fn question_keeps_option_order() {
    let question = capital_question();
    assert_eq!(question.id(), "q-1");
    assert_eq!(question.options(), ["Lyon", "Paris", "Nice"]);
    assert_eq!(question.correct_answer(), "Paris");
    assert_eq!(question.difficulty(), "easy");
}

#[test]
fn question_rejects_single_option() {
    let err = Question::new("q-2", "?", options(&["only"]), "only", "easy")
        .expect_err("must reject");
    assert_eq!(
        err,
        QuestionError::TooFewOptions {
            id: "q-2".to_string(),
            count: 1
        }
    );
}

#[test]
fn question_rejects_duplicate_options() {
    let err = Question::new("q-3", "?", options(&["a", "b", "a"]), "a", "hard")
        .expect_err("must reject");
    assert!(matches!(err, QuestionError::DuplicateOption { option, .. } if option == "a"));
}

#[test]
fn question_requires_correct_answer_among_options() {
    let err = Question::new("q-4", "?", options(&["a", "b"]), "c", "medium")
        .expect_err("must reject");
    assert!(matches!(
        err,
        QuestionError::CorrectAnswerMissing { ref correct_answer, .. } if correct_answer == "c"
    ));
    assert!(err.to_string().contains("q-4"));
}

#[test]
fn resolve_marks_matching_selection_correct() {
    let question = capital_question();
    let result = AnswerResult::resolve(&question, Some("Paris"));
    assert!(result.is_correct);
    assert_eq!(result.selected_answer, "Paris");
    assert_eq!(result.correct_answer, "Paris");
    assert_eq!(result.question_id, "q-1");
}

#[test]
fn resolve_marks_other_selection_incorrect() {
    let question = capital_question();
    let result = AnswerResult::resolve(&question, Some("Nice"));
    assert!(!result.is_correct);
    assert_eq!(result.selected_answer, "Nice");
}

#[test]
fn timed_out_result_has_empty_selection() {
    let question = capital_question();
    let result = AnswerResult::timed_out(&question);
    assert!(!result.is_correct);
    assert!(result.selected_answer.is_empty());
    assert_eq!(result.correct_answer, "Paris");
}

#[test]
fn session_ids_are_unique() {
    assert_ne!(SessionId::new(), SessionId::new());
}
