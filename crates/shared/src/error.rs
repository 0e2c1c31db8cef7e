use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestionError {
    #[error("question {id} has {count} option(s), at least 2 are required")]
    TooFewOptions { id: String, count: usize },
    #[error("question {id} lists option {option:?} more than once")]
    DuplicateOption { id: String, option: String },
    #[error("question {id} correct answer {correct_answer:?} is not among its options")]
    CorrectAnswerMissing { id: String, correct_answer: String },
}
