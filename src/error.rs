use thiserror::Error;

/// Failure modes of a play session.
///
/// `InsufficientPoints`, `HelpExhausted` and `RetryLimitExceeded` are
/// expected outcomes surfaced to the player as a message; the other
/// variants indicate the caller broke the session contract.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot start a quiz with no questions")]
    EmptySet,
    #[error("every question has already been answered")]
    SessionComplete,
    #[error("answer index {0} is out of range")]
    InvalidAnswerIndex(usize),
    #[error("not enough points ({needed} needed)")]
    InsufficientPoints { needed: i64 },
    #[error("maximum help tries per question reached")]
    HelpExhausted,
    #[error("no incorrect answer left to eliminate")]
    NoEligibleAnswer,
    #[error("maximum repeats for this quiz reached")]
    RetryLimitExceeded,
    #[error("the quiz still has unanswered questions")]
    SessionNotComplete,
}
