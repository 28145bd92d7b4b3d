//! Engine for a multiple-choice trivia app: topic catalogs, the play-session
//! state machine, persistent score bookkeeping and image prefetching.
//! Rendering, input and audio belong to the embedding app.

pub mod content;
pub mod error;
pub mod preload;
pub mod scoreboard;
pub mod session;

pub use content::{Question, QuizSet, TopicCatalog};
pub use error::SessionError;
pub use scoreboard::{Scoreboard, ScoreboardHandle};
pub use session::{
    AnswerOutcome, HelpOutcome, Prompt, QuizSession, RepeatOutcome, SessionKind, SessionResult,
    Step,
};
