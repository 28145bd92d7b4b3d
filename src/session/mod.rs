use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::content::{Question, QuizSet};
use crate::error::SessionError;
use crate::scoreboard::ScoreboardHandle;


pub const CORRECT_POINTS: i64 = 20;
pub const INCORRECT_PENALTY: i64 = 10;
pub const HELP_COST: i64 = 5;
pub const HELPS_PER_QUESTION: u8 = 2;
pub const RETRY_LIMIT: u8 = 2;

/// Where a session's questions came from. Decides completion bookkeeping
/// and which menu the app returns to afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionKind {
    Topic { topic: String, set_index: usize },
    AdHoc,
}

impl SessionKind {
    pub fn is_ad_hoc(&self) -> bool {
        matches!(self, SessionKind::AdHoc)
    }
}

/// A question ready for display, with its 1-based position in the run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Prompt {
    pub question: Question,
    pub position: usize,
    pub total: usize,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Step {
    Next(Prompt),
    Done,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub correct_indices: Vec<usize>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HelpOutcome {
    pub eliminated_index: usize,
    pub cost: i64,
    pub helps_left: u8,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RepeatOutcome {
    pub attempt: u8,
    pub retries_left: u8,
    pub restored_score: i64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionResult {
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub net_score_delta: i64,
    pub help_cost: i64,
    pub already_completed: bool,
    pub offer_repeat: bool,
}

/// One play-through of a shuffled question set.
///
/// The session owns progression, scoring and the help/repeat bookkeeping;
/// everything visual happens upstream. Answering and advancing are separate
/// steps because the screen shows feedback in between; callers pair one
/// `answer` with one `advance`.
pub struct QuizSession {
    questions: Vec<Question>,
    kind: SessionKind,
    scores: ScoreboardHandle,
    cursor: usize,
    correct_count: u32,
    incorrect_count: u32,
    helps_used: u8,
    eliminated: HashSet<usize>,
    retry_count: u8,
    score_baseline: i64,
}

impl QuizSession {
    pub fn start(
        set: QuizSet,
        kind: SessionKind,
        scores: ScoreboardHandle,
        rng: &mut impl Rng,
    ) -> Result<QuizSession, SessionError> {
        if set.is_empty() {
            return Err(SessionError::EmptySet);
        }
        let mut questions = set.into_questions();
        questions.shuffle(rng);
        let score_baseline = scores.read().score();
        log::debug!("starting quiz session with {} questions", questions.len());
        Ok(QuizSession {
            questions,
            kind,
            scores,
            cursor: 0,
            correct_count: 0,
            incorrect_count: 0,
            helps_used: 0,
            eliminated: HashSet::new(),
            retry_count: 0,
            score_baseline,
        })
    }

    pub fn kind(&self) -> &SessionKind {
        &self.kind
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    pub fn incorrect_count(&self) -> u32 {
        self.incorrect_count
    }

    pub fn retry_count(&self) -> u8 {
        self.retry_count
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == self.questions.len()
    }

    pub fn current_question(&self) -> Result<&Question, SessionError> {
        self.questions
            .get(self.cursor)
            .ok_or(SessionError::SessionComplete)
    }

    pub fn current(&self) -> Result<Prompt, SessionError> {
        Ok(Prompt {
            question: self.current_question()?.clone(),
            position: self.cursor + 1,
            total: self.questions.len(),
        })
    }

    /// Scores an answer to the current question. The cursor stays put; the
    /// screen shows feedback first and calls [`advance`](Self::advance) when
    /// it is done.
    pub fn answer(&mut self, index: usize) -> Result<AnswerOutcome, SessionError> {
        let question = self
            .questions
            .get(self.cursor)
            .ok_or(SessionError::SessionComplete)?;
        if index >= question.answers.len() {
            return Err(SessionError::InvalidAnswerIndex(index));
        }
        let is_correct = question.is_correct(index);
        let correct_indices = question.correct.iter().copied().sorted().collect();
        if is_correct {
            self.correct_count += 1;
        } else {
            self.incorrect_count += 1;
        }
        Ok(AnswerOutcome {
            is_correct,
            correct_indices,
        })
    }

    /// Moves to the next question and resets the per-question help state.
    pub fn advance(&mut self) -> Step {
        if self.cursor < self.questions.len() {
            self.cursor += 1;
        }
        self.helps_used = 0;
        self.eliminated.clear();
        match self.current() {
            Ok(prompt) => Step::Next(prompt),
            Err(_) => Step::Done,
        }
    }

    /// Spends [`HELP_COST`] points to eliminate one incorrect answer of the
    /// current question, chosen uniformly among those not yet eliminated.
    pub fn request_help(&mut self, rng: &mut impl Rng) -> Result<HelpOutcome, SessionError> {
        if self.scores.read().score() < HELP_COST {
            return Err(SessionError::InsufficientPoints { needed: HELP_COST });
        }
        if self.helps_used >= HELPS_PER_QUESTION {
            return Err(SessionError::HelpExhausted);
        }
        let question = self
            .questions
            .get(self.cursor)
            .ok_or(SessionError::SessionComplete)?;
        let candidates: Vec<usize> = (0..question.answers.len())
            .filter(|index| !question.correct.contains(index) && !self.eliminated.contains(index))
            .collect();
        let eliminated_index = *candidates
            .choose(rng)
            .ok_or(SessionError::NoEligibleAnswer)?;

        self.scores.write().update_score(-HELP_COST);
        self.helps_used += 1;
        self.eliminated.insert(eliminated_index);
        Ok(HelpOutcome {
            eliminated_index,
            cost: HELP_COST,
            helps_left: HELPS_PER_QUESTION - self.helps_used,
        })
    }

    /// Whether the screen may offer the repeat prompt: only mid-quiz, and
    /// only while retries remain.
    pub fn can_offer_repeat(&self) -> bool {
        self.retry_count < RETRY_LIMIT && self.cursor >= 1
    }

    /// Restarts the run: fresh shuffle, zeroed counters, score rolled back
    /// to the value captured at session start. Points earned, lost or spent
    /// on help during the abandoned attempt are all undone.
    pub fn request_repeat(&mut self, rng: &mut impl Rng) -> Result<RepeatOutcome, SessionError> {
        if self.retry_count >= RETRY_LIMIT {
            return Err(SessionError::RetryLimitExceeded);
        }
        self.retry_count += 1;
        self.correct_count = 0;
        self.incorrect_count = 0;
        self.helps_used = 0;
        self.eliminated.clear();
        self.cursor = 0;
        self.questions.shuffle(rng);
        self.scores.write().restore_score(self.score_baseline);
        log::debug!(
            "repeating quiz, attempt {} of {}",
            self.retry_count,
            RETRY_LIMIT
        );
        Ok(RepeatOutcome {
            attempt: self.retry_count,
            retries_left: RETRY_LIMIT - self.retry_count,
            restored_score: self.score_baseline,
        })
    }

    /// Tallies the finished session. Pure computation: nothing is written
    /// to the scoreboard until [`commit`](Self::commit). `help_cost` is what
    /// the player spent on eliminations this attempt; it was deducted live
    /// and is reported for the score summary only.
    pub fn finalize(&self) -> Result<SessionResult, SessionError> {
        if !self.is_complete() {
            return Err(SessionError::SessionNotComplete);
        }
        let net_score_delta = self.correct_count as i64 * CORRECT_POINTS
            - self.incorrect_count as i64 * INCORRECT_PENALTY;
        let help_cost = self.score_baseline - self.scores.read().score();
        let already_completed = self.is_already_completed();
        let offer_repeat = (self.correct_count as usize) < self.questions.len()
            && self.retry_count < RETRY_LIMIT
            && !already_completed;
        Ok(SessionResult {
            correct_count: self.correct_count,
            incorrect_count: self.incorrect_count,
            net_score_delta,
            help_cost,
            already_completed,
            offer_repeat,
        })
    }

    /// Folds the finished session into the scoreboard. Lifetime totals and
    /// score move only the first time a set is completed; the completion
    /// flag is (re)marked every time. Ad-hoc sets have no completion key
    /// and always count.
    pub fn commit(&self) -> Result<SessionResult, SessionError> {
        let result = self.finalize()?;
        let mut scores = self.scores.write();
        if !result.already_completed {
            scores.record_answers(self.correct_count as u64, self.incorrect_count as u64);
            scores.update_score(result.net_score_delta);
        }
        if let SessionKind::Topic { topic, set_index } = &self.kind {
            scores.mark_set_completed(topic, *set_index);
        }
        log::debug!(
            "committed quiz session: {} correct, {} incorrect, delta {}",
            result.correct_count,
            result.incorrect_count,
            result.net_score_delta
        );
        Ok(result)
    }

    fn is_already_completed(&self) -> bool {
        match &self.kind {
            SessionKind::Topic { topic, set_index } => {
                self.scores.read().is_set_completed(topic, *set_index)
            }
            SessionKind::AdHoc => false,
        }
    }
}
