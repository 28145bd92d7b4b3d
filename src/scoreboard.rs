use anyhow::*;
use directories_next::BaseDirs;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type ScoreboardHandle = Arc<RwLock<Scoreboard>>;

const SCOREBOARD_FILE: &str = "scoreboard.yaml";

/// Lifetime play statistics shared by every screen of the app: the running
/// score, answer totals and which sets have been completed.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Scoreboard {
    score: i64,
    correct_answers: u64,
    incorrect_answers: u64,
    completed_sets: HashMap<String, HashMap<usize, bool>>,
}

impl Scoreboard {
    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn correct_answers(&self) -> u64 {
        self.correct_answers
    }

    pub fn incorrect_answers(&self) -> u64 {
        self.incorrect_answers
    }

    /// Applies a score delta. The lifetime score never drops below zero, no
    /// matter how badly a session went.
    pub fn update_score(&mut self, delta: i64) {
        self.score = (self.score + delta).max(0);
    }

    pub fn restore_score(&mut self, value: i64) {
        self.score = value.max(0);
    }

    pub fn record_answers(&mut self, correct: u64, incorrect: u64) {
        self.correct_answers += correct;
        self.incorrect_answers += incorrect;
    }

    pub fn is_set_completed(&self, topic: &str, set_index: usize) -> bool {
        self.completed_sets
            .get(topic)
            .and_then(|sets| sets.get(&set_index))
            .copied()
            .unwrap_or(false)
    }

    pub fn mark_set_completed(&mut self, topic: &str, set_index: usize) {
        self.completed_sets
            .entry(topic.to_owned())
            .or_default()
            .insert(set_index, true);
    }

    pub fn into_handle(self) -> ScoreboardHandle {
        Arc::new(RwLock::new(self))
    }

    /// Reads the scoreboard from the platform data directory. A missing
    /// file is a fresh install, not an error.
    pub fn load() -> Result<Scoreboard> {
        Self::load_from(&default_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Scoreboard> {
        if !path.exists() {
            return Ok(Scoreboard::default());
        }
        let file =
            File::open(path).with_context(|| format!("could not open {}", path.display()))?;
        serde_yaml::from_reader(file)
            .with_context(|| format!("could not parse scoreboard in {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("could not create {}", parent.display()))?;
        }
        let file =
            File::create(path).with_context(|| format!("could not write {}", path.display()))?;
        serde_yaml::to_writer(file, self)?;
        Ok(())
    }
}

fn default_path() -> Result<PathBuf> {
    let mut path = BaseDirs::new()
        .context("could not locate system directories")?
        .data_dir()
        .to_path_buf();
    path.push("pop-quiz");
    path.push(SCOREBOARD_FILE);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_never_goes_negative() {
        let mut scoreboard = Scoreboard::default();
        scoreboard.update_score(30);
        scoreboard.update_score(-100);
        assert_eq!(scoreboard.score(), 0);
        scoreboard.update_score(15);
        assert_eq!(scoreboard.score(), 15);
    }

    #[test]
    fn completion_flags_are_per_topic_and_set() {
        let mut scoreboard = Scoreboard::default();
        assert!(!scoreboard.is_set_completed("capitals", 0));
        scoreboard.mark_set_completed("capitals", 0);
        assert!(scoreboard.is_set_completed("capitals", 0));
        assert!(!scoreboard.is_set_completed("capitals", 1));
        assert!(!scoreboard.is_set_completed("flags", 0));
    }

    #[test]
    fn answer_totals_accumulate() {
        let mut scoreboard = Scoreboard::default();
        scoreboard.record_answers(3, 1);
        scoreboard.record_answers(2, 2);
        assert_eq!(scoreboard.correct_answers(), 5);
        assert_eq!(scoreboard.incorrect_answers(), 3);
    }

    #[test]
    fn serializes_round_trip() {
        let mut scoreboard = Scoreboard::default();
        scoreboard.update_score(85);
        scoreboard.record_answers(7, 2);
        scoreboard.mark_set_completed("capitals", 1);

        let yaml = serde_yaml::to_string(&scoreboard).unwrap();
        let restored: Scoreboard = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(restored, scoreboard);
    }

    #[test]
    fn missing_file_loads_as_fresh_scoreboard() {
        let path = std::env::temp_dir().join("pop-quiz-test-no-such-scoreboard.yaml");
        let scoreboard = Scoreboard::load_from(&path).unwrap();
        assert_eq!(scoreboard, Scoreboard::default());
    }
}
