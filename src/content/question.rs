use anyhow::*;
use serde::Deserialize;
use std::collections::HashSet;
use std::convert::TryFrom;

/// One row of quiz content as it appears in the source file. Multi-value
/// fields are pipe-separated.
#[derive(Clone, Debug, Deserialize)]
pub struct RawQuestion {
    pub topic: String,
    pub set: usize,
    pub text: String,
    pub image_url: Option<String>,
    pub answers: String,
    pub correct: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    pub image_url: Option<String>,
    pub answers: Vec<String>,
    pub correct: HashSet<usize>,
}

impl Question {
    pub fn is_correct(&self, answer_index: usize) -> bool {
        self.correct.contains(&answer_index)
    }
}

impl TryFrom<RawQuestion> for Question {
    type Error = anyhow::Error;

    fn try_from(raw: RawQuestion) -> Result<Self> {
        let answers: Vec<String> = raw
            .answers
            .split('|')
            .map(|answer| answer.trim().to_owned())
            .filter(|answer| !answer.is_empty())
            .collect();
        ensure!(
            answers.len() >= 2,
            "question {:?} needs at least two answers",
            raw.text
        );

        let mut correct = HashSet::new();
        for token in raw.correct.split('|') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let index: usize = token
                .parse()
                .with_context(|| format!("bad correct-answer index in question {:?}", raw.text))?;
            ensure!(
                index < answers.len(),
                "correct-answer index {} is out of range in question {:?}",
                index,
                raw.text
            );
            correct.insert(index);
        }
        ensure!(
            !correct.is_empty(),
            "question {:?} has no correct answer",
            raw.text
        );

        let image_url = raw.image_url.filter(|url| !url.is_empty());

        Ok(Question {
            text: raw.text,
            image_url,
            answers,
            correct,
        })
    }
}
