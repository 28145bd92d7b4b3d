use anyhow::*;
use itertools::Itertools;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub mod question;

pub use question::{Question, RawQuestion};

/// An ordered run of questions played as one session. Every question in a
/// set offers the same number of answers so the screen can build a fixed
/// row of answer buttons.
#[derive(Clone, Debug, Default)]
pub struct QuizSet {
    questions: Vec<Question>,
}

impl QuizSet {
    pub fn new(questions: Vec<Question>) -> Result<QuizSet> {
        if let Some(first) = questions.first() {
            let answer_count = first.answers.len();
            ensure!(
                questions.iter().all(|q| q.answers.len() == answer_count),
                "all questions in a set must offer the same number of answers"
            );
        }
        Ok(QuizSet { questions })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn answer_count(&self) -> usize {
        self.questions
            .first()
            .map(|q| q.answers.len())
            .unwrap_or(0)
    }

    pub fn into_questions(self) -> Vec<Question> {
        self.questions
    }
}

/// Static quiz content addressed by topic name and set index.
#[derive(Debug, Default)]
pub struct TopicCatalog {
    topics: HashMap<String, Vec<QuizSet>>,
}

impl TopicCatalog {
    pub fn open(source: &Path) -> Result<TopicCatalog> {
        let file =
            File::open(source).with_context(|| format!("could not open {}", source.display()))?;
        Self::read(file)
    }

    pub fn read<R: Read>(source: R) -> Result<TopicCatalog> {
        let mut csv_reader = csv::Reader::from_reader(source);
        let mut rows = Vec::new();
        for row in csv_reader.deserialize() {
            let raw: RawQuestion = row?;
            rows.push(raw);
        }

        let by_topic = rows
            .into_iter()
            .map(|raw| (raw.topic.clone(), raw))
            .into_group_map();

        let mut topics = HashMap::new();
        for (topic, rows) in by_topic {
            let by_set = rows.into_iter().map(|raw| (raw.set, raw)).into_group_map();
            let mut sets = Vec::new();
            for (set_index, rows) in by_set.into_iter().sorted_by_key(|(index, _)| *index) {
                ensure!(
                    set_index == sets.len(),
                    "topic {:?} is missing set {}",
                    topic,
                    sets.len()
                );
                let questions = rows
                    .into_iter()
                    .map(Question::try_from)
                    .collect::<Result<Vec<_>>>()?;
                sets.push(QuizSet::new(questions)?);
            }
            topics.insert(topic, sets);
        }

        Ok(TopicCatalog { topics })
    }

    pub fn topic_names(&self) -> Vec<&str> {
        self.topics.keys().map(String::as_str).sorted().collect()
    }

    pub fn set_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map(Vec::len).unwrap_or(0)
    }

    pub fn quiz_set(&self, topic: &str, set_index: usize) -> Option<&QuizSet> {
        self.topics.get(topic).and_then(|sets| sets.get(set_index))
    }
}
