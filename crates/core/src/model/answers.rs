use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::question::{Choice, Ordinal, Page, Question, QuestionId, ordinal_for_question_id};

/// Answers keyed by raw question id, as stored between page visits.
///
/// Keys and values stay raw strings so partially corrupted state can be loaded
/// and scored; `Choice::from_answer` decides what counts as answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet {
    entries: BTreeMap<String, String>,
}

impl AnswerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the respondent's pick for a question (last write wins).
    pub fn set(&mut self, id: QuestionId, choice: Choice) {
        self.entries
            .insert(id.as_str().to_owned(), choice.as_str().to_owned());
    }

    /// Stores an arbitrary entry, for state read back from storage or the wire.
    pub fn insert_raw(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Marks a question as unanswered again.
    pub fn unset(&mut self, id: QuestionId) {
        self.entries.remove(id.as_str());
    }

    #[must_use]
    pub fn choice(&self, id: QuestionId) -> Option<Choice> {
        self.entries
            .get(id.as_str())
            .and_then(|v| Choice::from_answer(v))
    }

    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of raw entries, answered or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that name a catalog question and hold `A` or `B`.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(k, v)| {
                ordinal_for_question_id(k).is_some() && Choice::from_answer(v).is_some()
            })
            .count()
    }

    /// Ordinals of the given questions that have no valid choice yet.
    #[must_use]
    pub fn unanswered(&self, questions: &[Question]) -> Vec<Ordinal> {
        questions
            .iter()
            .filter(|q| self.choice(q.id).is_none())
            .map(|q| q.ordinal)
            .collect()
    }

    /// Entries belonging to one page.
    #[must_use]
    pub fn for_page(&self, page: Page) -> Self {
        self.entries
            .iter()
            .filter(|(k, _)| ordinal_for_question_id(k).is_some_and(|o| o.page() == page))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Union of two page sets. On a shared key the first set is kept.
    #[must_use]
    pub fn merge_pages(first: &Self, second: &Self) -> Self {
        let mut merged = first.clone();
        for (k, v) in &second.entries {
            merged.entries.entry(k.clone()).or_insert_with(|| v.clone());
        }
        merged
    }
}

impl FromIterator<(String, String)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<(QuestionId, Choice)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (QuestionId, Choice)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (id, choice) in iter {
            set.set(id, choice);
        }
        set
    }
}
