//! Scoring of a completed (or partial) answer set.
//!
//! Each answered question credits exactly one dimension, chosen by the fixed
//! dimension map. Entries that cannot be resolved are skipped and logged so a
//! damaged answer set under-counts instead of failing.

use tracing::{debug, warn};

use crate::model::{AnswerSet, Choice, ScoreTuple, dimension_for, ordinal_for_question_id};

/// Computes the four dimension scores and their total.
///
/// Pure: the result depends only on the set's contents, not on iteration order.
#[must_use]
pub fn score(answers: &AnswerSet) -> ScoreTuple {
    let mut scores = ScoreTuple::default();

    if answers.is_empty() {
        warn!("scoring an empty answer set");
        return scores;
    }

    for (question_id, raw) in answers.iter() {
        let Some(choice) = Choice::from_answer(raw) else {
            if !raw.is_empty() {
                warn!(question_id, value = raw, "skipping invalid answer value");
            }
            continue;
        };
        let Some(ordinal) = ordinal_for_question_id(question_id) else {
            warn!(question_id, "skipping answer for unknown question id");
            continue;
        };

        let dimension = dimension_for(ordinal, choice);
        scores.credit(dimension);
        debug!(
            question_id,
            ordinal = ordinal.get(),
            choice = choice.label(),
            %dimension,
            "credited answer"
        );
    }

    debug!(%scores, "scoring complete");
    scores
}
