use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::answers::AnswerSet;
use crate::model::ids::{MemberId, StressTestId};
use crate::model::respondent::RespondentInfo;
use crate::model::score::ScoreTuple;

/// Payload handed to the persistence collaborator once, at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressTestSubmission {
    pub member_id: Option<MemberId>,
    pub respondent: RespondentInfo,
    pub scores: ScoreTuple,
    pub answers: AnswerSet,
    pub submitted_at: DateTime<Utc>,
}

impl StressTestSubmission {
    #[must_use]
    pub fn new(
        member_id: Option<MemberId>,
        respondent: RespondentInfo,
        scores: ScoreTuple,
        answers: AnswerSet,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            member_id,
            respondent,
            scores,
            answers,
            submitted_at,
        }
    }
}

/// A stored stress-test result, as listed on the results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StressTestRecord {
    pub id: StressTestId,
    pub member_id: Option<MemberId>,
    pub respondent: RespondentInfo,
    pub scores: ScoreTuple,
    pub answers: AnswerSet,
    pub created_at: DateTime<Utc>,
}

impl StressTestRecord {
    #[must_use]
    pub fn from_submission(id: StressTestId, submission: &StressTestSubmission) -> Self {
        Self {
            id,
            member_id: submission.member_id,
            respondent: submission.respondent.clone(),
            scores: submission.scores,
            answers: submission.answers.clone(),
            created_at: submission.submitted_at,
        }
    }
}
