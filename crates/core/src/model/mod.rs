mod answers;
mod dimension;
mod ids;
mod member;
mod question;
mod respondent;
mod score;
mod submission;
mod workflow;

pub use answers::AnswerSet;
pub use dimension::{DIMENSION_MAP, Dimension, DimensionMapEntry, dimension_for};
pub use ids::{MemberId, ParseIdError, StressTestId};
pub use member::Member;
pub use question::{
    Choice, Ordinal, Page, ParseChoiceError, ParseQuestionIdError, QUESTIONS, QUESTION_COUNT,
    QUESTIONS_PER_PAGE, Question, QuestionId, ordinal_for_question_id,
};
pub use respondent::{RespondentField, RespondentInfo};
pub use score::{ScoreError, ScoreTuple, StressLevel};
pub use submission::{StressTestRecord, StressTestSubmission};
pub use workflow::{IllegalTransition, WorkflowState};
