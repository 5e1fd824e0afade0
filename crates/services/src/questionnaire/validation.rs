use std::fmt;

use stress_core::model::{AnswerSet, Ordinal, Page, RespondentField, RespondentInfo};

/// What still blocks leaving a page, for inline highlighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub page: Page,
    pub missing_fields: Vec<RespondentField>,
    pub unanswered: Vec<Ordinal>,
}

impl ValidationReport {
    /// Page 1 checks the respondent header and its ten questions.
    #[must_use]
    pub fn for_page1(respondent: &RespondentInfo, answers: &AnswerSet) -> Self {
        Self {
            page: Page::One,
            missing_fields: respondent.missing_fields(),
            unanswered: answers.unanswered(Page::One.questions()),
        }
    }

    #[must_use]
    pub fn for_page2(answers: &AnswerSet) -> Self {
        Self {
            page: Page::Two,
            missing_fields: Vec::new(),
            unanswered: answers.unanswered(Page::Two.questions()),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields.is_empty() && self.unanswered.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}", self.page.number())?;
        if !self.missing_fields.is_empty() {
            let fields: Vec<String> = self.missing_fields.iter().map(ToString::to_string).collect();
            write!(f, ", missing fields [{}]", fields.join(", "))?;
        }
        if !self.unanswered.is_empty() {
            let ordinals: Vec<String> = self.unanswered.iter().map(ToString::to_string).collect();
            write!(f, ", unanswered questions [{}]", ordinals.join(", "))?;
        }
        Ok(())
    }
}

/// Why page 2 cannot be entered with the stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    MissingPage1Answers,
    MissingRespondent,
}

impl fmt::Display for RestartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartReason::MissingPage1Answers => f.write_str("no page 1 answers are stored"),
            RestartReason::MissingRespondent => {
                f.write_str("no respondent or selected member is stored")
            }
        }
    }
}
