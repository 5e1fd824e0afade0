use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time::Clock;

/// Header fields of the questionnaire (受測者資訊).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondentInfo {
    pub name: String,
    pub position: String,
    pub test_date: String,
}

/// A respondent field that must be filled before leaving page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RespondentField {
    Name,
    Position,
    TestDate,
}

impl fmt::Display for RespondentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RespondentField::Name => "name",
            RespondentField::Position => "position",
            RespondentField::TestDate => "testDate",
        };
        f.write_str(s)
    }
}

impl RespondentInfo {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        position: impl Into<String>,
        test_date: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            position: position.into(),
            test_date: test_date.into(),
        }
    }

    /// Blank form with the test date pre-filled to today.
    #[must_use]
    pub fn blank(clock: &Clock) -> Self {
        Self {
            test_date: clock.today().format("%Y-%m-%d").to_string(),
            ..Self::default()
        }
    }

    /// Fields that are empty after trimming whitespace.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<RespondentField> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push(RespondentField::Name);
        }
        if self.position.trim().is_empty() {
            missing.push(RespondentField::Position);
        }
        if self.test_date.trim().is_empty() {
            missing.push(RespondentField::TestDate);
        }
        missing
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_clock;

    #[test]
    fn blank_prefills_date_only() {
        let info = RespondentInfo::blank(&fixed_clock());
        assert_eq!(info.test_date, "2024-05-01");
        assert_eq!(
            info.missing_fields(),
            vec![RespondentField::Name, RespondentField::Position]
        );
    }

    #[test]
    fn whitespace_counts_as_missing() {
        let info = RespondentInfo::new("  ", "技師", "2024-05-01");
        assert_eq!(info.missing_fields(), vec![RespondentField::Name]);
        assert!(RespondentInfo::new("王小明", "技師", "2024-05-01").is_complete());
    }

    #[test]
    fn serializes_with_console_field_names() {
        let info = RespondentInfo::new("王小明", "技師", "2024-05-01");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["testDate"], "2024-05-01");
        assert_eq!(json["name"], "王小明");
    }
}
