use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::dimension::Dimension;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("total score ({total}) does not match dimension scores ({sum})")]
    TotalMismatch { total: u32, sum: u32 },
}

/// Per-dimension counts plus their total.
///
/// Only built by scoring or by rehydrating a stored record, so the total always
/// equals the sum of the four dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScores")]
pub struct ScoreTuple {
    a_score: u32,
    b_score: u32,
    c_score: u32,
    d_score: u32,
    total_score: u32,
}

#[derive(Deserialize)]
struct RawScores {
    a_score: u32,
    b_score: u32,
    c_score: u32,
    d_score: u32,
    total_score: Option<u32>,
}

impl TryFrom<RawScores> for ScoreTuple {
    type Error = ScoreError;

    fn try_from(raw: RawScores) -> Result<Self, Self::Error> {
        match raw.total_score {
            Some(total) => Self::from_persisted(
                raw.a_score,
                raw.b_score,
                raw.c_score,
                raw.d_score,
                total,
            ),
            None => Ok(Self::from_parts(
                raw.a_score,
                raw.b_score,
                raw.c_score,
                raw.d_score,
            )),
        }
    }
}

impl ScoreTuple {
    #[must_use]
    pub fn from_parts(a: u32, b: u32, c: u32, d: u32) -> Self {
        Self {
            a_score: a,
            b_score: b,
            c_score: c,
            d_score: d,
            total_score: a.saturating_add(b).saturating_add(c).saturating_add(d),
        }
    }

    /// Rehydrate a stored tuple.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError::TotalMismatch` if `total` is not the sum of the parts.
    pub fn from_persisted(a: u32, b: u32, c: u32, d: u32, total: u32) -> Result<Self, ScoreError> {
        let tuple = Self::from_parts(a, b, c, d);
        if tuple.total_score != total {
            return Err(ScoreError::TotalMismatch {
                total,
                sum: tuple.total_score,
            });
        }
        Ok(tuple)
    }

    pub(crate) fn credit(&mut self, dimension: Dimension) {
        let slot = match dimension {
            Dimension::A => &mut self.a_score,
            Dimension::B => &mut self.b_score,
            Dimension::C => &mut self.c_score,
            Dimension::D => &mut self.d_score,
        };
        *slot = slot.saturating_add(1);
        self.total_score = self.total_score.saturating_add(1);
    }

    #[must_use]
    pub fn get(&self, dimension: Dimension) -> u32 {
        match dimension {
            Dimension::A => self.a_score,
            Dimension::B => self.b_score,
            Dimension::C => self.c_score,
            Dimension::D => self.d_score,
        }
    }

    #[must_use]
    pub fn a_score(&self) -> u32 {
        self.a_score
    }

    #[must_use]
    pub fn b_score(&self) -> u32 {
        self.b_score
    }

    #[must_use]
    pub fn c_score(&self) -> u32 {
        self.c_score
    }

    #[must_use]
    pub fn d_score(&self) -> u32 {
        self.d_score
    }

    #[must_use]
    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    #[must_use]
    pub fn level(&self) -> StressLevel {
        StressLevel::from_total(self.total_score)
    }
}

impl fmt::Display for ScoreTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A={}, B={}, C={}, D={}, 總分={}",
            self.a_score, self.b_score, self.c_score, self.d_score, self.total_score
        )
    }
}

/// Banding of a total score shown on the result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StressLevel {
    Low,
    MediumLow,
    Medium,
    MediumHigh,
    High,
}

impl StressLevel {
    #[must_use]
    pub fn from_total(total: u32) -> Self {
        match total {
            0..=20 => Self::Low,
            21..=40 => Self::MediumLow,
            41..=60 => Self::Medium,
            61..=80 => Self::MediumHigh,
            _ => Self::High,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            StressLevel::Low => "低壓力",
            StressLevel::MediumLow => "中低壓力",
            StressLevel::Medium => "中度壓力",
            StressLevel::MediumHigh => "中高壓力",
            StressLevel::High => "高壓力",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_keeps_total_in_step() {
        let mut scores = ScoreTuple::default();
        scores.credit(Dimension::C);
        scores.credit(Dimension::C);
        scores.credit(Dimension::A);
        assert_eq!(scores.c_score(), 2);
        assert_eq!(scores.a_score(), 1);
        assert_eq!(scores.total_score(), 3);
    }

    #[test]
    fn from_persisted_rejects_wrong_total() {
        assert_eq!(
            ScoreTuple::from_persisted(1, 2, 3, 4, 11),
            Err(ScoreError::TotalMismatch { total: 11, sum: 10 })
        );
        assert!(ScoreTuple::from_persisted(1, 2, 3, 4, 10).is_ok());
    }

    #[test]
    fn deserialize_validates_or_derives_total() {
        let ok: ScoreTuple =
            serde_json::from_str(r#"{"a_score":5,"b_score":5,"c_score":5,"d_score":5}"#).unwrap();
        assert_eq!(ok.total_score(), 20);

        let bad = serde_json::from_str::<ScoreTuple>(
            r#"{"a_score":5,"b_score":5,"c_score":5,"d_score":5,"total_score":3}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn serializes_console_field_names() {
        let json = serde_json::to_value(ScoreTuple::from_parts(10, 7, 3, 0)).unwrap();
        assert_eq!(json["a_score"], 10);
        assert_eq!(json["total_score"], 20);
    }

    #[test]
    fn level_bands() {
        assert_eq!(StressLevel::from_total(0), StressLevel::Low);
        assert_eq!(StressLevel::from_total(20), StressLevel::Low);
        assert_eq!(StressLevel::from_total(21), StressLevel::MediumLow);
        assert_eq!(StressLevel::from_total(60), StressLevel::Medium);
        assert_eq!(StressLevel::from_total(80), StressLevel::MediumHigh);
        assert_eq!(StressLevel::from_total(81).label(), "高壓力");
    }
}
