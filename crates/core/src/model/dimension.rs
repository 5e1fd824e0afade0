use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::IntegrityError;
use crate::model::question::{Choice, Ordinal, QUESTION_COUNT};

/// One of the four scoring buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    A,
    B,
    C,
    D,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [Dimension::A, Dimension::B, Dimension::C, Dimension::D];

    /// Field name used for this dimension in persisted and wire records.
    #[must_use]
    pub fn score_key(self) -> &'static str {
        match self {
            Dimension::A => "a_score",
            Dimension::B => "b_score",
            Dimension::C => "c_score",
            Dimension::D => "d_score",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dimension::A => "A",
            Dimension::B => "B",
            Dimension::C => "C",
            Dimension::D => "D",
        };
        f.write_str(s)
    }
}

/// Which dimension a question credits for each of its two options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionMapEntry {
    pub ordinal: Ordinal,
    pub if_a: Dimension,
    pub if_b: Dimension,
}

impl DimensionMapEntry {
    #[must_use]
    pub fn dimension(&self, choice: Choice) -> Dimension {
        match choice {
            Choice::A => self.if_a,
            Choice::B => self.if_b,
        }
    }
}

const fn entry(ordinal: u8, if_a: Dimension, if_b: Dimension) -> DimensionMapEntry {
    DimensionMapEntry {
        ordinal: Ordinal::from_table(ordinal),
        if_a,
        if_b,
    }
}

use Dimension::{A, B, C, D};

const TABLE: [DimensionMapEntry; QUESTION_COUNT] = [
    entry(1, A, B),
    entry(2, C, B),
    entry(3, C, D),
    entry(4, C, A),
    entry(5, B, D),
    entry(6, D, C),
    entry(7, A, D),
    entry(8, C, B),
    entry(9, C, D),
    entry(10, D, A),
    entry(11, B, D),
    entry(12, C, A),
    entry(13, B, C),
    entry(14, B, A),
    entry(15, B, D),
    entry(16, C, A),
    entry(17, B, D),
    entry(18, D, A),
    entry(19, A, C),
    entry(20, B, A),
];

// Entry i must describe ordinal i + 1; a gap or reordering fails the build.
const _: () = {
    let mut i = 0;
    while i < QUESTION_COUNT {
        assert!(TABLE[i].ordinal.get() as usize == i + 1, "dimension map out of order");
        i += 1;
    }
};

/// The fixed question-to-dimension table, keyed by ordinal.
pub static DIMENSION_MAP: [DimensionMapEntry; QUESTION_COUNT] = TABLE;

/// Dimension credited when `choice` is picked for the question at `ordinal`.
#[must_use]
pub fn dimension_for(ordinal: Ordinal, choice: Choice) -> Dimension {
    DIMENSION_MAP[ordinal.index()].dimension(choice)
}

impl Ordinal {
    /// Map entry for this ordinal.
    #[must_use]
    pub fn map_entry(self) -> &'static DimensionMapEntry {
        &DIMENSION_MAP[self.index()]
    }
}

impl DimensionMapEntry {
    /// Looks up a raw ordinal, as read from untrusted input.
    ///
    /// # Errors
    ///
    /// Returns `IntegrityError::OrdinalOutOfRange` if `raw` is not in `1..=20`.
    pub fn lookup(raw: u8) -> Result<&'static DimensionMapEntry, IntegrityError> {
        let ordinal = Ordinal::new(raw)?;
        DIMENSION_MAP
            .get(ordinal.index())
            .filter(|e| e.ordinal == ordinal)
            .ok_or(IntegrityError::MissingMapEntry(raw))
    }
}
