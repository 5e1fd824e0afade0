use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::IntegrityError;

pub const QUESTION_COUNT: usize = 20;
pub const QUESTIONS_PER_PAGE: usize = 10;

//
// ─── ORDINAL ───────────────────────────────────────────────────────────────────
//

/// 1-based position of a question in the fixed questionnaire sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ordinal(u8);

impl Ordinal {
    pub const FIRST: Ordinal = Ordinal(1);
    pub const LAST: Ordinal = Ordinal(20);

    /// # Errors
    ///
    /// Returns `IntegrityError::OrdinalOutOfRange` outside `1..=20`.
    pub fn new(value: u8) -> Result<Self, IntegrityError> {
        if (Self::FIRST.0..=Self::LAST.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(IntegrityError::OrdinalOutOfRange(value))
        }
    }

    /// Const constructor for the static tables; callers guarantee `1..=20`.
    pub(crate) const fn from_table(value: u8) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    #[must_use]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize - 1
    }

    /// All ordinals in questionnaire order.
    pub fn all() -> impl Iterator<Item = Ordinal> {
        (Self::FIRST.0..=Self::LAST.0).map(Ordinal)
    }

    #[must_use]
    pub fn question(self) -> &'static Question {
        &QUESTIONS[self.index()]
    }

    #[must_use]
    pub fn page(self) -> Page {
        Page::of(self)
    }
}

impl fmt::Display for Ordinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── CHOICE ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid choice: {0:?} (expected \"A\" or \"B\")")]
pub struct ParseChoiceError(pub String);

/// Forced-choice answer: `A` is option 甲, `B` is option 乙.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
}

impl Choice {
    /// Interprets a stored answer value. Anything but `"A"`/`"B"` is unset.
    #[must_use]
    pub fn from_answer(raw: &str) -> Option<Self> {
        match raw {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Choice::A => "A",
            Choice::B => "B",
        }
    }

    /// Label printed on the paper form.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Choice::A => "甲",
            Choice::B => "乙",
        }
    }
}

impl FromStr for Choice {
    type Err = ParseChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_answer(s).ok_or_else(|| ParseChoiceError(s.to_owned()))
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── QUESTION ID ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown question id: {0:?}")]
pub struct ParseQuestionIdError(pub String);

/// Stable string identifier of a catalog question (`a1`..`d5`).
///
/// Only catalog ids can be constructed, so every `QuestionId` has an ordinal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuestionId(&'static str);

impl QuestionId {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    #[must_use]
    pub fn ordinal(&self) -> Ordinal {
        QUESTIONS
            .iter()
            .find(|q| q.id == *self)
            .map_or(Ordinal::FIRST, |q| q.ordinal)
    }

    #[must_use]
    pub fn page(&self) -> Page {
        self.ordinal().page()
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl FromStr for QuestionId {
    type Err = ParseQuestionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QUESTIONS
            .iter()
            .find(|q| q.id.0 == s)
            .map(|q| q.id)
            .ok_or_else(|| ParseQuestionIdError(s.to_owned()))
    }
}

impl Serialize for QuestionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

impl<'de> Deserialize<'de> for QuestionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Resolves a raw question id to its ordinal. Unknown ids yield `None`.
#[must_use]
pub fn ordinal_for_question_id(id: &str) -> Option<Ordinal> {
    id.parse::<QuestionId>().ok().map(|q| q.ordinal())
}

//
// ─── PAGES ─────────────────────────────────────────────────────────────────────
//

/// The questionnaire is answered across two pages of ten questions each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    One,
    Two,
}

impl Page {
    /// The page an ordinal is shown on.
    #[must_use]
    pub fn of(ordinal: Ordinal) -> Self {
        if ordinal.index() < QUESTIONS_PER_PAGE {
            Page::One
        } else {
            Page::Two
        }
    }

    #[must_use]
    pub fn questions(self) -> &'static [Question] {
        match self {
            Page::One => &QUESTIONS[..QUESTIONS_PER_PAGE],
            Page::Two => &QUESTIONS[QUESTIONS_PER_PAGE..],
        }
    }

    #[must_use]
    pub fn contains(self, id: QuestionId) -> bool {
        id.page() == self
    }

    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Page::One => 1,
            Page::Two => 2,
        }
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// A forced-choice question. `text_a` is option 甲, `text_b` is option 乙.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub ordinal: Ordinal,
    pub text_a: &'static str,
    pub text_b: &'static str,
}

impl Question {
    #[must_use]
    pub fn text(&self, choice: Choice) -> &'static str {
        match choice {
            Choice::A => self.text_a,
            Choice::B => self.text_b,
        }
    }
}

const fn q(id: &'static str, ordinal: u8, text_a: &'static str, text_b: &'static str) -> Question {
    Question {
        id: QuestionId(id),
        ordinal: Ordinal(ordinal),
        text_a,
        text_b,
    }
}

const CATALOG: [Question; QUESTION_COUNT] = [
    q("a1", 1, "我對我的行動是果斷而且堅定不移", "我在防衛我的動機時，總會表現極度的熱誠"),
    q("a2", 2, "我喜歡非常和諧的狀況", "我喜歡和新朋友見面"),
    q("a3", 3, "我喜歡計畫一些未來的事情", "我喜歡根據程序做事情"),
    q("a4", 4, "我是個有創造性的人", "我是個富進取心的人"),
    q("a5", 5, "我很喜歡友善地對待其他人", "我很喜歡依照細節及規格做事情"),
    q("b1", 6, "我總是想尋找一些例外的事情", "我很喜歡想一些替代方案"),
    q("b2", 7, "我喜歡有人被我指導", "我喜歡檢查一些事情以求精確"),
    q("b3", 8, "我喜歡以新的方式看待一些事情", "我喜歡待在一群人所組成的團體中"),
    q("b4", 9, "我把自己看成一個有判意的人", "我在工作上總是力求控制和秩序感"),
    q("b5", 10, "我喜歡做一些我感覺到正確的事情", "我喜歡做一些體力勞動的事情"),
    q("c1", 11, "我總是預期最好的事情會發生", "我喜歡用有系統的方法做事情"),
    q("c2", 12, "我喜歡想像各種事物的可能性", "我喜歡做一個強勢的人"),
    q("c3", 13, "我對與別人合作總是感到自在", "我總是有一些獨立的思考"),
    q("c4", 14, "我總是以熱誠及友善對待別人", "我對自己的方向總是精力充沛"),
    q("c5", 15, "如果我信仰某種理由 我可能會慷慨性我的興趣", "我喜歡以有秩序的方式做事"),
    q("d1", 16, "我喜歡想一些新點子", "我總是以充滿興奮及精力的方式做事情"),
    q("d2", 17, "我喜歡和別人談話", "我喜歡依照特定程序"),
    q("d3", 18, "我是個謹慎的人", "我喜歡完成一些事情"),
    q("d4", 19, "我喜歡處於一種可以行動的狀況", "我常常表現體貼和同情的心態"),
    q("d5", 20, "我喜歡和陌生人交談", "我喜歡在大多數的情況下發號施令"),
];

const _: () = {
    let mut i = 0;
    while i < QUESTION_COUNT {
        assert!(CATALOG[i].ordinal.0 as usize == i + 1, "catalog out of order");
        i += 1;
    }
};

/// The fixed questionnaire, in ordinal order.
pub static QUESTIONS: [Question; QUESTION_COUNT] = CATALOG;
