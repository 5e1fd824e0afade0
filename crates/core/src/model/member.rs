use serde::{Deserialize, Serialize};

use crate::model::ids::MemberId;

/// Member record as returned by the console's member lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub occupation: Option<String>,
}

impl Member {
    #[must_use]
    pub fn new(id: MemberId, name: impl Into<String>, occupation: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            occupation: occupation
                .map(|o| o.trim().to_owned())
                .filter(|o| !o.is_empty()),
        }
    }
}
