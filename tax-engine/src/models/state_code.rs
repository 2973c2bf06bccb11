use std::fmt;

use serde::{Deserialize, Serialize};

/// States with a registered rules module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StateCode {
    CA,
    IL,
    KY,
    MA,
    NC,
    PA,
}

impl StateCode {
    pub const ALL: [StateCode; 6] = [
        Self::CA,
        Self::IL,
        Self::KY,
        Self::MA,
        Self::NC,
        Self::PA,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CA => "CA",
            Self::IL => "IL",
            Self::KY => "KY",
            Self::MA => "MA",
            Self::NC => "NC",
            Self::PA => "PA",
        }
    }

    /// Case-insensitive; surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Option<Self> {
        let code = s.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|state| state.as_str() == code)
    }

    /// Whether a free-form postal code on a document refers to this state.
    pub fn matches(
        &self,
        postal_code: &str,
    ) -> bool {
        postal_code.trim().eq_ignore_ascii_case(self.as_str())
    }
}

impl fmt::Display for StateCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
