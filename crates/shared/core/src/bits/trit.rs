use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a single condition bit
///
/// A condition bit either requires the corresponding signal bit to be
/// 0 or 1, or ignores it entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Trit {
    /// Matches any signal value
    #[default]
    DontCare,
    /// Signal bit must be 0
    Zero,
    /// Signal bit must be 1
    One,
}

impl Trit {
    /// Trit requiring the given signal value
    pub fn from_bool(value: bool) -> Self {
        if value { Trit::One } else { Trit::Zero }
    }

    pub fn is_specified(&self) -> bool {
        !matches!(self, Trit::DontCare)
    }

    /// Required value, if any
    pub fn required(&self) -> Option<bool> {
        match self {
            Trit::DontCare => None,
            Trit::Zero => Some(false),
            Trit::One => Some(true),
        }
    }

    /// The opposite requirement; don't-care stays don't-care
    pub fn flipped(&self) -> Self {
        match self {
            Trit::DontCare => Trit::DontCare,
            Trit::Zero => Trit::One,
            Trit::One => Trit::Zero,
        }
    }
}

impl fmt::Display for Trit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trit::DontCare => write!(f, "#"),
            Trit::Zero => write!(f, "0"),
            Trit::One => write!(f, "1"),
        }
    }
}
