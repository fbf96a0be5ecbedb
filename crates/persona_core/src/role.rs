//! Who spoke a line.
//!
//! Counter creation and turn attribution key off this, so it is a tagged
//! identifier rather than a bare string. On the wire it is a plain string:
//! the narrator serializes as `[GAME WORLD]`, everyone else as their name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire label of the narrator / game-world voice. Reserved: a participant
/// with this exact name reads back as [`Role::Narrator`], so persona
/// definitions may not use it as a username.
pub const NARRATOR_LABEL: &str = "[GAME WORLD]";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// A named participant (persona or player).
    Participant(String),
    /// Scene narration that belongs to no participant.
    Narrator,
}

impl Role {
    pub fn participant(name: impl Into<String>) -> Self {
        Self::Participant(name.into())
    }

    pub fn is_narrator(&self) -> bool {
        matches!(self, Self::Narrator)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Participant(name) => name,
            Self::Narrator => NARRATOR_LABEL,
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        if s == NARRATOR_LABEL {
            Self::Narrator
        } else {
            Self::Participant(s)
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Participant(name) => name,
            Role::Narrator => NARRATOR_LABEL.to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
