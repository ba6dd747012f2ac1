use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Externally supplied user identity.
///
/// Chat front ends hand us numeric chat ids, while some onboarding paths only
/// know a username. Both are kept as their string rendering so the persisted
/// `uid` key has one type. A `Uid` is never empty and never contains
/// whitespace.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    /// Parse a uid, rejecting empty or whitespace-bearing input.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TypeError::Empty { kind: "uid" });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(TypeError::Whitespace {
                kind: "uid",
                value: s.to_string(),
            });
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for Uid {
    fn from(chat_id: i64) -> Self {
        Self(chat_id.to_string())
    }
}

impl std::str::FromStr for Uid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({})", self.0)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique key of a catalog task.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskName(String);

impl TaskName {
    /// Parse a task name. Surrounding whitespace is trimmed; inner spaces are
    /// allowed since names are display text.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TypeError::Empty { kind: "task name" });
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for TaskName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskName({})", self.0)
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
