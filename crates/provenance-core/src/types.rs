//! Strong type definitions for Provenance.
//!
//! Identifiers and inputs are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A session identifier, assigned by the store when a session is started.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Create from a raw integer.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw integer.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for SessionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// A single Unicode code point captured from user input.
///
/// Constructed from text that must contain exactly one scalar value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Character(char);

impl Character {
    /// Wrap a char.
    pub const fn new(c: char) -> Self {
        Self(c)
    }

    /// Get the inner char.
    pub const fn as_char(&self) -> char {
        self.0
    }

    /// Parse from text holding exactly one code point.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Self(c)),
            (None, _) => Err(CoreError::InvalidCharacter("empty string".into())),
            (Some(_), Some(_)) => Err(CoreError::InvalidCharacter(format!(
                "expected a single code point, got {} code points",
                s.chars().count()
            ))),
        }
    }
}

impl fmt::Debug for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Character({:?})", self.0)
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<char> for Character {
    fn from(c: char) -> Self {
        Self(c)
    }
}

impl TryFrom<String> for Character {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl TryFrom<&str> for Character {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Character> for String {
    fn from(c: Character) -> Self {
        c.0.to_string()
    }
}
