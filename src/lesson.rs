//! Lesson types - an append-mostly log of experience
//!
//! Each lesson records what was done, in which context, how it turned out,
//! and what was learned from it.

use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Outcome of an action.
///
/// `success` and `failure` are the conventional values; any other
/// non-empty text is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Outcome {
    Success,
    Failure,
    Other(String),
}

impl Outcome {
    /// Get the string representation of the outcome
    pub fn as_str(&self) -> &str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Other(s) => s,
        }
    }
}

impl Outcome {
    /// The form an outcome is stored and filtered in: trimmed and non-empty,
    /// with `Other("success")` and `Other("failure")` folded into their variants
    pub fn normalize(self) -> Result<Self, Error> {
        self.as_str().parse()
    }
}

impl FromStr for Outcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("lesson outcome must not be empty".to_string()));
        }
        match trimmed {
            "success" => Ok(Outcome::Success),
            "failure" => Ok(Outcome::Failure),
            other => Ok(Outcome::Other(other.to_string())),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<Outcome> for String {
    fn from(outcome: Outcome) -> Self {
        outcome.as_str().to_string()
    }
}

impl TryFrom<String> for Outcome {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// An experience record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub action: String,
    pub context: Option<String>,
    pub outcome: Outcome,
    pub insight: String,
    pub created_at: DateTime<Utc>,
    /// Reserved; no operation increments it yet
    pub applied_count: u32,
}

/// Filters for `get_lessons`
#[derive(Debug, Clone, PartialEq)]
pub struct LessonQuery {
    /// Substring match on the lesson context
    pub context: Option<String>,
    /// Exact match on the outcome
    pub outcome: Option<Outcome>,
    pub limit: usize,
}

impl Default for LessonQuery {
    fn default() -> Self {
        Self {
            context: None,
            outcome: None,
            limit: 10,
        }
    }
}

impl LessonQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_roundtrip() {
        for outcome in [Outcome::Success, Outcome::Failure, Outcome::Other("partial".into())] {
            let parsed: Outcome = outcome.as_str().parse().unwrap();
            assert_eq!(outcome, parsed);
        }
    }

    #[test]
    fn test_free_text_outcomes_are_kept_verbatim() {
        assert_eq!("ok".parse::<Outcome>().unwrap(), Outcome::Other("ok".into()));
        assert_eq!("Success".parse::<Outcome>().unwrap(), Outcome::Other("Success".into()));
        assert_eq!(" failure ".parse::<Outcome>().unwrap(), Outcome::Failure);
    }

    #[test]
    fn test_normalize_trims_and_folds() {
        assert_eq!(
            Outcome::Other("  partial ".into()).normalize().unwrap(),
            Outcome::Other("partial".into())
        );
        assert_eq!(Outcome::Other("success".into()).normalize().unwrap(), Outcome::Success);
        assert!(Outcome::Other(" ".into()).normalize().is_err());
    }

    #[test]
    fn test_empty_outcome_rejected() {
        assert!("".parse::<Outcome>().is_err());
        assert!("   ".parse::<Outcome>().is_err());
    }

    #[test]
    fn test_outcome_serializes_as_text() {
        let json = serde_json::to_string(&Outcome::Failure).unwrap();
        assert_eq!(json, "\"failure\"");
        let back: Outcome = serde_json::from_str("\"timed out\"").unwrap();
        assert_eq!(back, Outcome::Other("timed out".into()));
    }
}
