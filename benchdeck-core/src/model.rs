//! Domain model for test sets and evaluation runs
//!
//! A test set is a question/ground-truth pair owned by a single domain. Its
//! `last_status` is written only by the backend as the outcome of an
//! evaluation run; the client never mutates it locally.

use serde::{Deserialize, Serialize};

use crate::error::{BenchdeckError, Result};

/// Difficulty tag assigned to a test set at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Parse a wire-format difficulty. Unknown values yield `None` so callers
    /// can fall back to the default rather than fail the whole record.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Wire-format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome recorded against a test set by the most recent evaluation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pass,
    Fail,
    Warn,
}

impl RunStatus {
    /// Parse a wire-format status. Unrecognized values yield `None`, which
    /// downstream renders as never-evaluated.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pass" => Some(RunStatus::Pass),
            "fail" => Some(RunStatus::Fail),
            "warn" => Some(RunStatus::Warn),
            _ => None,
        }
    }

    /// Wire-format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pass => "pass",
            RunStatus::Fail => "fail",
            RunStatus::Warn => "warn",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ground-truth test set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSet {
    /// Server-assigned identifier, stable for the lifetime of the test set
    pub id: String,

    /// Owning domain
    pub domain_id: String,

    /// Evaluation prompt
    pub question: String,

    /// Expected answer
    pub ground_truth: String,

    /// Difficulty tag
    #[serde(default)]
    pub difficulty: Difficulty,

    /// Outcome of the last completed run, absent if never evaluated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status: Option<RunStatus>,
}

/// Input state for creating a test set
///
/// Drafts live in the mutation coordinator so a failed create leaves the
/// user's input intact for retry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TestSetDraft {
    pub question: String,
    pub ground_truth: String,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl TestSetDraft {
    /// Create a draft with the required fields.
    pub fn new(question: impl Into<String>, ground_truth: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ground_truth: ground_truth.into(),
            difficulty: Difficulty::default(),
        }
    }

    /// Set the difficulty tag.
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Local validation, checked before any network round trip.
    pub fn validate(&self) -> Result<()> {
        if self.question.trim().is_empty() {
            return Err(BenchdeckError::Validation(
                "question is required".to_string(),
            ));
        }
        if self.ground_truth.trim().is_empty() {
            return Err(BenchdeckError::Validation(
                "ground truth answer is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Summary returned by a completed evaluation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRunResult {
    /// Count of test sets scored in the run
    pub test_sets_evaluated: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_default_is_medium() {
        assert_eq!(Difficulty::default(), Difficulty::Medium);
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!(Difficulty::parse("hard"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::parse(" Easy "), Some(Difficulty::Easy));
        assert_eq!(Difficulty::parse("impossible"), None);
    }

    #[test]
    fn test_run_status_parse_is_lenient() {
        assert_eq!(RunStatus::parse("pass"), Some(RunStatus::Pass));
        assert_eq!(RunStatus::parse("WARN"), Some(RunStatus::Warn));
        assert_eq!(RunStatus::parse("exploded"), None);
        assert_eq!(RunStatus::parse(""), None);
    }

    #[test]
    fn test_draft_validation() {
        let draft = TestSetDraft::new("List active servers", "SQL filter on status");
        assert!(draft.validate().is_ok());

        let missing_truth = TestSetDraft::new("List active servers", "   ");
        let err = missing_truth.validate().unwrap_err();
        assert!(matches!(err, BenchdeckError::Validation(_)));

        let missing_question = TestSetDraft::new("", "an answer");
        assert!(missing_question.validate().is_err());
    }

    #[test]
    fn test_test_set_serialization_uses_wire_names() {
        let test_set = TestSet {
            id: "ts_1".to_string(),
            domain_id: "maps".to_string(),
            question: "List active servers".to_string(),
            ground_truth: "SQL filter on status".to_string(),
            difficulty: Difficulty::Hard,
            last_status: Some(RunStatus::Warn),
        };

        let json = serde_json::to_value(&test_set).unwrap();
        assert_eq!(json["ground_truth"], "SQL filter on status");
        assert_eq!(json["difficulty"], "hard");
        assert_eq!(json["last_status"], "warn");
    }

    #[test]
    fn test_test_set_deserializes_without_status() {
        let json = serde_json::json!({
            "id": "ts_2",
            "domain_id": "maps",
            "question": "q",
            "ground_truth": "a"
        });
        let test_set: TestSet = serde_json::from_value(json).unwrap();
        assert_eq!(test_set.difficulty, Difficulty::Medium);
        assert!(test_set.last_status.is_none());
    }
}
