// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! Common types used throughout Gauntlet.

use serde::{Deserialize, Serialize};

/// A unique identifier for a registered test case.
///
/// By convention ids are `category/name` (e.g. `bucket/create_delete`),
/// which keeps the default run ordering readable and lets the CLI select
/// by prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestId(String);

impl TestId {
    /// Creates a new test id.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the id as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The functional area a test case exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Bucket lifecycle: create, head, list, delete.
    Bucket,
    /// Single-object operations: put, get, head, delete, copy.
    Object,
    /// Object listing: prefixes, pagination, ordering.
    List,
    /// Multipart uploads.
    Multipart,
    /// Bucket versioning and version-aware operations.
    Versioning,
    /// Object tagging.
    Tagging,
}

impl Category {
    /// All categories, in default run order.
    pub const ALL: [Self; 6] = [
        Self::Bucket,
        Self::Object,
        Self::List,
        Self::Multipart,
        Self::Versioning,
        Self::Tagging,
    ];

    /// Returns the category name as used in ids and CLI flags.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bucket => "bucket",
            Self::Object => "object",
            Self::List => "list",
            Self::Multipart => "multipart",
            Self::Versioning => "versioning",
            Self::Tagging => "tagging",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "bucket" => Ok(Self::Bucket),
            "object" => Ok(Self::Object),
            "list" => Ok(Self::List),
            "multipart" => Ok(Self::Multipart),
            "versioning" => Ok(Self::Versioning),
            "tagging" => Ok(Self::Tagging),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// The normalized classification of a single test's execution result.
///
/// Produced exactly once per test per run, immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The test body completed without error.
    Passed,
    /// The backend violated the expected contract.
    Failed {
        /// The original error, rendered for reporting.
        detail: String,
    },
    /// The backend explicitly declined to support an optional feature.
    Skipped {
        /// The backend error code that signalled the skip.
        code: String,
    },
    /// The test exceeded its per-test deadline.
    TimedOut,
    /// Harness or environment failure unrelated to backend correctness.
    Errored {
        /// The transport-level failure, rendered for reporting.
        detail: String,
    },
}

impl Outcome {
    /// Returns the kind of this outcome, without its detail payload.
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::Passed => OutcomeKind::Passed,
            Self::Failed { .. } => OutcomeKind::Failed,
            Self::Skipped { .. } => OutcomeKind::Skipped,
            Self::TimedOut => OutcomeKind::TimedOut,
            Self::Errored { .. } => OutcomeKind::Errored,
        }
    }

    /// Returns whether this outcome counts against the run's exit code.
    ///
    /// `Skipped` and `TimedOut` do not: a skip is expected partial
    /// coverage, and a timeout is reported distinctly so slow operations
    /// are visible without failing the run.
    #[must_use]
    pub const fn is_defect(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Errored { .. })
    }

    /// Returns the detail string for non-passed outcomes, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Failed { detail } | Self::Errored { detail } => Some(detail),
            Self::Skipped { code } => Some(code),
            Self::Passed | Self::TimedOut => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind())
    }
}

/// The five outcome kinds, used for aggregate counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Test passed.
    Passed,
    /// Backend violated the contract.
    Failed,
    /// Feature not supported by the backend.
    Skipped,
    /// Per-test deadline exceeded.
    TimedOut,
    /// Infrastructure failure.
    Errored,
}

impl OutcomeKind {
    /// All kinds, in reporting order.
    pub const ALL: [Self; 5] =
        [Self::Passed, Self::Failed, Self::Skipped, Self::TimedOut, Self::Errored];

    /// Returns the kind name as rendered in reports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::TimedOut => "timed_out",
            Self::Errored => "errored",
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_str() {
        for category in Category::ALL {
            let parsed: Category = category.as_str().parse().unwrap();
            assert_eq!(parsed, category);
        }
        assert!("acls".parse::<Category>().is_err());
    }

    #[test]
    fn outcome_kinds() {
        assert_eq!(Outcome::Passed.kind(), OutcomeKind::Passed);
        assert_eq!(
            Outcome::Skipped { code: "NotImplemented".into() }.kind(),
            OutcomeKind::Skipped
        );
        assert!(Outcome::Failed { detail: "x".into() }.is_defect());
        assert!(Outcome::Errored { detail: "x".into() }.is_defect());
        assert!(!Outcome::TimedOut.is_defect());
        assert!(!Outcome::Skipped { code: "NotImplemented".into() }.is_defect());
    }

    #[test]
    fn outcome_serializes_with_kind_tag() {
        let rendered = toml::to_string(&Outcome::Failed { detail: "boom".into() }).unwrap();
        assert!(rendered.contains("kind = \"failed\""));
        assert!(rendered.contains("detail = \"boom\""));
    }
}
