// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! Outcome classification.
//!
//! Maps the raw result of a test's execution onto the five-way outcome
//! taxonomy. The one non-obvious rule is the unsupported-feature skip: a
//! compatibility suite must keep "this backend doesn't implement optional
//! feature X" visible and countable separately from genuine regressions,
//! so any backend error code in the configured set classifies as
//! `Skipped` no matter which operation raised it.

use std::collections::HashSet;

use gauntlet_core::{ClassifierConfig, Error, Outcome};

/// The raw result of a unit of work, before classification.
#[derive(Debug)]
pub enum RawResult {
    /// The body ran to completion and returned.
    Completed(gauntlet_core::Result<()>),
    /// The body panicked; teardown still ran.
    Panicked(String),
    /// The body exceeded the per-test deadline and was cancelled.
    DeadlineExceeded,
    /// Bucket creation failed, so the body never ran.
    FixtureFailed(Error),
}

/// Maps raw execution results onto outcomes.
#[derive(Debug, Clone)]
pub struct OutcomeClassifier {
    unsupported: HashSet<String>,
}

impl OutcomeClassifier {
    /// Builds a classifier from the configured unsupported-feature codes.
    #[must_use]
    pub fn new(config: &ClassifierConfig) -> Self {
        Self { unsupported: config.unsupported_codes.iter().cloned().collect() }
    }

    /// Classifies a raw result. Rules, in order:
    ///
    /// 1. clean return → `Passed`
    /// 2. error code in the unsupported set → `Skipped(code)`
    /// 3. deadline exceeded → `TimedOut`
    /// 4. transport-level failure → `Errored`
    /// 5. anything else (API error, assertion, panic) → `Failed`
    ///
    /// A failed fixture creation short-circuits the test: `Errored` when
    /// transport-level, `Failed` otherwise — the body never ran, so the
    /// skip rule does not apply.
    #[must_use]
    pub fn classify(&self, raw: &RawResult) -> Outcome {
        match raw {
            RawResult::Completed(Ok(())) => Outcome::Passed,
            RawResult::Completed(Err(err)) => self.classify_error(err),
            RawResult::Panicked(message) => {
                Outcome::Failed { detail: format!("test body panicked: {message}") }
            }
            RawResult::DeadlineExceeded => Outcome::TimedOut,
            RawResult::FixtureFailed(err) if err.is_transport() => {
                Outcome::Errored { detail: format!("fixture: {err}") }
            }
            RawResult::FixtureFailed(err) => {
                Outcome::Failed { detail: format!("fixture: {err}") }
            }
        }
    }

    fn classify_error(&self, err: &Error) -> Outcome {
        if let Some(code) = err.code() {
            if self.unsupported.contains(code) {
                return Outcome::Skipped { code: code.to_string() };
            }
        }
        if err.is_transport() {
            return Outcome::Errored { detail: err.to_string() };
        }
        Outcome::Failed { detail: err.to_string() }
    }
}
