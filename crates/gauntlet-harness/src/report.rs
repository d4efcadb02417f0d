// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! Result collection and run-level aggregation.
//!
//! Workers record results concurrently into a [`ReportSink`]; the
//! [`RunReport`] is produced only after the scheduler has joined every
//! dispatched unit. Rendering (text, JSON file) is the binary's concern.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Instant;

use gauntlet_core::{Category, Outcome, OutcomeKind, TestId};
use serde::Serialize;

/// The recorded result of one test execution.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    /// Test identifier.
    pub id: TestId,
    /// Test category.
    pub category: Category,
    /// Classified outcome.
    pub outcome: Outcome,
    /// Wall-clock duration of the whole unit (fixture + body + teardown).
    pub duration_ms: u64,
    /// Teardown failures swallowed during this test's cleanup.
    pub cleanup_warnings: usize,
}

/// Per-kind outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    /// Tests that passed.
    pub passed: usize,
    /// Tests that failed.
    pub failed: usize,
    /// Tests skipped as unsupported.
    pub skipped: usize,
    /// Tests that exceeded their deadline.
    pub timed_out: usize,
    /// Tests that hit infrastructure errors.
    pub errored: usize,
}

impl KindCounts {
    fn record(&mut self, kind: OutcomeKind) {
        match kind {
            OutcomeKind::Passed => self.passed += 1,
            OutcomeKind::Failed => self.failed += 1,
            OutcomeKind::Skipped => self.skipped += 1,
            OutcomeKind::TimedOut => self.timed_out += 1,
            OutcomeKind::Errored => self.errored += 1,
        }
    }

    /// Total count across all kinds.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.skipped + self.timed_out + self.errored
    }
}

/// Outcome counts for one category.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    /// The category.
    pub category: Category,
    /// Outcome counts within it.
    pub counts: KindCounts,
}

/// The finalized report for one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Per-test results, ordered by id.
    pub results: Vec<TestResult>,
    /// Aggregate outcome counts.
    pub totals: KindCounts,
    /// Per-category outcome counts.
    pub categories: Vec<CategorySummary>,
    /// Fraction of executed tests that passed, excluding skips (a
    /// backend is not penalized for declared non-support).
    pub pass_rate: f64,
    /// Wall-clock duration of the whole run in milliseconds.
    pub wall_ms: u64,
    /// Total teardown failures swallowed across the run.
    pub cleanup_warnings: usize,
}

impl RunReport {
    /// Tests whose outcome counts against the exit code.
    #[must_use]
    pub const fn defects(&self) -> usize {
        self.totals.failed + self.totals.errored
    }

    /// Whether the run is considered successful.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.defects() == 0
    }

    /// Every non-passed result, for detail rendering.
    pub fn non_passed(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| r.outcome.kind() != OutcomeKind::Passed)
    }
}

/// Thread-safe sink the scheduler's workers record into.
#[derive(Debug)]
pub struct ReportSink {
    results: Mutex<Vec<TestResult>>,
    started: Instant,
}

impl Default for ReportSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportSink {
    /// Creates an empty sink; the run clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self { results: Mutex::new(Vec::new()), started: Instant::now() }
    }

    /// Records one result. Called concurrently by workers.
    pub fn record(&self, result: TestResult) {
        self.results.lock().expect("poisoned").push(result);
    }

    /// Number of results recorded so far.
    #[must_use]
    pub fn recorded(&self) -> usize {
        self.results.lock().expect("poisoned").len()
    }

    /// Produces the run report. Only meaningful after every dispatched
    /// unit has completed.
    #[must_use]
    pub fn finalize(&self) -> RunReport {
        let mut results = self.results.lock().expect("poisoned").clone();
        results.sort_by(|a, b| a.id.cmp(&b.id));

        let mut totals = KindCounts::default();
        let mut by_category: BTreeMap<Category, KindCounts> = BTreeMap::new();
        let mut cleanup_warnings = 0;
        for result in &results {
            totals.record(result.outcome.kind());
            by_category.entry(result.category).or_default().record(result.outcome.kind());
            cleanup_warnings += result.cleanup_warnings;
        }

        let executed = totals.total() - totals.skipped;
        let pass_rate =
            if executed == 0 { 1.0 } else { totals.passed as f64 / executed as f64 };

        RunReport {
            results,
            totals,
            categories: by_category
                .into_iter()
                .map(|(category, counts)| CategorySummary { category, counts })
                .collect(),
            pass_rate,
            wall_ms: self.started.elapsed().as_millis() as u64,
            cleanup_warnings,
        }
    }
}
