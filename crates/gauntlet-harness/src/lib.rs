// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! Test execution harness for the Gauntlet compatibility suite.
//!
//! The harness is the machinery every registered test runs inside:
//!
//! - [`registry`] — explicit test registration and selection
//! - [`fixture`] — collision-free bucket names and scoped-bucket
//!   lifecycle with guaranteed teardown
//! - [`scheduler`] — bounded-concurrency execution with per-test
//!   deadlines and failure isolation
//! - [`classify`] — raw result to outcome mapping, including the
//!   unsupported-feature skip rule
//! - [`report`] — thread-safe result collection and run aggregation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classify;
pub mod fixture;
pub mod registry;
pub mod report;
pub mod scheduler;

pub use classify::{OutcomeClassifier, RawResult};
pub use fixture::{cleanup_bucket, with_scoped_bucket, BucketNamer, ScopedRun};
pub use registry::{Selection, TestCase, TestContext, TestFuture, TestRegistry};
pub use report::{CategorySummary, KindCounts, ReportSink, RunReport, TestResult};
pub use scheduler::{Scheduler, ShutdownHandle};
