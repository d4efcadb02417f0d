// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! Bounded-concurrency test execution.
//!
//! A semaphore caps how many tests run at once; each test is a spawned
//! unit that provisions its fixture, runs the body under the per-test
//! deadline, tears down, classifies, and records. One test's failure,
//! panic, or hang never aborts the run: the unit boundary converts
//! everything into an outcome. The report is finalized only after every
//! dispatched unit has been joined.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use gauntlet_client::StorageClient;
use gauntlet_core::{Error, OutcomeKind, Result, RunConfig};
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::classify::OutcomeClassifier;
use crate::fixture::{with_scoped_bucket, BucketNamer};
use crate::registry::{TestCase, TestContext};
use crate::report::{ReportSink, RunReport, TestResult};

/// Cancels a running scheduler from another task (e.g. a ctrl-c handler).
///
/// Cancellation stops dispatching new units; in-flight units run to their
/// cleanup point (bounded by their own deadlines) before the run returns.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Requests cancellation of the run. Effective even if requested
    /// before the run subscribes.
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }
}

/// Runs a set of test cases against a backend with bounded concurrency.
pub struct Scheduler {
    config: Arc<RunConfig>,
    client: Arc<dyn StorageClient>,
    shutdown_tx: watch::Sender<bool>,
}

impl Scheduler {
    /// Creates a scheduler for the given configuration and client.
    #[must_use]
    pub fn new(config: RunConfig, client: Arc<dyn StorageClient>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self { config: Arc::new(config), client, shutdown_tx }
    }

    /// Returns a handle that cancels the run when triggered.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle { tx: self.shutdown_tx.clone() }
    }

    /// Runs the given cases and produces the run report.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error — before any test is dispatched — when
    /// the configuration is invalid or the case list contains duplicate
    /// ids. Individual test failures never surface here; they are
    /// recorded as outcomes.
    pub async fn run(&self, mut cases: Vec<TestCase>) -> Result<RunReport> {
        self.config.validate()?;

        let mut seen = HashSet::new();
        for case in &cases {
            if !seen.insert(case.id.clone()) {
                return Err(Error::Config(format!("duplicate test id: {}", case.id)));
            }
        }

        // Dispatch slow tests first so they overlap with the rest of the
        // run instead of trailing it. Stable sort keeps registration
        // order within each class.
        cases.sort_by_key(|case| !case.slow);

        let concurrency = self.config.scheduler.concurrency;
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let namer = Arc::new(BucketNamer::new(&self.config.scheduler.bucket_prefix));
        let classifier = OutcomeClassifier::new(&self.config.classifier);
        let sink = Arc::new(ReportSink::new());
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let total = cases.len();
        info!(total, concurrency, "dispatching tests");

        let mut handles = Vec::with_capacity(total);
        for case in cases {
            if *shutdown_rx.borrow() {
                warn!("run cancelled, remaining tests not dispatched");
                break;
            }

            let permit = tokio::select! {
                permit = Arc::clone(&semaphore).acquire_owned() => {
                    match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    }
                }
                _ = shutdown_rx.changed() => {
                    warn!("run cancelled while waiting for a worker slot");
                    break;
                }
            };

            handles.push(tokio::spawn(run_unit(
                case,
                Arc::clone(&self.client),
                Arc::clone(&self.config),
                Arc::clone(&namer),
                classifier.clone(),
                Arc::clone(&sink),
                permit,
            )));
        }

        // Wait for every dispatched unit to reach its cleanup point. The
        // units themselves never panic (bodies run in their own task),
        // but a join error must not lose the rest of the report.
        for handle in handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "worker task failed to join");
            }
        }

        let report = sink.finalize();
        info!(
            passed = report.totals.passed,
            failed = report.totals.failed,
            skipped = report.totals.skipped,
            timed_out = report.totals.timed_out,
            errored = report.totals.errored,
            cleanup_warnings = report.cleanup_warnings,
            wall_ms = report.wall_ms,
            "run complete"
        );
        Ok(report)
    }
}

/// One unit of work: fixture → body → teardown → classify → record.
async fn run_unit(
    case: TestCase,
    client: Arc<dyn StorageClient>,
    config: Arc<RunConfig>,
    namer: Arc<BucketNamer>,
    classifier: OutcomeClassifier,
    sink: Arc<ReportSink>,
    permit: OwnedSemaphorePermit,
) {
    let _permit = permit;
    let started = Instant::now();

    let bucket = namer.next();
    debug!(test = %case.id, bucket = %bucket, "test starting");

    let ctx = TestContext {
        client: Arc::clone(&client),
        config: Arc::clone(&config),
        bucket: bucket.clone(),
    };
    let body = case.future(ctx);

    let scoped = with_scoped_bucket(
        client,
        bucket,
        config.scheduler.per_test_timeout(),
        config.scheduler.cleanup_grace(),
        body,
    )
    .await;

    let outcome = classifier.classify(&scoped.raw);
    let duration_ms = started.elapsed().as_millis() as u64;

    match outcome.kind() {
        OutcomeKind::Passed => {
            debug!(test = %case.id, duration_ms, "test passed");
        }
        OutcomeKind::Skipped => {
            info!(test = %case.id, code = outcome.detail().unwrap_or(""), "test skipped");
        }
        kind => {
            warn!(
                test = %case.id,
                outcome = %kind,
                detail = outcome.detail().unwrap_or(""),
                duration_ms,
                "test did not pass"
            );
        }
    }

    sink.record(TestResult {
        id: case.id,
        category: case.category,
        outcome,
        duration_ms,
        cleanup_warnings: scoped.cleanup_warnings,
    });
}

#[cfg(test)]
mod tests {
    use gauntlet_client::MemoryStorageClient;
    use gauntlet_core::Category;

    use super::*;

    fn scheduler(config: RunConfig) -> Scheduler {
        Scheduler::new(config, Arc::new(MemoryStorageClient::new()))
    }

    #[tokio::test]
    async fn rejects_duplicate_ids_before_dispatch() {
        let scheduler = scheduler(RunConfig::default());
        let cases = vec![
            TestCase::new("object/put", Category::Object, |_ctx| async { Ok(()) }),
            TestCase::new("object/put", Category::Object, |_ctx| async { Ok(()) }),
        ];

        let err = scheduler.run(cases).await.unwrap_err();
        assert!(err.to_string().contains("duplicate test id"));
    }

    #[tokio::test]
    async fn rejects_invalid_config_before_dispatch() {
        let mut config = RunConfig::default();
        config.scheduler.concurrency = 0;
        let scheduler = scheduler(config);

        let err = scheduler
            .run(vec![TestCase::new("object/put", Category::Object, |_ctx| async { Ok(()) })])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn empty_case_list_yields_empty_report() {
        let report = scheduler(RunConfig::default()).run(Vec::new()).await.unwrap();
        assert_eq!(report.totals.total(), 0);
        assert!(report.success());
    }
}
