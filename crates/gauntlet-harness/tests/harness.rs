// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end harness tests against the in-memory backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use gauntlet_client::memory::InjectedFailure;
use gauntlet_client::{MemoryStorageClient, StorageClient};
use gauntlet_core::{Category, Error, OutcomeKind, RunConfig};
use gauntlet_harness::{Scheduler, TestCase};

fn fast_config() -> RunConfig {
    let mut config = RunConfig::default();
    config.scheduler.concurrency = 2;
    config.scheduler.per_test_timeout_ms = 100;
    config.scheduler.cleanup_grace_ms = 1_000;
    config
}

fn kinds(report: &gauntlet_harness::RunReport) -> Vec<OutcomeKind> {
    let mut kinds: Vec<OutcomeKind> =
        report.results.iter().map(|r| r.outcome.kind()).collect();
    kinds.sort_by_key(|k| k.as_str());
    kinds
}

/// The spec's canonical scenario: one passing test, one raising a
/// configured not-implemented code, one sleeping past the deadline, run
/// with concurrency 2 and a 100ms timeout.
#[tokio::test]
async fn mixed_run_classifies_each_outcome_once() {
    let client = Arc::new(MemoryStorageClient::new());
    let scheduler = Scheduler::new(fast_config(), client.clone());

    let cases = vec![
        TestCase::new("object/roundtrip", Category::Object, |ctx| async move {
            ctx.client.put_object(&ctx.bucket, "k", Bytes::from_static(b"data")).await?;
            let got = ctx.client.get_object(&ctx.bucket, "k", None).await?;
            gauntlet_core::check_eq!(&got.body[..], b"data", "object content");
            Ok(())
        }),
        TestCase::new("versioning/unsupported", Category::Versioning, |_ctx| async {
            Err(Error::api("PutBucketVersioning", "NotImplemented", "not supported"))
        }),
        TestCase::new("object/sleeper", Category::Object, |_ctx| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .slow(),
    ];

    let report = scheduler.run(cases).await.unwrap();

    assert_eq!(report.totals.passed, 1);
    assert_eq!(report.totals.skipped, 1);
    assert_eq!(report.totals.timed_out, 1);
    assert_eq!(report.totals.failed, 0);
    assert_eq!(report.totals.errored, 0);

    // Zero fixture leaks: every bucket was torn down, including the
    // timed-out test's.
    assert_eq!(client.bucket_count(), 0);
    assert_eq!(report.cleanup_warnings, 0);

    // A timeout is not a defect; the run exits clean.
    assert!(report.success());
}

#[tokio::test]
async fn failing_body_tears_down_exactly_once() {
    let client = Arc::new(MemoryStorageClient::new());
    let scheduler = Scheduler::new(fast_config(), client.clone());

    let cases = vec![TestCase::new("object/fails", Category::Object, |ctx| async move {
        ctx.client.put_object(&ctx.bucket, "orphan", Bytes::from_static(b"x")).await?;
        Err(Error::assertion("deliberate failure"))
    })];

    let report = scheduler.run(cases).await.unwrap();

    assert_eq!(report.totals.failed, 1);
    assert_eq!(client.create_bucket_calls(), 1);
    assert_eq!(client.delete_bucket_calls(), 1);
    assert_eq!(client.bucket_count(), 0);
}

#[tokio::test]
async fn panicking_body_is_failed_and_torn_down_exactly_once() {
    let client = Arc::new(MemoryStorageClient::new());
    let scheduler = Scheduler::new(fast_config(), client.clone());

    let cases = vec![TestCase::new("object/panics", Category::Object, |ctx| async move {
        ctx.client.put_object(&ctx.bucket, "k", Bytes::from_static(b"x")).await?;
        panic!("deliberate panic");
    })];

    let report = scheduler.run(cases).await.unwrap();

    assert_eq!(report.totals.failed, 1);
    let result = &report.results[0];
    assert!(result.outcome.detail().unwrap().contains("deliberate panic"));

    // The panic was contained: teardown ran exactly once and the run
    // completed normally.
    assert_eq!(client.delete_bucket_calls(), 1);
    assert_eq!(client.bucket_count(), 0);
}

#[tokio::test]
async fn timed_out_body_is_recorded_and_cleaned_up() {
    let client = Arc::new(MemoryStorageClient::new());
    let scheduler = Scheduler::new(fast_config(), client.clone());

    let cases = vec![TestCase::new("object/hangs", Category::Object, |ctx| async move {
        ctx.client.put_object(&ctx.bucket, "k", Bytes::from_static(b"x")).await?;
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    })];

    let report = scheduler.run(cases).await.unwrap();

    assert_eq!(report.totals.timed_out, 1);
    assert_eq!(report.totals.failed, 0);
    // Teardown still ran under its own grace period.
    assert_eq!(client.bucket_count(), 0);
    assert_eq!(client.delete_bucket_calls(), 1);
}

#[tokio::test]
async fn unsupported_code_skips_from_any_operation() {
    let client = Arc::new(MemoryStorageClient::new());
    let mut config = fast_config();
    config.classifier.unsupported_codes.push("InvalidRequest".to_string());
    let scheduler = Scheduler::new(config, client.clone());

    let cases = vec![
        TestCase::new("tagging/unsupported", Category::Tagging, |_ctx| async {
            Err(Error::api("PutObjectTagging", "NotImplemented", ""))
        }),
        TestCase::new("versioning/opted-in", Category::Versioning, |_ctx| async {
            Err(Error::api("PutBucketVersioning", "InvalidRequest", ""))
        }),
    ];

    let report = scheduler.run(cases).await.unwrap();
    assert_eq!(report.totals.skipped, 2);
    assert_eq!(report.totals.failed, 0);
}

#[tokio::test]
async fn transport_errors_are_recorded_as_infrastructure() {
    let client = Arc::new(MemoryStorageClient::new());
    let scheduler = Scheduler::new(fast_config(), client.clone());

    let cases = vec![TestCase::new("object/unreachable", Category::Object, |_ctx| async {
        Err(Error::transport("GetObject", "connection refused"))
    })];

    let report = scheduler.run(cases).await.unwrap();
    assert_eq!(report.totals.errored, 1);
    assert!(!report.success());
}

#[tokio::test]
async fn fixture_creation_failure_short_circuits() {
    let client = Arc::new(MemoryStorageClient::new());
    let scheduler = Scheduler::new(fast_config(), client.clone());

    let body_ran = Arc::new(AtomicUsize::new(0));
    let observer = Arc::clone(&body_ran);

    client.fail_create_bucket(Some(InjectedFailure::Api("AccessDenied".into())));
    let cases = vec![TestCase::new("bucket/never-runs", Category::Bucket, move |_ctx| {
        let observer = Arc::clone(&observer);
        async move {
            observer.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })];

    let report = scheduler.run(cases).await.unwrap();
    assert_eq!(report.totals.failed, 1);
    assert_eq!(body_ran.load(Ordering::SeqCst), 0, "body must not run without a fixture");
    // Nothing was created, so nothing is torn down.
    assert_eq!(client.delete_bucket_calls(), 0);

    // A transport-level creation failure is infrastructure trouble.
    client.fail_create_bucket(Some(InjectedFailure::Transport));
    let scheduler = Scheduler::new(fast_config(), client.clone());
    let cases = vec![TestCase::new("bucket/unreachable", Category::Bucket, |_ctx| async {
        Ok(())
    })];
    let report = scheduler.run(cases).await.unwrap();
    assert_eq!(report.totals.errored, 1);
}

#[tokio::test]
async fn versioned_fixture_is_fully_drained() {
    let client = Arc::new(MemoryStorageClient::new());
    let scheduler = Scheduler::new(fast_config(), client.clone());

    let cases = vec![TestCase::new("versioning/markers", Category::Versioning, |ctx| async move {
        ctx.client.set_bucket_versioning(&ctx.bucket, true).await?;
        ctx.client.put_object(&ctx.bucket, "k", Bytes::from_static(b"v1")).await?;
        ctx.client.put_object(&ctx.bucket, "k", Bytes::from_static(b"v2")).await?;
        // Leaves a delete marker plus two versions behind.
        ctx.client.delete_object(&ctx.bucket, "k", None).await?;
        Ok(())
    })];

    let report = scheduler.run(cases).await.unwrap();
    assert_eq!(report.totals.passed, 1);
    assert_eq!(report.cleanup_warnings, 0);
    assert_eq!(client.bucket_count(), 0);
}

#[tokio::test]
async fn body_deleting_its_own_bucket_is_not_a_warning() {
    let client = Arc::new(MemoryStorageClient::new());
    let scheduler = Scheduler::new(fast_config(), client.clone());

    let cases = vec![TestCase::new("bucket/self-delete", Category::Bucket, |ctx| async move {
        ctx.client.delete_bucket(&ctx.bucket).await?;
        Ok(())
    })];

    let report = scheduler.run(cases).await.unwrap();
    assert_eq!(report.totals.passed, 1);
    assert_eq!(report.cleanup_warnings, 0);
}

#[tokio::test]
async fn one_failure_does_not_disturb_other_workers() {
    let client = Arc::new(MemoryStorageClient::new());
    let mut config = fast_config();
    config.scheduler.concurrency = 4;
    config.scheduler.per_test_timeout_ms = 5_000;
    let scheduler = Scheduler::new(config, client.clone());

    let mut cases = vec![TestCase::new("object/bad", Category::Object, |_ctx| async {
        Err(Error::assertion("broken"))
    })];
    for i in 0..8 {
        cases.push(TestCase::new(
            format!("object/ok-{i}"),
            Category::Object,
            |ctx| async move {
                ctx.client.put_object(&ctx.bucket, "k", Bytes::from_static(b"x")).await?;
                Ok(())
            },
        ));
    }

    let report = scheduler.run(cases).await.unwrap();
    assert_eq!(report.totals.total(), 9);
    assert_eq!(report.totals.passed, 8);
    assert_eq!(report.totals.failed, 1);
    assert_eq!(client.bucket_count(), 0);
}

#[tokio::test]
async fn repeated_runs_yield_the_same_outcome_multiset() {
    let build_cases = || {
        vec![
            TestCase::new("object/ok", Category::Object, |ctx| async move {
                ctx.client.put_object(&ctx.bucket, "k", Bytes::from_static(b"x")).await?;
                Ok(())
            }),
            TestCase::new("object/bad", Category::Object, |_ctx| async {
                Err(Error::assertion("always fails"))
            }),
            TestCase::new("tagging/skip", Category::Tagging, |_ctx| async {
                Err(Error::api("PutObjectTagging", "NotImplemented", ""))
            }),
        ]
    };

    let mut config = fast_config();
    config.scheduler.per_test_timeout_ms = 5_000;

    let first = Scheduler::new(config.clone(), Arc::new(MemoryStorageClient::new()))
        .run(build_cases())
        .await
        .unwrap();
    let second = Scheduler::new(config, Arc::new(MemoryStorageClient::new()))
        .run(build_cases())
        .await
        .unwrap();

    assert_eq!(kinds(&first), kinds(&second));
}

#[tokio::test]
async fn shutdown_stops_dispatch_and_finalizes() {
    let client = Arc::new(MemoryStorageClient::new());
    let mut config = fast_config();
    config.scheduler.concurrency = 1;
    config.scheduler.per_test_timeout_ms = 5_000;
    let scheduler = Scheduler::new(config, client.clone());
    let handle = scheduler.shutdown_handle();

    let cases: Vec<TestCase> = (0..10)
        .map(|i| {
            TestCase::new(format!("object/slow-{i}"), Category::Object, |_ctx| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(())
            })
        })
        .collect();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        handle.shutdown();
    });

    let report = scheduler.run(cases).await.unwrap();

    // Dispatch stopped early, in-flight units finished their cleanup.
    assert!(report.totals.total() < 10, "expected an interrupted run");
    assert!(report.totals.total() >= 1);
    assert_eq!(client.bucket_count(), 0);
}
