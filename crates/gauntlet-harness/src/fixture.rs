// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! Fixture management: bucket names and scoped-bucket lifecycle.
//!
//! Every test runs inside exactly one scoped bucket. The lifecycle is
//! strict and non-reentrant: create bucket → run body → tear down →
//! classify. Teardown runs on every exit path — normal return, error,
//! panic, deadline cancellation — under its own grace deadline so a test
//! that burned its whole budget cannot starve its cleanup.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use gauntlet_client::StorageClient;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::classify::RawResult;
use crate::registry::TestFuture;

/// Generates bucket names that are unique for the lifetime of this namer
/// and valid under S3 naming constraints.
///
/// Uniqueness is belt-and-braces: a high-entropy suffix plus a run-local
/// set that rejects the (practically impossible) duplicate, so concurrent
/// callers can never be handed the same name.
#[derive(Debug)]
pub struct BucketNamer {
    prefix: String,
    issued: DashSet<String>,
}

impl BucketNamer {
    /// Creates a namer for the given prefix.
    ///
    /// The prefix must already satisfy `RunConfig` validation: lowercase,
    /// at most 37 characters, so prefix + suffix stays within the 63
    /// character bucket-name limit.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), issued: DashSet::new() }
    }

    /// Returns a fresh bucket name.
    #[must_use]
    pub fn next(&self) -> String {
        loop {
            let mut suffix = Uuid::new_v4().simple().to_string();
            suffix.truncate(12);
            let name = format!("{}-{}", self.prefix, suffix);
            if self.issued.insert(name.clone()) {
                return name;
            }
        }
    }

    /// Number of names issued so far.
    #[must_use]
    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }
}

/// The result of running a body inside a scoped bucket.
#[derive(Debug)]
pub struct ScopedRun {
    /// What the body did, before classification.
    pub raw: RawResult,
    /// Number of teardown operations that failed and were swallowed.
    pub cleanup_warnings: usize,
}

/// Creates `bucket`, runs `body` against it under `deadline`, and tears
/// the bucket down on every exit path.
///
/// The body runs in its own task so a panic is contained and a blown
/// deadline can be cancelled without losing the teardown. If bucket
/// creation itself fails the body never runs and the failure is surfaced
/// as [`RawResult::FixtureFailed`].
///
/// Teardown failures are logged and counted, never propagated: a cleanup
/// problem after a successful test must not flip a pass into a failure.
pub async fn with_scoped_bucket(
    client: Arc<dyn StorageClient>,
    bucket: String,
    deadline: Duration,
    cleanup_grace: Duration,
    body: TestFuture,
) -> ScopedRun {
    if let Err(err) = client.create_bucket(&bucket).await {
        warn!(bucket = %bucket, error = %err, "fixture bucket creation failed");
        return ScopedRun { raw: RawResult::FixtureFailed(err), cleanup_warnings: 0 };
    }
    debug!(bucket = %bucket, "fixture bucket created");

    let mut handle = tokio::task::spawn(body);
    let raw = match tokio::time::timeout(deadline, &mut handle).await {
        Ok(Ok(result)) => RawResult::Completed(result),
        Ok(Err(join_err)) => {
            if join_err.is_panic() {
                RawResult::Panicked(panic_message(join_err.into_panic()))
            } else {
                // The runtime is shutting down; report as a cancelled body.
                RawResult::Completed(Err(gauntlet_core::Error::Fixture(
                    "test body was cancelled".to_string(),
                )))
            }
        }
        Err(_elapsed) => {
            handle.abort();
            RawResult::DeadlineExceeded
        }
    };

    let cleanup_warnings =
        match tokio::time::timeout(cleanup_grace, cleanup_bucket(client.as_ref(), &bucket)).await {
            Ok(warnings) => warnings,
            Err(_elapsed) => {
                warn!(bucket = %bucket, "fixture teardown exceeded its grace period");
                1
            }
        };

    ScopedRun { raw, cleanup_warnings }
}

/// Best-effort teardown: delete all object versions and delete markers,
/// then the bucket itself. Returns the number of swallowed failures.
pub async fn cleanup_bucket(client: &dyn StorageClient, bucket: &str) -> usize {
    let mut warnings = 0;

    match client.list_object_versions(bucket).await {
        Ok(entries) => {
            for entry in entries {
                if let Err(err) =
                    client.delete_object(bucket, &entry.key, entry.version_id.as_deref()).await
                {
                    warn!(
                        bucket = %bucket,
                        key = %entry.key,
                        error = %err,
                        "failed to delete object version during teardown"
                    );
                    warnings += 1;
                }
            }
        }
        Err(err) if err.code() == Some("NoSuchBucket") => {
            // The test deleted its own bucket; nothing to tear down.
            return warnings;
        }
        Err(err) => {
            // Backends without versioning support still need draining.
            debug!(bucket = %bucket, error = %err, "version listing failed, falling back");
            match client.list_objects(bucket, None).await {
                Ok(objects) => {
                    for object in objects {
                        if let Err(err) = client.delete_object(bucket, &object.key, None).await {
                            warn!(
                                bucket = %bucket,
                                key = %object.key,
                                error = %err,
                                "failed to delete object during teardown"
                            );
                            warnings += 1;
                        }
                    }
                }
                Err(err) if err.code() == Some("NoSuchBucket") => return warnings,
                Err(err) => {
                    warn!(bucket = %bucket, error = %err, "failed to list bucket during teardown");
                    warnings += 1;
                }
            }
        }
    }

    if let Err(err) = client.delete_bucket(bucket).await {
        if err.code() != Some("NoSuchBucket") {
            warn!(bucket = %bucket, error = %err, "failed to delete fixture bucket");
            warnings += 1;
        }
    }

    warnings
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_carry_prefix_and_fit_limits() {
        let namer = BucketNamer::new("gauntlet");
        let name = namer.next();
        assert!(name.starts_with("gauntlet-"));
        assert!(name.len() <= 63);
        assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn names_are_unique_sequentially() {
        let namer = BucketNamer::new("gauntlet");
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(namer.next()));
        }
        assert_eq!(namer.issued_count(), 1000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn names_are_unique_under_concurrency() {
        let namer = Arc::new(BucketNamer::new("gauntlet"));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let namer = Arc::clone(&namer);
            handles.push(tokio::spawn(async move {
                let mut names = Vec::with_capacity(625);
                for _ in 0..625 {
                    names.push(namer.next());
                }
                names
            }));
        }

        let mut seen = std::collections::HashSet::new();
        for handle in handles {
            for name in handle.await.unwrap() {
                assert!(seen.insert(name), "duplicate bucket name generated");
            }
        }
        // 16 tasks x 625 names = 10,000 generations, all distinct.
        assert_eq!(seen.len(), 10_000);
    }
}
