// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! Bucket versioning tests.
//!
//! Versioning is optional surface on many backends; every body here
//! starts by enabling versioning, so a backend that answers
//! `NotImplemented` gets the whole category skipped rather than failed.

use bytes::Bytes;
use gauntlet_client::StorageClient;
use gauntlet_core::{check, check_eq, Category, Result};
use gauntlet_harness::{TestCase, TestContext, TestRegistry};

use crate::expect_error_code;

/// Registers the versioning tests.
pub fn register(registry: &mut TestRegistry) {
    registry.register(TestCase::new("versioning/distinct_versions", Category::Versioning, distinct_versions));
    registry.register(TestCase::new("versioning/get_specific_version", Category::Versioning, get_specific_version));
    registry.register(TestCase::new("versioning/delete_creates_marker", Category::Versioning, delete_creates_marker));
    registry.register(TestCase::new("versioning/remove_marker_restores", Category::Versioning, remove_marker_restores));
}

async fn distinct_versions(ctx: TestContext) -> Result<()> {
    ctx.client.set_bucket_versioning(&ctx.bucket, true).await?;

    let first = ctx.client.put_object(&ctx.bucket, "doc", Bytes::from_static(b"one")).await?;
    let second = ctx.client.put_object(&ctx.bucket, "doc", Bytes::from_static(b"two")).await?;

    let v1 = first.version_id;
    let v2 = second.version_id;
    check!(v1.is_some() && v2.is_some(), "puts in a versioned bucket must return version ids");
    check!(v1 != v2, "successive puts must produce distinct version ids");

    let versions = ctx.client.list_object_versions(&ctx.bucket).await?;
    check_eq!(versions.len(), 2, "version count after two puts");
    check_eq!(
        versions.iter().filter(|v| v.is_latest).count(),
        1,
        "exactly one latest version"
    );
    Ok(())
}

async fn get_specific_version(ctx: TestContext) -> Result<()> {
    ctx.client.set_bucket_versioning(&ctx.bucket, true).await?;

    let first = ctx.client.put_object(&ctx.bucket, "doc", Bytes::from_static(b"one")).await?;
    ctx.client.put_object(&ctx.bucket, "doc", Bytes::from_static(b"two")).await?;

    // Unqualified get returns the newest version.
    let latest = ctx.client.get_object(&ctx.bucket, "doc", None).await?;
    check_eq!(&latest.body[..], b"two", "latest content");

    // The old version stays addressable by id.
    let v1 = first.version_id.as_deref();
    let old = ctx.client.get_object(&ctx.bucket, "doc", v1).await?;
    check_eq!(&old.body[..], b"one", "content of first version");
    Ok(())
}

async fn delete_creates_marker(ctx: TestContext) -> Result<()> {
    ctx.client.set_bucket_versioning(&ctx.bucket, true).await?;
    ctx.client.put_object(&ctx.bucket, "doc", Bytes::from_static(b"data")).await?;

    let deleted = ctx.client.delete_object(&ctx.bucket, "doc", None).await?;
    check!(deleted.delete_marker, "unversioned delete in a versioned bucket must create a marker");

    // The key 404s even though the version is still there.
    expect_error_code(
        ctx.client.get_object(&ctx.bucket, "doc", None).await,
        &["NoSuchKey"],
        "get after delete marker",
    )?;

    let versions = ctx.client.list_object_versions(&ctx.bucket).await?;
    check_eq!(
        versions.iter().filter(|v| v.is_delete_marker).count(),
        1,
        "delete marker count"
    );
    check_eq!(versions.len(), 2, "version entries after marker");
    Ok(())
}

async fn remove_marker_restores(ctx: TestContext) -> Result<()> {
    ctx.client.set_bucket_versioning(&ctx.bucket, true).await?;
    ctx.client.put_object(&ctx.bucket, "doc", Bytes::from_static(b"data")).await?;

    let deleted = ctx.client.delete_object(&ctx.bucket, "doc", None).await?;
    let marker_id = deleted.version_id;
    check!(marker_id.is_some(), "delete marker must carry a version id");

    // Deleting the marker itself brings the object back.
    ctx.client.delete_object(&ctx.bucket, "doc", marker_id.as_deref()).await?;
    let restored = ctx.client.get_object(&ctx.bucket, "doc", None).await?;
    check_eq!(&restored.body[..], b"data", "content after marker removal");
    Ok(())
}
