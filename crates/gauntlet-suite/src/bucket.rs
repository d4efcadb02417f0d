// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! Bucket lifecycle tests.

use bytes::Bytes;
use gauntlet_client::StorageClient;
use gauntlet_core::{check, Category, Result};
use gauntlet_harness::{TestCase, TestContext, TestRegistry};

use crate::expect_error_code;

/// Registers the bucket tests.
pub fn register(registry: &mut TestRegistry) {
    registry.register(TestCase::new("bucket/head_exists", Category::Bucket, head_exists));
    registry.register(TestCase::new("bucket/appears_in_listing", Category::Bucket, appears_in_listing));
    registry.register(TestCase::new("bucket/create_duplicate", Category::Bucket, create_duplicate));
    registry.register(TestCase::new("bucket/delete_non_empty", Category::Bucket, delete_non_empty));
    registry.register(TestCase::new("bucket/delete_missing", Category::Bucket, delete_missing));
    registry.register(TestCase::new("bucket/invalid_names", Category::Bucket, invalid_names));
}

/// The scoped bucket exists; an absent sibling does not.
async fn head_exists(ctx: TestContext) -> Result<()> {
    check!(ctx.client.head_bucket(&ctx.bucket).await?, "fixture bucket should exist");

    let absent = format!("{}-absent", ctx.bucket);
    check!(
        !ctx.client.head_bucket(&absent).await?,
        "bucket {absent} should not exist"
    );
    Ok(())
}

async fn appears_in_listing(ctx: TestContext) -> Result<()> {
    let buckets = ctx.client.list_buckets().await?;
    check!(
        buckets.contains(&ctx.bucket),
        "bucket {} missing from listing of {} buckets",
        ctx.bucket,
        buckets.len()
    );
    Ok(())
}

/// Re-creating an existing bucket must be refused for the same name.
/// AWS returns `BucketAlreadyOwnedByYou` for the owner; other backends
/// answer `BucketAlreadyExists`. Both are conforming.
async fn create_duplicate(ctx: TestContext) -> Result<()> {
    expect_error_code(
        ctx.client.create_bucket(&ctx.bucket).await,
        &["BucketAlreadyOwnedByYou", "BucketAlreadyExists"],
        "duplicate create",
    )
}

async fn delete_non_empty(ctx: TestContext) -> Result<()> {
    ctx.client.put_object(&ctx.bucket, "blocker", Bytes::from_static(b"x")).await?;
    expect_error_code(
        ctx.client.delete_bucket(&ctx.bucket).await,
        &["BucketNotEmpty"],
        "delete of non-empty bucket",
    )
}

async fn delete_missing(ctx: TestContext) -> Result<()> {
    let absent = format!("{}-absent", ctx.bucket);
    expect_error_code(
        ctx.client.delete_bucket(&absent).await,
        &["NoSuchBucket"],
        "delete of missing bucket",
    )
}

/// Names outside the S3 grammar must be rejected at creation time.
async fn invalid_names(ctx: TestContext) -> Result<()> {
    for name in ["ab", "UPPERCASE-BUCKET", "ends-with-hyphen-", "has_underscore"] {
        expect_error_code(
            ctx.client.create_bucket(name).await,
            &["InvalidBucketName", "InvalidArgument"],
            &format!("create with invalid name {name:?}"),
        )?;
    }
    let too_long = "a".repeat(64);
    expect_error_code(
        ctx.client.create_bucket(&too_long).await,
        &["InvalidBucketName", "InvalidArgument"],
        "create with 64-character name",
    )
}
