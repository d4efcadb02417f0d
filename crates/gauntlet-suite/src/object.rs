// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! Single-object operation tests: put, get, head, delete, copy.

use bytes::Bytes;
use gauntlet_client::StorageClient;
use gauntlet_core::{check, check_eq, Category, Result};
use gauntlet_harness::{TestCase, TestContext, TestRegistry};

use crate::{expect_error_code, random_bytes};

/// Registers the object tests.
pub fn register(registry: &mut TestRegistry) {
    registry.register(TestCase::new("object/put_get_roundtrip", Category::Object, put_get_roundtrip));
    registry.register(TestCase::new("object/empty_object", Category::Object, empty_object));
    registry.register(TestCase::new("object/overwrite", Category::Object, overwrite));
    registry.register(TestCase::new("object/get_missing", Category::Object, get_missing));
    registry.register(TestCase::new("object/head_metadata", Category::Object, head_metadata));
    registry.register(TestCase::new("object/delete_missing_is_ok", Category::Object, delete_missing_is_ok));
    registry.register(TestCase::new("object/copy_within_bucket", Category::Object, copy_within_bucket));
    registry.register(TestCase::new("object/nested_keys", Category::Object, nested_keys));
}

async fn put_get_roundtrip(ctx: TestContext) -> Result<()> {
    let data = random_bytes(64 * 1024);
    let put = ctx.client.put_object(&ctx.bucket, "roundtrip", data.clone()).await?;
    check!(put.etag.is_some(), "put response should carry an ETag");

    let got = ctx.client.get_object(&ctx.bucket, "roundtrip", None).await?;
    check_eq!(got.body, data, "object content after roundtrip");
    check_eq!(got.etag, put.etag, "ETag between put and get");
    Ok(())
}

async fn empty_object(ctx: TestContext) -> Result<()> {
    ctx.client.put_object(&ctx.bucket, "empty", Bytes::new()).await?;
    let got = ctx.client.get_object(&ctx.bucket, "empty", None).await?;
    check_eq!(got.body.len(), 0, "empty object length");
    Ok(())
}

async fn overwrite(ctx: TestContext) -> Result<()> {
    ctx.client.put_object(&ctx.bucket, "key", Bytes::from_static(b"first")).await?;
    ctx.client.put_object(&ctx.bucket, "key", Bytes::from_static(b"second")).await?;

    let got = ctx.client.get_object(&ctx.bucket, "key", None).await?;
    check_eq!(&got.body[..], b"second", "content after overwrite");
    Ok(())
}

async fn get_missing(ctx: TestContext) -> Result<()> {
    expect_error_code(
        ctx.client.get_object(&ctx.bucket, "never-written", None).await,
        &["NoSuchKey"],
        "get of missing key",
    )
}

async fn head_metadata(ctx: TestContext) -> Result<()> {
    let data = random_bytes(4096);
    let put = ctx.client.put_object(&ctx.bucket, "meta", data).await?;

    let info = ctx.client.head_object(&ctx.bucket, "meta").await?;
    check_eq!(info.size, 4096u64, "size reported by head");
    check_eq!(info.etag, put.etag, "ETag between put and head");
    Ok(())
}

/// Deleting a key that does not exist is not an error in an unversioned
/// bucket.
async fn delete_missing_is_ok(ctx: TestContext) -> Result<()> {
    ctx.client.delete_object(&ctx.bucket, "never-written", None).await?;
    Ok(())
}

async fn copy_within_bucket(ctx: TestContext) -> Result<()> {
    let data = random_bytes(16 * 1024);
    ctx.client.put_object(&ctx.bucket, "source", data.clone()).await?;
    ctx.client.copy_object(&ctx.bucket, "source", &ctx.bucket, "copy").await?;

    let got = ctx.client.get_object(&ctx.bucket, "copy", None).await?;
    check_eq!(got.body, data, "copied object content");

    // The source is untouched.
    let src = ctx.client.get_object(&ctx.bucket, "source", None).await?;
    check_eq!(src.body, data, "source content after copy");
    Ok(())
}

/// Keys with path separators and punctuation are plain names, not
/// directories.
async fn nested_keys(ctx: TestContext) -> Result<()> {
    let keys = ["logs/2025/08/06/run.log", "data.v2+edge=yes", "a/b/c"];
    for key in keys {
        ctx.client.put_object(&ctx.bucket, key, Bytes::from_static(b"payload")).await?;
    }
    for key in keys {
        let got = ctx.client.get_object(&ctx.bucket, key, None).await?;
        check_eq!(&got.body[..], b"payload", "content for key {key:?}");
    }
    // No phantom "directory" objects appear.
    let listed = ctx.client.list_objects(&ctx.bucket, None).await?;
    check_eq!(listed.len(), keys.len(), "listing count for nested keys");
    Ok(())
}
