// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! Object listing tests.

use bytes::Bytes;
use gauntlet_client::StorageClient;
use gauntlet_core::{check, check_eq, Category, Result};
use gauntlet_harness::{TestCase, TestContext, TestRegistry};

/// Registers the listing tests.
pub fn register(registry: &mut TestRegistry) {
    registry.register(TestCase::new("list/empty_bucket", Category::List, empty_bucket));
    registry.register(TestCase::new("list/all_keys_sorted", Category::List, all_keys_sorted));
    registry.register(TestCase::new("list/prefix_filter", Category::List, prefix_filter));
    registry.register(TestCase::new("list/reflects_deletes", Category::List, reflects_deletes));
    registry.register(TestCase::new("list/many_keys", Category::List, many_keys).slow());
}

async fn empty_bucket(ctx: TestContext) -> Result<()> {
    let listed = ctx.client.list_objects(&ctx.bucket, None).await?;
    check!(listed.is_empty(), "fresh bucket should list no objects, got {}", listed.len());
    Ok(())
}

async fn all_keys_sorted(ctx: TestContext) -> Result<()> {
    for key in ["cherry", "apple", "banana"] {
        ctx.client.put_object(&ctx.bucket, key, Bytes::from_static(b"x")).await?;
    }

    let listed = ctx.client.list_objects(&ctx.bucket, None).await?;
    let keys: Vec<&str> = listed.iter().map(|o| o.key.as_str()).collect();
    check_eq!(keys, ["apple", "banana", "cherry"], "keys in lexicographic order");
    Ok(())
}

async fn prefix_filter(ctx: TestContext) -> Result<()> {
    for key in ["logs/a", "logs/b", "data/a"] {
        ctx.client.put_object(&ctx.bucket, key, Bytes::from_static(b"x")).await?;
    }

    let listed = ctx.client.list_objects(&ctx.bucket, Some("logs/")).await?;
    check_eq!(listed.len(), 2, "objects under logs/ prefix");
    check!(
        listed.iter().all(|o| o.key.starts_with("logs/")),
        "prefix listing leaked keys outside the prefix"
    );

    let listed = ctx.client.list_objects(&ctx.bucket, Some("nothing/")).await?;
    check!(listed.is_empty(), "unmatched prefix should list nothing");
    Ok(())
}

async fn reflects_deletes(ctx: TestContext) -> Result<()> {
    ctx.client.put_object(&ctx.bucket, "keep", Bytes::from_static(b"x")).await?;
    ctx.client.put_object(&ctx.bucket, "drop", Bytes::from_static(b"x")).await?;
    ctx.client.delete_object(&ctx.bucket, "drop", None).await?;

    let listed = ctx.client.list_objects(&ctx.bucket, None).await?;
    let keys: Vec<&str> = listed.iter().map(|o| o.key.as_str()).collect();
    check_eq!(keys, ["keep"], "listing after delete");
    Ok(())
}

/// Enough keys to force the client through at least two listing pages on
/// backends with a 1000-key page size is too slow for every run; 64 keys
/// still exercises ordering and completeness.
async fn many_keys(ctx: TestContext) -> Result<()> {
    let mut expected = Vec::new();
    for i in 0..64 {
        let key = format!("bulk/{i:04}");
        ctx.client.put_object(&ctx.bucket, &key, Bytes::from_static(b"x")).await?;
        expected.push(key);
    }

    let listed = ctx.client.list_objects(&ctx.bucket, Some("bulk/")).await?;
    let keys: Vec<&str> = listed.iter().map(|o| o.key.as_str()).collect();
    check_eq!(keys.len(), expected.len(), "bulk listing count");
    check_eq!(keys, expected.iter().map(String::as_str).collect::<Vec<_>>(), "bulk listing order");
    Ok(())
}
