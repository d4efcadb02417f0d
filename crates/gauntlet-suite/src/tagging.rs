// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! Object tagging tests.

use bytes::Bytes;
use gauntlet_client::StorageClient;
use gauntlet_core::{check, check_eq, Category, Result};
use gauntlet_harness::{TestCase, TestContext, TestRegistry};

use crate::expect_error_code;

/// Registers the tagging tests.
pub fn register(registry: &mut TestRegistry) {
    registry.register(TestCase::new("tagging/roundtrip", Category::Tagging, roundtrip));
    registry.register(TestCase::new("tagging/replace", Category::Tagging, replace));
    registry.register(TestCase::new("tagging/missing_key", Category::Tagging, missing_key));
}

fn tags(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

async fn roundtrip(ctx: TestContext) -> Result<()> {
    ctx.client.put_object(&ctx.bucket, "tagged", Bytes::from_static(b"x")).await?;

    let wanted = tags(&[("env", "test"), ("owner", "gauntlet")]);
    ctx.client.put_object_tagging(&ctx.bucket, "tagged", &wanted).await?;

    let mut got = ctx.client.get_object_tagging(&ctx.bucket, "tagged").await?;
    got.sort();
    let mut expected = wanted;
    expected.sort();
    check_eq!(got, expected, "tag set after roundtrip");
    Ok(())
}

/// Tag replacement is total: the new set fully supersedes the old one.
async fn replace(ctx: TestContext) -> Result<()> {
    ctx.client.put_object(&ctx.bucket, "tagged", Bytes::from_static(b"x")).await?;
    ctx.client
        .put_object_tagging(&ctx.bucket, "tagged", &tags(&[("a", "1"), ("b", "2")]))
        .await?;
    ctx.client.put_object_tagging(&ctx.bucket, "tagged", &tags(&[("c", "3")])).await?;

    let got = ctx.client.get_object_tagging(&ctx.bucket, "tagged").await?;
    check_eq!(got, tags(&[("c", "3")]), "tag set after replacement");
    check!(
        !got.iter().any(|(k, _)| k == "a" || k == "b"),
        "replaced tags must not survive"
    );
    Ok(())
}

async fn missing_key(ctx: TestContext) -> Result<()> {
    expect_error_code(
        ctx.client.get_object_tagging(&ctx.bucket, "never-written").await,
        &["NoSuchKey"],
        "tagging of missing key",
    )
}
