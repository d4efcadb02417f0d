// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! Multipart upload tests.

use bytes::Bytes;
use gauntlet_client::{CompletedPartSpec, StorageClient};
use gauntlet_core::{check, check_eq, Category, Result};
use gauntlet_harness::{TestCase, TestContext, TestRegistry};

use crate::{expect_error_code, random_bytes};

/// Minimum part size accepted by S3 for all parts but the last.
const PART_SIZE: usize = 5 * 1024 * 1024;

/// Registers the multipart tests.
pub fn register(registry: &mut TestRegistry) {
    registry.register(TestCase::new("multipart/basic_upload", Category::Multipart, basic_upload).slow());
    registry.register(TestCase::new("multipart/abort_discards", Category::Multipart, abort_discards));
    registry.register(TestCase::new("multipart/out_of_order_rejected", Category::Multipart, out_of_order_rejected));
    registry.register(TestCase::new("multipart/unknown_upload_id", Category::Multipart, unknown_upload_id));
}

/// Two full-size parts plus a short tail, reassembled byte-for-byte.
async fn basic_upload(ctx: TestContext) -> Result<()> {
    let chunks = [random_bytes(PART_SIZE), random_bytes(PART_SIZE), random_bytes(1024)];

    let upload_id = ctx.client.create_multipart_upload(&ctx.bucket, "assembled").await?;

    let mut parts = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let part_number = (i + 1) as i32;
        let etag = ctx
            .client
            .upload_part(&ctx.bucket, "assembled", &upload_id, part_number, chunk.clone())
            .await?;
        parts.push(CompletedPartSpec { part_number, etag });
    }

    let completed = ctx
        .client
        .complete_multipart_upload(&ctx.bucket, "assembled", &upload_id, &parts)
        .await?;
    check!(completed.etag.is_some(), "completed upload should carry an ETag");

    let got = ctx.client.get_object(&ctx.bucket, "assembled", None).await?;
    let expected_len: usize = chunks.iter().map(Bytes::len).sum();
    check_eq!(got.body.len(), expected_len, "assembled object length");

    let mut expected = Vec::with_capacity(expected_len);
    for chunk in &chunks {
        expected.extend_from_slice(chunk);
    }
    check!(got.body == expected, "assembled object content differs from the uploaded parts");
    Ok(())
}

async fn abort_discards(ctx: TestContext) -> Result<()> {
    let upload_id = ctx.client.create_multipart_upload(&ctx.bucket, "discarded").await?;
    ctx.client
        .upload_part(&ctx.bucket, "discarded", &upload_id, 1, random_bytes(1024))
        .await?;
    ctx.client.abort_multipart_upload(&ctx.bucket, "discarded", &upload_id).await?;

    // The key never materialized.
    expect_error_code(
        ctx.client.get_object(&ctx.bucket, "discarded", None).await,
        &["NoSuchKey"],
        "get after abort",
    )?;

    // The upload id is gone too.
    expect_error_code(
        ctx.client
            .complete_multipart_upload(&ctx.bucket, "discarded", &upload_id, &[])
            .await,
        &["NoSuchUpload", "InvalidPartOrder", "InvalidRequest", "MalformedXML"],
        "complete after abort",
    )
}

async fn out_of_order_rejected(ctx: TestContext) -> Result<()> {
    let upload_id = ctx.client.create_multipart_upload(&ctx.bucket, "disordered").await?;

    let etag1 = ctx
        .client
        .upload_part(&ctx.bucket, "disordered", &upload_id, 1, random_bytes(PART_SIZE))
        .await?;
    let etag2 = ctx
        .client
        .upload_part(&ctx.bucket, "disordered", &upload_id, 2, random_bytes(1024))
        .await?;

    let reversed = [
        CompletedPartSpec { part_number: 2, etag: etag2 },
        CompletedPartSpec { part_number: 1, etag: etag1 },
    ];
    expect_error_code(
        ctx.client
            .complete_multipart_upload(&ctx.bucket, "disordered", &upload_id, &reversed)
            .await,
        &["InvalidPartOrder"],
        "complete with descending part numbers",
    )?;

    ctx.client.abort_multipart_upload(&ctx.bucket, "disordered", &upload_id).await?;
    Ok(())
}

async fn unknown_upload_id(ctx: TestContext) -> Result<()> {
    expect_error_code(
        ctx.client
            .upload_part(&ctx.bucket, "ghost", "no-such-upload-id", 1, random_bytes(16))
            .await,
        &["NoSuchUpload"],
        "upload_part with unknown id",
    )?;
    expect_error_code(
        ctx.client.abort_multipart_upload(&ctx.bucket, "ghost", "no-such-upload-id").await,
        &["NoSuchUpload"],
        "abort with unknown id",
    )
}
