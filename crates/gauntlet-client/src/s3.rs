// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! AWS SDK-backed storage client.
//!
//! This is the adapter used for real runs: a thin mapping from the
//! [`StorageClient`] trait onto `aws-sdk-s3`, configured for arbitrary
//! S3-compatible endpoints (path-style addressing, static credentials,
//! explicit retry policy).

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::retry::RetryConfig as SdkRetryConfig;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketVersioningStatus, CompletedMultipartUpload, CompletedPart, Tag, Tagging,
    VersioningConfiguration,
};
use aws_sdk_s3::Client;
use bytes::Bytes;
use gauntlet_core::{Error, Result, RunConfig};

use crate::client::{
    CompletedPartSpec, DeleteObjectResult, GetObjectResult, ObjectInfo, ObjectSummary,
    ObjectVersionSummary, PutObjectResult, StorageClient,
};

/// Storage client backed by `aws-sdk-s3`.
#[derive(Debug, Clone)]
pub struct S3StorageClient {
    client: Client,
}

impl S3StorageClient {
    /// Build a client from the run configuration.
    #[must_use]
    pub fn new(config: &RunConfig) -> Self {
        let credentials = Credentials::new(
            config.endpoint.access_key.clone(),
            config.endpoint.secret_key.clone(),
            None,
            None,
            "gauntlet",
        );

        let retry = SdkRetryConfig::standard()
            .with_max_attempts(config.retry.max_attempts)
            .with_initial_backoff(config.retry.initial_backoff())
            .with_max_backoff(config.retry.max_backoff());

        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.endpoint.region.clone()))
            .endpoint_url(config.endpoint.url.clone())
            .credentials_provider(credentials)
            .force_path_style(config.endpoint.force_path_style)
            .retry_config(retry)
            // Some backends under test omit response checksums; do not let
            // the SDK fail a request the backend answered correctly.
            .response_checksum_validation(
                aws_sdk_s3::config::ResponseChecksumValidation::WhenRequired,
            )
            .build();

        Self { client: Client::from_conf(sdk_config) }
    }

    /// Access the underlying SDK client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Maps an SDK error into the harness taxonomy: a service error becomes
/// `Api` with the backend's code, everything else (construction, dispatch,
/// client-side timeout, malformed response) is `Transport`.
fn map_sdk_err<E, R>(operation: &'static str, err: SdkError<E, R>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::ServiceError(service) => {
            let meta = service.err().meta();
            let code = meta.code().unwrap_or("Unknown").to_string();
            let message = meta.message().unwrap_or_default().to_string();
            Error::api(operation, code, message)
        }
        _ => Error::transport(operation, format!("{}", DisplayErrorContext(&err))),
    }
}

#[async_trait]
impl StorageClient for S3StorageClient {
    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| map_sdk_err("CreateBucket", e))?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| map_sdk_err("DeleteBucket", e))?;
        Ok(())
    }

    async fn head_bucket(&self, bucket: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let mapped = map_sdk_err("HeadBucket", err);
                // HeadBucket reports absence via the error channel.
                match mapped.code() {
                    Some("NotFound" | "NoSuchBucket" | "404") => Ok(false),
                    _ => Err(mapped),
                }
            }
        }
    }

    async fn list_buckets(&self) -> Result<Vec<String>> {
        let resp =
            self.client.list_buckets().send().await.map_err(|e| map_sdk_err("ListBuckets", e))?;
        Ok(resp.buckets().iter().filter_map(|b| b.name().map(str::to_string)).collect())
    }

    async fn set_bucket_versioning(&self, bucket: &str, enabled: bool) -> Result<()> {
        let status =
            if enabled { BucketVersioningStatus::Enabled } else { BucketVersioningStatus::Suspended };
        self.client
            .put_bucket_versioning()
            .bucket(bucket)
            .versioning_configuration(VersioningConfiguration::builder().status(status).build())
            .send()
            .await
            .map_err(|e| map_sdk_err("PutBucketVersioning", e))?;
        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<PutObjectResult> {
        let resp = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| map_sdk_err("PutObject", e))?;
        Ok(PutObjectResult {
            etag: resp.e_tag().map(str::to_string),
            version_id: resp.version_id().map(str::to_string),
        })
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<GetObjectResult> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .set_version_id(version_id.map(String::from))
            .send()
            .await
            .map_err(|e| map_sdk_err("GetObject", e))?;

        let etag = resp.e_tag().map(str::to_string);
        let version_id = resp.version_id().map(str::to_string);
        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| Error::transport("GetObject", e.to_string()))?
            .into_bytes();

        Ok(GetObjectResult { body, etag, version_id })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        let resp = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_err("HeadObject", e))?;
        Ok(ObjectInfo {
            size: resp.content_length().unwrap_or_default().max(0) as u64,
            etag: resp.e_tag().map(str::to_string),
            version_id: resp.version_id().map(str::to_string),
        })
    }

    async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<DeleteObjectResult> {
        let resp = self
            .client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .set_version_id(version_id.map(String::from))
            .send()
            .await
            .map_err(|e| map_sdk_err("DeleteObject", e))?;
        Ok(DeleteObjectResult {
            version_id: resp.version_id().map(str::to_string),
            delete_marker: resp.delete_marker().unwrap_or(false),
        })
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        self.client
            .copy_object()
            .copy_source(format!("{src_bucket}/{src_key}"))
            .bucket(dst_bucket)
            .key(dst_key)
            .send()
            .await
            .map_err(|e| map_sdk_err("CopyObject", e))?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ObjectSummary>> {
        let mut summaries = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut req = self.client.list_objects_v2().bucket(bucket);
            if let Some(prefix) = prefix {
                req = req.prefix(prefix);
            }
            if let Some(token) = &token {
                req = req.continuation_token(token);
            }
            let resp = req.send().await.map_err(|e| map_sdk_err("ListObjectsV2", e))?;

            for obj in resp.contents() {
                summaries.push(ObjectSummary {
                    key: obj.key().unwrap_or_default().to_string(),
                    size: obj.size().unwrap_or_default().max(0) as u64,
                    etag: obj.e_tag().map(str::to_string),
                });
            }

            if resp.is_truncated() == Some(true) {
                token = resp.next_continuation_token().map(str::to_string);
                if token.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(summaries)
    }

    async fn list_object_versions(&self, bucket: &str) -> Result<Vec<ObjectVersionSummary>> {
        let mut entries = Vec::new();
        let mut key_marker: Option<String> = None;
        let mut version_marker: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_object_versions()
                .bucket(bucket)
                .set_key_marker(key_marker.clone())
                .set_version_id_marker(version_marker.clone())
                .send()
                .await
                .map_err(|e| map_sdk_err("ListObjectVersions", e))?;

            for version in resp.versions() {
                entries.push(ObjectVersionSummary {
                    key: version.key().unwrap_or_default().to_string(),
                    version_id: version.version_id().map(str::to_string),
                    is_delete_marker: false,
                    is_latest: version.is_latest().unwrap_or(false),
                });
            }
            for marker in resp.delete_markers() {
                entries.push(ObjectVersionSummary {
                    key: marker.key().unwrap_or_default().to_string(),
                    version_id: marker.version_id().map(str::to_string),
                    is_delete_marker: true,
                    is_latest: marker.is_latest().unwrap_or(false),
                });
            }

            if resp.is_truncated() == Some(true) {
                key_marker = resp.next_key_marker().map(str::to_string);
                version_marker = resp.next_version_id_marker().map(str::to_string);
                if key_marker.is_none() && version_marker.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        Ok(entries)
    }

    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String> {
        let resp = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_err("CreateMultipartUpload", e))?;
        resp.upload_id()
            .map(str::to_string)
            .ok_or_else(|| Error::transport("CreateMultipartUpload", "response missing upload id"))
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String> {
        let resp = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| map_sdk_err("UploadPart", e))?;
        resp.e_tag()
            .map(str::to_string)
            .ok_or_else(|| Error::transport("UploadPart", "response missing part ETag"))
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPartSpec],
    ) -> Result<PutObjectResult> {
        let completed_parts: Vec<CompletedPart> = parts
            .iter()
            .map(|p| CompletedPart::builder().part_number(p.part_number).e_tag(&p.etag).build())
            .collect();

        let resp = self
            .client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder().set_parts(Some(completed_parts)).build(),
            )
            .send()
            .await
            .map_err(|e| map_sdk_err("CompleteMultipartUpload", e))?;

        Ok(PutObjectResult {
            etag: resp.e_tag().map(str::to_string),
            version_id: resp.version_id().map(str::to_string),
        })
    }

    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| map_sdk_err("AbortMultipartUpload", e))?;
        Ok(())
    }

    async fn put_object_tagging(
        &self,
        bucket: &str,
        key: &str,
        tags: &[(String, String)],
    ) -> Result<()> {
        let tag_set: Vec<Tag> = tags
            .iter()
            .map(|(k, v)| {
                Tag::builder()
                    .key(k)
                    .value(v)
                    .build()
                    .map_err(|e| Error::Config(format!("invalid tag {k:?}: {e}")))
            })
            .collect::<Result<_>>()?;

        let tagging = Tagging::builder()
            .set_tag_set(Some(tag_set))
            .build()
            .map_err(|e| Error::Config(format!("invalid tag set: {e}")))?;

        self.client
            .put_object_tagging()
            .bucket(bucket)
            .key(key)
            .tagging(tagging)
            .send()
            .await
            .map_err(|e| map_sdk_err("PutObjectTagging", e))?;
        Ok(())
    }

    async fn get_object_tagging(&self, bucket: &str, key: &str) -> Result<Vec<(String, String)>> {
        let resp = self
            .client
            .get_object_tagging()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_err("GetObjectTagging", e))?;
        Ok(resp.tag_set().iter().map(|t| (t.key().to_string(), t.value().to_string())).collect())
    }
}
