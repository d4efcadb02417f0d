// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! The storage client trait definition.

use async_trait::async_trait;
use bytes::Bytes;
use gauntlet_core::Result;

/// Result of a put or multipart-complete operation.
#[derive(Debug, Clone, Default)]
pub struct PutObjectResult {
    /// The ETag of the stored object, if the backend returned one.
    pub etag: Option<String>,
    /// The version id, if bucket versioning is enabled.
    pub version_id: Option<String>,
}

/// Result of a get_object operation.
#[derive(Debug, Clone)]
pub struct GetObjectResult {
    /// The object content.
    pub body: Bytes,
    /// The ETag of the object.
    pub etag: Option<String>,
    /// The version id of the returned object.
    pub version_id: Option<String>,
}

/// Metadata returned by head_object.
#[derive(Debug, Clone, Default)]
pub struct ObjectInfo {
    /// Object size in bytes.
    pub size: u64,
    /// The ETag of the object.
    pub etag: Option<String>,
    /// The version id of the object.
    pub version_id: Option<String>,
}

/// Result of a delete_object operation.
#[derive(Debug, Clone, Default)]
pub struct DeleteObjectResult {
    /// The version id affected by the delete (marker id when one was
    /// created).
    pub version_id: Option<String>,
    /// Whether a delete marker was created rather than a permanent delete.
    pub delete_marker: bool,
}

/// A single object in a listing.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    /// Object key.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// The ETag of the object.
    pub etag: Option<String>,
}

/// A single entry in a version listing: an object version or a delete
/// marker.
#[derive(Debug, Clone)]
pub struct ObjectVersionSummary {
    /// Object key.
    pub key: String,
    /// Version id (`None` for the implicit null version).
    pub version_id: Option<String>,
    /// Whether this entry is a delete marker.
    pub is_delete_marker: bool,
    /// Whether this entry is the latest version of its key.
    pub is_latest: bool,
}

/// A completed part reference for complete_multipart_upload.
#[derive(Debug, Clone)]
pub struct CompletedPartSpec {
    /// Part number, 1-based.
    pub part_number: i32,
    /// ETag returned by the corresponding upload_part call.
    pub etag: String,
}

/// The boundary between the harness and the backend under test.
///
/// Implementations must surface backend API errors as
/// [`gauntlet_core::Error::Api`] with the backend's stable error code, and
/// anything that never produced a backend response as
/// [`gauntlet_core::Error::Transport`] — the outcome classifier depends on
/// that distinction. All methods must be cancellation-safe: the scheduler
/// aborts in-flight calls when a test exceeds its deadline.
#[async_trait]
pub trait StorageClient: Send + Sync {
    // Bucket operations

    /// Create a new bucket.
    async fn create_bucket(&self, bucket: &str) -> Result<()>;

    /// Delete a bucket (must be empty).
    async fn delete_bucket(&self, bucket: &str) -> Result<()>;

    /// Check whether a bucket exists.
    async fn head_bucket(&self, bucket: &str) -> Result<bool>;

    /// List all bucket names.
    async fn list_buckets(&self) -> Result<Vec<String>>;

    /// Enable or suspend versioning on a bucket.
    async fn set_bucket_versioning(&self, bucket: &str, enabled: bool) -> Result<()>;

    // Object operations

    /// Store an object.
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<PutObjectResult>;

    /// Fetch an object, optionally a specific version.
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<GetObjectResult>;

    /// Fetch object metadata without the body.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo>;

    /// Delete an object, optionally a specific version.
    async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<DeleteObjectResult>;

    /// Server-side copy of an object.
    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()>;

    /// List objects in a bucket, optionally under a prefix. Paginates
    /// internally and returns the full listing.
    async fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ObjectSummary>>;

    /// List all object versions and delete markers in a bucket.
    async fn list_object_versions(&self, bucket: &str) -> Result<Vec<ObjectVersionSummary>>;

    // Multipart operations

    /// Start a multipart upload, returning the upload id.
    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String>;

    /// Upload one part, returning its ETag.
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String>;

    /// Complete a multipart upload from the given parts.
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPartSpec],
    ) -> Result<PutObjectResult>;

    /// Abort a multipart upload and discard its parts.
    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()>;

    // Tagging operations

    /// Replace the tag set of an object.
    async fn put_object_tagging(
        &self,
        bucket: &str,
        key: &str,
        tags: &[(String, String)],
    ) -> Result<()>;

    /// Fetch the tag set of an object.
    async fn get_object_tagging(&self, bucket: &str, key: &str) -> Result<Vec<(String, String)>>;
}
