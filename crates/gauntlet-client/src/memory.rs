// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! In-memory storage client.
//!
//! Implements the full [`StorageClient`] trait against process-local
//! state, including versioning and delete markers, so the harness can be
//! exercised end-to-end without a live backend. Harness tests also use
//! the injectable failure hook and call counters to assert fixture
//! lifecycle invariants.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use gauntlet_core::{Error, Result};
use uuid::Uuid;

use crate::client::{
    CompletedPartSpec, DeleteObjectResult, GetObjectResult, ObjectInfo, ObjectSummary,
    ObjectVersionSummary, PutObjectResult, StorageClient,
};

/// A failure injected into bucket creation, for harness tests.
#[derive(Debug, Clone)]
pub enum InjectedFailure {
    /// Fail with a backend API error carrying this code.
    Api(String),
    /// Fail with a transport-level error.
    Transport,
}

#[derive(Debug, Clone)]
struct StoredVersion {
    /// `None` is the implicit null version.
    version_id: Option<String>,
    /// `None` marks a delete marker.
    data: Option<Bytes>,
    etag: Option<String>,
    tags: Vec<(String, String)>,
}

impl StoredVersion {
    fn is_delete_marker(&self) -> bool {
        self.data.is_none()
    }
}

#[derive(Debug, Default)]
struct PendingUpload {
    key: String,
    /// part number -> (etag, data)
    parts: BTreeMap<i32, (String, Bytes)>,
}

#[derive(Debug, Default)]
struct BucketState {
    versioning_enabled: bool,
    /// key -> versions, oldest first.
    objects: BTreeMap<String, Vec<StoredVersion>>,
    uploads: HashMap<String, PendingUpload>,
}

impl BucketState {
    fn latest(&self, key: &str) -> Option<&StoredVersion> {
        self.objects.get(key).and_then(|versions| versions.last())
    }

    fn latest_live(&self, key: &str) -> Option<&StoredVersion> {
        self.latest(key).filter(|v| !v.is_delete_marker())
    }

    fn is_empty(&self) -> bool {
        self.objects.values().all(Vec::is_empty)
    }
}

/// In-memory implementation of [`StorageClient`].
#[derive(Debug, Default)]
pub struct MemoryStorageClient {
    buckets: Mutex<HashMap<String, BucketState>>,
    fail_create_bucket: Mutex<Option<InjectedFailure>>,
    create_bucket_calls: AtomicUsize,
    delete_bucket_calls: AtomicUsize,
}

impl MemoryStorageClient {
    /// Creates an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent create_bucket call fail until cleared.
    pub fn fail_create_bucket(&self, failure: Option<InjectedFailure>) {
        *self.fail_create_bucket.lock().expect("poisoned") = failure;
    }

    /// Number of create_bucket calls observed.
    #[must_use]
    pub fn create_bucket_calls(&self) -> usize {
        self.create_bucket_calls.load(Ordering::SeqCst)
    }

    /// Number of delete_bucket calls observed.
    #[must_use]
    pub fn delete_bucket_calls(&self) -> usize {
        self.delete_bucket_calls.load(Ordering::SeqCst)
    }

    /// Number of buckets currently existing. Zero after a leak-free run.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().expect("poisoned").len()
    }
}

/// Content fingerprint used as the ETag. Stable per content; not an MD5.
fn content_etag(data: &[u8]) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    data.hash(&mut hasher);
    format!("\"{:016x}\"", hasher.finish())
}

fn valid_bucket_name(name: &str) -> bool {
    let len_ok = (3..=63).contains(&name.len());
    let chars_ok =
        name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    let ends_ok = name.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
        && name.ends_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit());
    len_ok && chars_ok && ends_ok
}

/// "null" on the wire addresses the implicit null version.
fn normalize_version(version_id: Option<&str>) -> Option<String> {
    match version_id {
        None | Some("null") => None,
        Some(v) => Some(v.to_string()),
    }
}

#[async_trait]
impl StorageClient for MemoryStorageClient {
    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.create_bucket_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(failure) = self.fail_create_bucket.lock().expect("poisoned").clone() {
            return Err(match failure {
                InjectedFailure::Api(code) => {
                    Error::api("CreateBucket", code, "injected failure")
                }
                InjectedFailure::Transport => {
                    Error::transport("CreateBucket", "injected connection failure")
                }
            });
        }

        if !valid_bucket_name(bucket) {
            return Err(Error::api(
                "CreateBucket",
                "InvalidBucketName",
                format!("the specified bucket is not valid: {bucket}"),
            ));
        }

        let mut buckets = self.buckets.lock().expect("poisoned");
        if buckets.contains_key(bucket) {
            return Err(Error::api(
                "CreateBucket",
                "BucketAlreadyOwnedByYou",
                "your previous request to create the named bucket succeeded",
            ));
        }
        buckets.insert(bucket.to_string(), BucketState::default());
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.delete_bucket_calls.fetch_add(1, Ordering::SeqCst);

        let mut buckets = self.buckets.lock().expect("poisoned");
        let state = buckets
            .get(bucket)
            .ok_or_else(|| Error::api("DeleteBucket", "NoSuchBucket", bucket))?;
        if !state.is_empty() {
            return Err(Error::api(
                "DeleteBucket",
                "BucketNotEmpty",
                "the bucket you tried to delete is not empty",
            ));
        }
        buckets.remove(bucket);
        Ok(())
    }

    async fn head_bucket(&self, bucket: &str) -> Result<bool> {
        Ok(self.buckets.lock().expect("poisoned").contains_key(bucket))
    }

    async fn list_buckets(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> =
            self.buckets.lock().expect("poisoned").keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn set_bucket_versioning(&self, bucket: &str, enabled: bool) -> Result<()> {
        let mut buckets = self.buckets.lock().expect("poisoned");
        let state = buckets
            .get_mut(bucket)
            .ok_or_else(|| Error::api("PutBucketVersioning", "NoSuchBucket", bucket))?;
        state.versioning_enabled = enabled;
        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<PutObjectResult> {
        let mut buckets = self.buckets.lock().expect("poisoned");
        let state = buckets
            .get_mut(bucket)
            .ok_or_else(|| Error::api("PutObject", "NoSuchBucket", bucket))?;

        let etag = content_etag(&body);
        let version_id =
            if state.versioning_enabled { Some(Uuid::new_v4().to_string()) } else { None };

        let versions = state.objects.entry(key.to_string()).or_default();
        if version_id.is_none() {
            // Null version is replaced in place.
            versions.retain(|v| v.version_id.is_some());
        }
        versions.push(StoredVersion {
            version_id: version_id.clone(),
            data: Some(body),
            etag: Some(etag.clone()),
            tags: Vec::new(),
        });

        Ok(PutObjectResult { etag: Some(etag), version_id })
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<GetObjectResult> {
        let buckets = self.buckets.lock().expect("poisoned");
        let state =
            buckets.get(bucket).ok_or_else(|| Error::api("GetObject", "NoSuchBucket", bucket))?;

        let version = match normalize_version(version_id) {
            Some(wanted) => state
                .objects
                .get(key)
                .and_then(|versions| {
                    versions.iter().find(|v| v.version_id.as_deref() == Some(wanted.as_str()))
                })
                .ok_or_else(|| Error::api("GetObject", "NoSuchVersion", key))?,
            None => state
                .latest_live(key)
                .ok_or_else(|| Error::api("GetObject", "NoSuchKey", key))?,
        };

        let data = version
            .data
            .clone()
            .ok_or_else(|| Error::api("GetObject", "MethodNotAllowed", "delete marker"))?;
        Ok(GetObjectResult {
            body: data,
            etag: version.etag.clone(),
            version_id: version.version_id.clone().or_else(|| {
                state.versioning_enabled.then(|| "null".to_string())
            }),
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        let buckets = self.buckets.lock().expect("poisoned");
        let state =
            buckets.get(bucket).ok_or_else(|| Error::api("HeadObject", "NoSuchBucket", bucket))?;
        let version =
            state.latest_live(key).ok_or_else(|| Error::api("HeadObject", "NotFound", key))?;
        Ok(ObjectInfo {
            size: version.data.as_ref().map(|d| d.len() as u64).unwrap_or_default(),
            etag: version.etag.clone(),
            version_id: version.version_id.clone(),
        })
    }

    async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
    ) -> Result<DeleteObjectResult> {
        let mut buckets = self.buckets.lock().expect("poisoned");
        let state = buckets
            .get_mut(bucket)
            .ok_or_else(|| Error::api("DeleteObject", "NoSuchBucket", bucket))?;

        match normalize_version(version_id) {
            Some(wanted) => {
                let versions = state.objects.get_mut(key);
                let Some(versions) = versions else {
                    return Ok(DeleteObjectResult::default());
                };
                let mut removed_marker = false;
                versions.retain(|v| {
                    let matches = v.version_id.as_deref() == Some(wanted.as_str());
                    if matches {
                        removed_marker = v.is_delete_marker();
                    }
                    !matches
                });
                if versions.is_empty() {
                    state.objects.remove(key);
                }
                Ok(DeleteObjectResult {
                    version_id: Some(wanted),
                    delete_marker: removed_marker,
                })
            }
            None if state.versioning_enabled => {
                let marker_id = Uuid::new_v4().to_string();
                state.objects.entry(key.to_string()).or_default().push(StoredVersion {
                    version_id: Some(marker_id.clone()),
                    data: None,
                    etag: None,
                    tags: Vec::new(),
                });
                Ok(DeleteObjectResult { version_id: Some(marker_id), delete_marker: true })
            }
            None => {
                // Unversioned delete is idempotent.
                state.objects.remove(key);
                Ok(DeleteObjectResult::default())
            }
        }
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<()> {
        let mut buckets = self.buckets.lock().expect("poisoned");

        let data = {
            let src = buckets
                .get(src_bucket)
                .ok_or_else(|| Error::api("CopyObject", "NoSuchBucket", src_bucket))?;
            src.latest_live(src_key)
                .and_then(|v| v.data.clone())
                .ok_or_else(|| Error::api("CopyObject", "NoSuchKey", src_key))?
        };

        let dst = buckets
            .get_mut(dst_bucket)
            .ok_or_else(|| Error::api("CopyObject", "NoSuchBucket", dst_bucket))?;
        let etag = content_etag(&data);
        let version_id =
            if dst.versioning_enabled { Some(Uuid::new_v4().to_string()) } else { None };
        let versions = dst.objects.entry(dst_key.to_string()).or_default();
        if version_id.is_none() {
            versions.retain(|v| v.version_id.is_some());
        }
        versions.push(StoredVersion {
            version_id,
            data: Some(data),
            etag: Some(etag),
            tags: Vec::new(),
        });
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<ObjectSummary>> {
        let buckets = self.buckets.lock().expect("poisoned");
        let state = buckets
            .get(bucket)
            .ok_or_else(|| Error::api("ListObjectsV2", "NoSuchBucket", bucket))?;

        let mut summaries = Vec::new();
        for (key, versions) in &state.objects {
            if let Some(prefix) = prefix {
                if !key.starts_with(prefix) {
                    continue;
                }
            }
            if let Some(latest) = versions.last() {
                if latest.is_delete_marker() {
                    continue;
                }
                summaries.push(ObjectSummary {
                    key: key.clone(),
                    size: latest.data.as_ref().map(|d| d.len() as u64).unwrap_or_default(),
                    etag: latest.etag.clone(),
                });
            }
        }
        Ok(summaries)
    }

    async fn list_object_versions(&self, bucket: &str) -> Result<Vec<ObjectVersionSummary>> {
        let buckets = self.buckets.lock().expect("poisoned");
        let state = buckets
            .get(bucket)
            .ok_or_else(|| Error::api("ListObjectVersions", "NoSuchBucket", bucket))?;

        let mut entries = Vec::new();
        for (key, versions) in &state.objects {
            // Newest first, as on the wire.
            for (i, version) in versions.iter().rev().enumerate() {
                entries.push(ObjectVersionSummary {
                    key: key.clone(),
                    version_id: version
                        .version_id
                        .clone()
                        .or_else(|| Some("null".to_string())),
                    is_delete_marker: version.is_delete_marker(),
                    is_latest: i == 0,
                });
            }
        }
        Ok(entries)
    }

    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String> {
        let mut buckets = self.buckets.lock().expect("poisoned");
        let state = buckets
            .get_mut(bucket)
            .ok_or_else(|| Error::api("CreateMultipartUpload", "NoSuchBucket", bucket))?;
        let upload_id = Uuid::new_v4().to_string();
        state
            .uploads
            .insert(upload_id.clone(), PendingUpload { key: key.to_string(), ..Default::default() });
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String> {
        if !(1..=10_000).contains(&part_number) {
            return Err(Error::api(
                "UploadPart",
                "InvalidArgument",
                format!("part number must be between 1 and 10000, got {part_number}"),
            ));
        }

        let mut buckets = self.buckets.lock().expect("poisoned");
        let state = buckets
            .get_mut(bucket)
            .ok_or_else(|| Error::api("UploadPart", "NoSuchBucket", bucket))?;
        let upload = state
            .uploads
            .get_mut(upload_id)
            .filter(|u| u.key == key)
            .ok_or_else(|| Error::api("UploadPart", "NoSuchUpload", upload_id))?;

        let etag = content_etag(&body);
        upload.parts.insert(part_number, (etag.clone(), body));
        Ok(etag)
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPartSpec],
    ) -> Result<PutObjectResult> {
        let mut buckets = self.buckets.lock().expect("poisoned");
        let state = buckets
            .get_mut(bucket)
            .ok_or_else(|| Error::api("CompleteMultipartUpload", "NoSuchBucket", bucket))?;

        let upload = state
            .uploads
            .get(upload_id)
            .filter(|u| u.key == key)
            .ok_or_else(|| Error::api("CompleteMultipartUpload", "NoSuchUpload", upload_id))?;

        let ascending = parts.windows(2).all(|w| w[0].part_number < w[1].part_number);
        if parts.is_empty() || !ascending {
            return Err(Error::api(
                "CompleteMultipartUpload",
                "InvalidPartOrder",
                "the list of parts was not in ascending order",
            ));
        }

        let mut assembled = Vec::new();
        for spec in parts {
            let (etag, data) = upload.parts.get(&spec.part_number).ok_or_else(|| {
                Error::api(
                    "CompleteMultipartUpload",
                    "InvalidPart",
                    format!("part {} not found", spec.part_number),
                )
            })?;
            if *etag != spec.etag {
                return Err(Error::api(
                    "CompleteMultipartUpload",
                    "InvalidPart",
                    format!("part {} ETag mismatch", spec.part_number),
                ));
            }
            assembled.extend_from_slice(data);
        }

        state.uploads.remove(upload_id);

        let etag = format!("{}-{}", content_etag(&assembled).trim_matches('"'), parts.len());
        let etag = format!("\"{etag}\"");
        let version_id =
            if state.versioning_enabled { Some(Uuid::new_v4().to_string()) } else { None };
        let versions = state.objects.entry(key.to_string()).or_default();
        if version_id.is_none() {
            versions.retain(|v| v.version_id.is_some());
        }
        versions.push(StoredVersion {
            version_id: version_id.clone(),
            data: Some(Bytes::from(assembled)),
            etag: Some(etag.clone()),
            tags: Vec::new(),
        });

        Ok(PutObjectResult { etag: Some(etag), version_id })
    }

    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        let mut buckets = self.buckets.lock().expect("poisoned");
        let state = buckets
            .get_mut(bucket)
            .ok_or_else(|| Error::api("AbortMultipartUpload", "NoSuchBucket", bucket))?;
        state
            .uploads
            .remove(upload_id)
            .filter(|u| u.key == key)
            .ok_or_else(|| Error::api("AbortMultipartUpload", "NoSuchUpload", upload_id))?;
        Ok(())
    }

    async fn put_object_tagging(
        &self,
        bucket: &str,
        key: &str,
        tags: &[(String, String)],
    ) -> Result<()> {
        let mut buckets = self.buckets.lock().expect("poisoned");
        let state = buckets
            .get_mut(bucket)
            .ok_or_else(|| Error::api("PutObjectTagging", "NoSuchBucket", bucket))?;
        let version = state
            .objects
            .get_mut(key)
            .and_then(|versions| versions.last_mut())
            .filter(|v| !v.is_delete_marker())
            .ok_or_else(|| Error::api("PutObjectTagging", "NoSuchKey", key))?;
        version.tags = tags.to_vec();
        Ok(())
    }

    async fn get_object_tagging(&self, bucket: &str, key: &str) -> Result<Vec<(String, String)>> {
        let buckets = self.buckets.lock().expect("poisoned");
        let state = buckets
            .get(bucket)
            .ok_or_else(|| Error::api("GetObjectTagging", "NoSuchBucket", bucket))?;
        let version = state
            .latest_live(key)
            .ok_or_else(|| Error::api("GetObjectTagging", "NoSuchKey", key))?;
        Ok(version.tags.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bucket_lifecycle() {
        let client = MemoryStorageClient::new();
        client.create_bucket("interop-a").await.unwrap();
        assert!(client.head_bucket("interop-a").await.unwrap());
        assert!(!client.head_bucket("interop-b").await.unwrap());

        let err = client.create_bucket("interop-a").await.unwrap_err();
        assert_eq!(err.code(), Some("BucketAlreadyOwnedByYou"));

        client.delete_bucket("interop-a").await.unwrap();
        let err = client.delete_bucket("interop-a").await.unwrap_err();
        assert_eq!(err.code(), Some("NoSuchBucket"));
    }

    #[tokio::test]
    async fn rejects_invalid_bucket_names() {
        let client = MemoryStorageClient::new();
        for name in ["ab", "UPPER", "trailing-", &"a".repeat(64)] {
            let err = client.create_bucket(name).await.unwrap_err();
            assert_eq!(err.code(), Some("InvalidBucketName"), "name {name:?}");
        }
    }

    #[tokio::test]
    async fn object_round_trip() {
        let client = MemoryStorageClient::new();
        client.create_bucket("interop-a").await.unwrap();

        let put = client.put_object("interop-a", "k", Bytes::from_static(b"hello")).await.unwrap();
        assert!(put.etag.is_some());
        assert!(put.version_id.is_none());

        let got = client.get_object("interop-a", "k", None).await.unwrap();
        assert_eq!(&got.body[..], b"hello");
        assert_eq!(got.etag, put.etag);

        client.delete_object("interop-a", "k", None).await.unwrap();
        let err = client.get_object("interop-a", "k", None).await.unwrap_err();
        assert_eq!(err.code(), Some("NoSuchKey"));
    }

    #[tokio::test]
    async fn versioned_delete_creates_marker() {
        let client = MemoryStorageClient::new();
        client.create_bucket("interop-a").await.unwrap();
        client.set_bucket_versioning("interop-a", true).await.unwrap();

        let v1 = client
            .put_object("interop-a", "k", Bytes::from_static(b"one"))
            .await
            .unwrap()
            .version_id
            .unwrap();
        client.put_object("interop-a", "k", Bytes::from_static(b"two")).await.unwrap();

        let del = client.delete_object("interop-a", "k", None).await.unwrap();
        assert!(del.delete_marker);

        // Latest is a marker, so an unversioned GET 404s; the old version
        // is still addressable.
        let err = client.get_object("interop-a", "k", None).await.unwrap_err();
        assert_eq!(err.code(), Some("NoSuchKey"));
        let got = client.get_object("interop-a", "k", Some(&v1)).await.unwrap();
        assert_eq!(&got.body[..], b"one");

        let versions = client.list_object_versions("interop-a").await.unwrap();
        assert_eq!(versions.len(), 3);
        assert_eq!(versions.iter().filter(|v| v.is_delete_marker).count(), 1);

        // Deleting a non-empty bucket is refused.
        let err = client.delete_bucket("interop-a").await.unwrap_err();
        assert_eq!(err.code(), Some("BucketNotEmpty"));
    }

    #[tokio::test]
    async fn multipart_assembles_parts_in_order() {
        let client = MemoryStorageClient::new();
        client.create_bucket("interop-a").await.unwrap();

        let upload_id = client.create_multipart_upload("interop-a", "big").await.unwrap();
        let etag1 = client
            .upload_part("interop-a", "big", &upload_id, 1, Bytes::from_static(b"aaa"))
            .await
            .unwrap();
        let etag2 = client
            .upload_part("interop-a", "big", &upload_id, 2, Bytes::from_static(b"bbb"))
            .await
            .unwrap();

        let out_of_order = [
            CompletedPartSpec { part_number: 2, etag: etag2.clone() },
            CompletedPartSpec { part_number: 1, etag: etag1.clone() },
        ];
        let err = client
            .complete_multipart_upload("interop-a", "big", &upload_id, &out_of_order)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("InvalidPartOrder"));

        let parts = [
            CompletedPartSpec { part_number: 1, etag: etag1 },
            CompletedPartSpec { part_number: 2, etag: etag2 },
        ];
        let result = client
            .complete_multipart_upload("interop-a", "big", &upload_id, &parts)
            .await
            .unwrap();
        assert!(result.etag.unwrap().contains("-2"));

        let got = client.get_object("interop-a", "big", None).await.unwrap();
        assert_eq!(&got.body[..], b"aaabbb");

        // Upload id is consumed.
        let err =
            client.abort_multipart_upload("interop-a", "big", &upload_id).await.unwrap_err();
        assert_eq!(err.code(), Some("NoSuchUpload"));
    }

    #[tokio::test]
    async fn injected_failures_surface_as_configured() {
        let client = MemoryStorageClient::new();

        client.fail_create_bucket(Some(InjectedFailure::Api("AccessDenied".into())));
        let err = client.create_bucket("interop-a").await.unwrap_err();
        assert_eq!(err.code(), Some("AccessDenied"));

        client.fail_create_bucket(Some(InjectedFailure::Transport));
        let err = client.create_bucket("interop-a").await.unwrap_err();
        assert!(err.is_transport());

        client.fail_create_bucket(None);
        client.create_bucket("interop-a").await.unwrap();
        assert_eq!(client.create_bucket_calls(), 3);
    }
}
