// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! Storage client adapter for the Gauntlet compatibility suite.
//!
//! The harness never talks to a backend directly; everything goes through
//! the [`StorageClient`] trait. Two implementations are provided:
//!
//! - [`S3StorageClient`] — the real adapter, backed by `aws-sdk-s3`.
//! - [`MemoryStorageClient`] — an in-memory backend with versioning
//!   semantics, used by harness tests and local experimentation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod memory;
pub mod s3;

pub use client::{
    CompletedPartSpec, DeleteObjectResult, GetObjectResult, ObjectInfo, ObjectSummary,
    ObjectVersionSummary, PutObjectResult, StorageClient,
};
pub use memory::MemoryStorageClient;
pub use s3::S3StorageClient;
