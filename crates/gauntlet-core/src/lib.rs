// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! Core types and utilities for the Gauntlet compatibility suite.
//!
//! This crate provides the building blocks shared by every Gauntlet
//! component:
//! - Run configuration (endpoint, scheduling, classification)
//! - The harness error taxonomy and assertion helpers
//! - Common data types (test identifiers, categories, outcomes)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    ClassifierConfig, EndpointConfig, LogFormat, LoggingConfig, RetryConfig, RunConfig,
    SchedulerConfig,
};
pub use error::{Error, Result};
pub use types::{Category, Outcome, OutcomeKind, TestId};
