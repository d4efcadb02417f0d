// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! Configuration management for Gauntlet runs.
//!
//! A [`RunConfig`] is immutable for the duration of a run. It is loaded
//! once at startup (TOML file plus environment fallbacks for
//! credentials), validated before any test is dispatched, and shared
//! read-only across workers.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration for a Gauntlet run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RunConfig {
    /// Target endpoint configuration.
    pub endpoint: EndpointConfig,
    /// Scheduler configuration.
    pub scheduler: SchedulerConfig,
    /// Outcome classifier configuration.
    pub classifier: ClassifierConfig,
    /// Retry policy applied at the storage-client boundary.
    pub retry: RetryConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl RunConfig {
    /// Load configuration from an optional TOML file, falling back to
    /// defaults, then apply environment overrides for credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(crate::Error::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed.
    pub fn parse(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Apply `GAUNTLET_ACCESS_KEY` / `GAUNTLET_SECRET_KEY` environment
    /// overrides, so credentials never need to live in the config file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("GAUNTLET_ACCESS_KEY") {
            self.endpoint.access_key = key;
        }
        if let Ok(secret) = std::env::var("GAUNTLET_SECRET_KEY") {
            self.endpoint.secret_key = secret;
        }
    }

    /// Validate the configuration.
    ///
    /// Called by the scheduler before any work is dispatched; a failure
    /// here aborts the run entirely.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error describing the first invalid field.
    pub fn validate(&self) -> crate::Result<()> {
        if self.endpoint.url.is_empty() {
            return Err(crate::Error::Config("endpoint.url must not be empty".into()));
        }
        if self.scheduler.concurrency == 0 {
            return Err(crate::Error::Config("scheduler.concurrency must be at least 1".into()));
        }
        if self.scheduler.per_test_timeout_ms == 0 {
            return Err(crate::Error::Config(
                "scheduler.per_test_timeout_ms must be non-zero".into(),
            ));
        }
        if self.scheduler.cleanup_grace_ms == 0 {
            return Err(crate::Error::Config("scheduler.cleanup_grace_ms must be non-zero".into()));
        }
        validate_bucket_prefix(&self.scheduler.bucket_prefix)?;
        Ok(())
    }
}

/// Target endpoint connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Endpoint URL of the backend under test.
    pub url: String,
    /// Region sent with requests.
    pub region: String,
    /// Access key id.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
    /// Use path-style addressing (required by most non-AWS backends).
    pub force_path_style: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9000".to_string(),
            region: "us-east-1".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            force_path_style: true,
        }
    }
}

/// Execution scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of tests running concurrently.
    ///
    /// Bounded because each test provisions backend resources (buckets);
    /// unbounded concurrency pollutes results with throttling errors.
    pub concurrency: usize,
    /// Hard deadline for a single test, in milliseconds.
    pub per_test_timeout_ms: u64,
    /// Separate deadline for fixture teardown after a test has finished,
    /// timed out, or panicked, so cleanup is never starved by the test's
    /// own budget. In milliseconds.
    pub cleanup_grace_ms: u64,
    /// Prefix for generated bucket names.
    pub bucket_prefix: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            per_test_timeout_ms: 300_000, // 5 minutes
            cleanup_grace_ms: 30_000,     // 30 seconds
            bucket_prefix: "gauntlet".to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Returns the per-test timeout as a `Duration`.
    #[must_use]
    pub const fn per_test_timeout(&self) -> Duration {
        Duration::from_millis(self.per_test_timeout_ms)
    }

    /// Returns the cleanup grace period as a `Duration`.
    #[must_use]
    pub const fn cleanup_grace(&self) -> Duration {
        Duration::from_millis(self.cleanup_grace_ms)
    }
}

/// Outcome classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Backend error codes that mean "feature not supported".
    ///
    /// An error carrying one of these codes classifies the test as
    /// `Skipped`, never `Failed`, regardless of which operation raised
    /// it. The default set contains only codes that unambiguously signal
    /// an unimplemented feature; ambiguous codes some backends reuse for
    /// malformed requests (`InvalidRequest`, `InvalidArgument`) must be
    /// opted into per target.
    pub unsupported_codes: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            unsupported_codes: vec![
                "NotImplemented".to_string(),
                "NotSupported".to_string(),
                "UnsupportedOperation".to_string(),
                "XNotImplemented".to_string(),
                "MethodNotAllowed".to_string(),
            ],
        }
    }
}

/// Retry policy applied at the storage-client boundary.
///
/// Mapped onto the AWS SDK's retry configuration by the S3 client; the
/// in-memory client ignores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per operation (1 = no retries).
    pub max_attempts: u32,
    /// Initial backoff between attempts, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Maximum backoff between attempts, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, initial_backoff_ms: 100, max_backoff_ms: 5_000 }
    }
}

impl RetryConfig {
    /// Returns the initial backoff as a `Duration`.
    #[must_use]
    pub const fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Returns the maximum backoff as a `Duration`.
    #[must_use]
    pub const fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (overridden by `RUST_LOG` when set).
    pub level: String,
    /// Log output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// JSON output for log aggregation.
    Json,
}

/// Bucket-name prefixes must leave room for the generated suffix and
/// satisfy S3 naming rules themselves.
fn validate_bucket_prefix(prefix: &str) -> crate::Result<()> {
    if prefix.is_empty() || prefix.len() > 37 {
        return Err(crate::Error::Config(format!(
            "scheduler.bucket_prefix must be 1-37 characters, got {}",
            prefix.len()
        )));
    }
    let valid = prefix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let starts_ok = prefix.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !valid || !starts_ok {
        return Err(crate::Error::Config(format!(
            "scheduler.bucket_prefix must match [a-z0-9][a-z0-9-]*, got {prefix:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.concurrency, 8);
        assert_eq!(config.scheduler.per_test_timeout(), Duration::from_secs(300));
        assert!(config.classifier.unsupported_codes.contains(&"NotImplemented".to_string()));
        // The ambiguous codes the original suite conflated are not defaulted.
        assert!(!config.classifier.unsupported_codes.contains(&"InvalidRequest".to_string()));
    }

    #[test]
    fn parse_partial_config() {
        let config = RunConfig::parse(
            r#"
            [endpoint]
            url = "http://s3.example.test:9000"

            [scheduler]
            concurrency = 2
            per_test_timeout_ms = 100

            [classifier]
            unsupported_codes = ["NotImplemented", "InvalidRequest"]
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoint.url, "http://s3.example.test:9000");
        assert_eq!(config.endpoint.region, "us-east-1"); // default preserved
        assert_eq!(config.scheduler.concurrency, 2);
        assert_eq!(config.scheduler.per_test_timeout(), Duration::from_millis(100));
        assert_eq!(config.classifier.unsupported_codes.len(), 2);
    }

    #[test]
    fn parse_rejects_malformed_toml() {
        assert!(RunConfig::parse("endpoint = not-a-table").is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = RunConfig::default();
        config.scheduler.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = RunConfig::default();
        config.scheduler.per_test_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_bucket_prefix() {
        let mut config = RunConfig::default();
        config.scheduler.bucket_prefix = "Invalid_Prefix".to_string();
        assert!(config.validate().is_err());

        config.scheduler.bucket_prefix = "-leading-hyphen".to_string();
        assert!(config.validate().is_err());

        config.scheduler.bucket_prefix = "a".repeat(38);
        assert!(config.validate().is_err());

        config.scheduler.bucket_prefix = "msst-interop".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gauntlet.toml");
        std::fs::write(&path, "[scheduler]\nconcurrency = 4\n").unwrap();

        let config = RunConfig::from_file(&path).unwrap();
        assert_eq!(config.scheduler.concurrency, 4);

        assert!(RunConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
