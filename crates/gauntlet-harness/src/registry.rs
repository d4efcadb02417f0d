// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! Explicit test registration.
//!
//! Tests are registered by calling [`TestRegistry::register`] at startup;
//! nothing is discovered from the filesystem or from naming conventions.
//! Registration order is preserved for deterministic default ordering,
//! though the scheduler may reorder for concurrency.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use gauntlet_client::StorageClient;
use gauntlet_core::{Category, Result, RunConfig, TestId};

/// Everything a test body gets to work with: the shared client, the run
/// configuration, and its own scoped bucket.
#[derive(Clone)]
pub struct TestContext {
    /// Shared storage client for the backend under test.
    pub client: Arc<dyn StorageClient>,
    /// The run configuration (read-only).
    pub config: Arc<RunConfig>,
    /// The bucket provisioned for this test. Created before the body
    /// runs, torn down after it finishes, on every exit path.
    pub bucket: String,
}

/// Boxed future returned by a test entry point.
pub type TestFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

type TestBody = Arc<dyn Fn(TestContext) -> TestFuture + Send + Sync>;

/// An immutable test descriptor: identifier, category, entry point, and
/// an expected-duration hint.
#[derive(Clone)]
pub struct TestCase {
    /// Unique identifier within a run.
    pub id: TestId,
    /// The functional area this test exercises.
    pub category: Category,
    /// Hint that this test takes long enough to be worth dispatching
    /// early when the pool has free slots.
    pub slow: bool,
    body: TestBody,
}

impl TestCase {
    /// Creates a test case from an async entry point.
    pub fn new<F, Fut>(id: impl Into<TestId>, category: Category, entry: F) -> Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            id: id.into(),
            category,
            slow: false,
            body: Arc::new(move |ctx| Box::pin(entry(ctx))),
        }
    }

    /// Marks this test as expected to run long.
    #[must_use]
    pub fn slow(mut self) -> Self {
        self.slow = true;
        self
    }

    /// Instantiates the body future for one execution.
    #[must_use]
    pub fn future(&self, ctx: TestContext) -> TestFuture {
        (self.body)(ctx)
    }
}

impl std::fmt::Debug for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("slow", &self.slow)
            .finish_non_exhaustive()
    }
}

/// Criteria for selecting a subset of registered tests.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Match any of these categories.
    pub categories: Vec<Category>,
    /// Match these exact ids.
    pub ids: Vec<TestId>,
    /// Match ids starting with this prefix.
    pub id_prefix: Option<String>,
}

impl Selection {
    /// A selection that matches everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether this selection has no criteria (matches everything).
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.categories.is_empty() && self.ids.is_empty() && self.id_prefix.is_none()
    }

    /// Whether the given case matches.
    #[must_use]
    pub fn matches(&self, case: &TestCase) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        if self.categories.contains(&case.category) {
            return true;
        }
        if self.ids.contains(&case.id) {
            return true;
        }
        if let Some(prefix) = &self.id_prefix {
            if case.id.as_str().starts_with(prefix.as_str()) {
                return true;
            }
        }
        false
    }
}

/// Append-only table of registered tests.
#[derive(Debug, Default)]
pub struct TestRegistry {
    cases: Vec<TestCase>,
}

impl TestRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a test case. Duplicate ids are tolerated here and
    /// rejected by the scheduler before dispatch, so a misconfigured
    /// suite fails the whole run rather than silently shadowing a test.
    pub fn register(&mut self, case: TestCase) {
        self.cases.push(case);
    }

    /// All registered cases, in registration order.
    #[must_use]
    pub fn all(&self) -> &[TestCase] {
        &self.cases
    }

    /// The cases matching a selection, in registration order.
    #[must_use]
    pub fn filter(&self, selection: &Selection) -> Vec<TestCase> {
        self.cases.iter().filter(|case| selection.matches(case)).cloned().collect()
    }

    /// Number of registered cases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(id: &str, category: Category) -> TestCase {
        TestCase::new(id, category, |_ctx| async { Ok(()) })
    }

    fn registry() -> TestRegistry {
        let mut registry = TestRegistry::new();
        registry.register(case("bucket/create", Category::Bucket));
        registry.register(case("bucket/delete", Category::Bucket));
        registry.register(case("object/put", Category::Object));
        registry.register(case("multipart/upload", Category::Multipart).slow());
        registry
    }

    #[test]
    fn registration_order_is_preserved() {
        let registry = registry();
        let ids: Vec<&str> = registry.all().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["bucket/create", "bucket/delete", "object/put", "multipart/upload"]);
    }

    #[test]
    fn filter_by_category() {
        let registry = registry();
        let selected =
            registry.filter(&Selection { categories: vec![Category::Bucket], ..Default::default() });
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|c| c.category == Category::Bucket));
    }

    #[test]
    fn filter_by_id_and_prefix() {
        let registry = registry();

        let selected = registry
            .filter(&Selection { ids: vec![TestId::from("object/put")], ..Default::default() });
        assert_eq!(selected.len(), 1);

        let selected = registry
            .filter(&Selection { id_prefix: Some("bucket/".to_string()), ..Default::default() });
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn unrestricted_selection_matches_all() {
        let registry = registry();
        assert_eq!(registry.filter(&Selection::all()).len(), registry.len());
    }

    #[test]
    fn slow_hint_is_carried() {
        let registry = registry();
        let slow: Vec<&str> =
            registry.all().iter().filter(|c| c.slow).map(|c| c.id.as_str()).collect();
        assert_eq!(slow, ["multipart/upload"]);
    }
}
