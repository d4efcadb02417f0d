// Copyright 2025 The Gauntlet Authors
// SPDX-License-Identifier: Apache-2.0

//! The registered compatibility test cases.
//!
//! Each module covers one functional area and exposes a `register`
//! function; [`register_all`] wires the full suite into a registry. Test
//! bodies are ordinary async functions over [`TestContext`]: they operate
//! inside their scoped bucket, assert with `check!`/`check_eq!`, and
//! propagate backend errors so the classifier can turn declared
//! non-support into skips.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use gauntlet_core::{Error, Result};
use gauntlet_harness::TestRegistry;
use rand::RngCore;

pub mod bucket;
pub mod list;
pub mod multipart;
pub mod object;
pub mod tagging;
pub mod versioning;

/// Registers the whole suite, in category order.
pub fn register_all(registry: &mut TestRegistry) {
    bucket::register(registry);
    object::register(registry);
    list::register(registry);
    multipart::register(registry);
    versioning::register(registry);
    tagging::register(registry);
}

/// Generate random bytes of the given size.
#[must_use]
pub fn random_bytes(size: usize) -> bytes::Bytes {
    let mut data = vec![0u8; size];
    rand::thread_rng().fill_bytes(&mut data);
    bytes::Bytes::from(data)
}

/// Asserts that a result failed with one of the expected backend error
/// codes. Unexpected errors are propagated untouched so the outcome
/// classifier still sees them (a `NotImplemented` here must become a
/// skip, not an assertion failure).
pub(crate) fn expect_error_code<T>(
    result: Result<T>,
    expected: &[&str],
    context: &str,
) -> Result<()> {
    match result {
        Ok(_) => Err(Error::assertion(format!(
            "{context}: expected one of {expected:?}, got success"
        ))),
        Err(err) if err.code().is_some_and(|code| expected.contains(&code)) => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_registered_ids_are_unique() {
        let mut registry = TestRegistry::new();
        register_all(&mut registry);

        let mut seen = std::collections::HashSet::new();
        for case in registry.all() {
            assert!(seen.insert(case.id.clone()), "duplicate id {}", case.id);
            // Ids follow the category/name convention.
            let prefix = format!("{}/", case.category);
            assert!(
                case.id.as_str().starts_with(&prefix),
                "id {} does not start with {prefix}",
                case.id
            );
        }
        assert!(registry.len() >= 30);
    }

    #[test]
    fn expect_error_code_distinguishes() {
        // Matching code is consumed.
        let matched: Result<()> =
            expect_error_code(Err::<(), _>(Error::api("Op", "NoSuchKey", "")), &["NoSuchKey"], "x");
        assert!(matched.is_ok());

        // Success where an error was expected is an assertion failure.
        let unexpected = expect_error_code(Ok(()), &["NoSuchKey"], "x").unwrap_err();
        assert!(matches!(unexpected, Error::Assertion(_)));

        // Other codes pass through for the classifier.
        let passed_through =
            expect_error_code(Err::<(), _>(Error::api("Op", "NotImplemented", "")), &["NoSuchKey"], "x")
                .unwrap_err();
        assert_eq!(passed_through.code(), Some("NotImplemented"));
    }

    #[test]
    fn random_bytes_has_requested_size() {
        assert_eq!(random_bytes(1024).len(), 1024);
        assert_ne!(random_bytes(64), random_bytes(64));
    }
}
