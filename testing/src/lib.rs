//! # Composable Interactions Testing
//!
//! Testing utilities and helpers for composable interactions.
//!
//! This crate provides:
//! - A fluent Given/When/Then harness ([`InteractionTest`])
//! - Mock collaborators (event recorder, in-memory transactions)
//! - Assertion helpers for error maps
//! - Property-based testing strategies for raw input
//!
//! ## Example
//!
//! ```ignore
//! use composable_interactions_testing::{InteractionTest, assertions};
//!
//! #[test]
//! fn rejects_blank_email() {
//!     InteractionTest::new(Signup::default())
//!         .given_input(json!({ "email": "" }))
//!         .then_invalid()
//!         .then_errors(|errors| assertions::assert_has_error(errors, "email"))
//!         .run();
//! }
//! ```


/// Mock collaborators
pub mod mocks;

/// Test helpers and utilities.
pub mod helpers {
    /// Install a `tracing` subscriber writing to the test output
    ///
    /// Honours `RUST_LOG`; safe to call from every test.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use serde_json::{Map, Value};

    /// Scalar JSON values: null, booleans, integers, and short strings
    pub fn scalar_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
        ]
    }

    /// An object payload whose keys are drawn from `attributes`
    pub fn payload(attributes: &'static [&'static str]) -> impl Strategy<Value = Value> {
        proptest::collection::vec(
            (proptest::sample::select(attributes), scalar_value()),
            0..=attributes.len(),
        )
        .prop_map(|pairs| {
            let map: Map<String, Value> = pairs
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect();
            Value::Object(map)
        })
    }

    /// A list of `1..=max` object payloads for a `many` relation
    pub fn entry_list(
        attributes: &'static [&'static str],
        max: usize,
    ) -> impl Strategy<Value = Value> {
        proptest::collection::vec(payload(attributes), 1..=max.max(1)).prop_map(Value::Array)
    }
}

// Re-export commonly used items
pub use interaction_test::{InteractionTest, assertions};
pub use mocks::{InMemoryTransactionManager, RecordingHandler, TransactionCall};

#[cfg(test)]
mod tests {
    use super::properties;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn payload_only_uses_declared_keys(value in properties::payload(&["a", "b"])) {
            let map = value.as_object().cloned().unwrap_or_default();
            prop_assert!(map.keys().all(|key| key == "a" || key == "b"));
        }

        #[test]
        fn entry_list_is_never_empty(value in properties::entry_list(&["a"], 4)) {
            let len = value.as_array().map_or(0, Vec::len);
            prop_assert!((1..=4).contains(&len));
        }
    }
}
