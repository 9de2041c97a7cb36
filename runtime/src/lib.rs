//! # Composable Interactions Runtime
//!
//! Pipeline runtime for composable interactions.
//!
//! This crate drives an [`Interaction`](composable_interactions_core::Interaction)
//! through its lifecycle and composes interactions through nested relations.
//!
//! ## Core Components
//!
//! - **`ActiveInteraction`**: A live instance; prepare, load, validate, run
//! - **`One` / `Many`**: Relation slots owning child interactions
//! - **`TransactionWrap`**: Behavior wrapping execution in a unit of work
//! - **Metrics**: Run outcome counters and execute latency
//!
//! ## Example
//!
//! ```ignore
//! use composable_interactions_runtime::ActiveInteraction;
//!
//! let mut order = ActiveInteraction::new(PlaceOrder::default())?;
//! order.run(json!({
//!     "PlaceOrder": { "customer_id": 7 },
//!     "AddLineItem": [{ "sku": "A-1", "quantity": 2 }],
//! })).await?;
//!
//! assert!(order.is_success());
//! ```

/// Transaction wrapping behavior
pub mod behaviors;

/// The interaction pipeline
pub mod interaction;

/// Prometheus metrics for observability
pub mod metrics;

/// `one` and `many` relation slots
pub mod relation;

/// Error types for the interaction runtime
pub mod error {
    use crate::interaction::ActiveInteraction;
    use composable_interactions_core::validation::SchemaError;
    use composable_interactions_core::Interaction;
    use std::fmt;
    use thiserror::Error;

    /// Errors raised while constructing an interaction
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum InteractionError {
        /// A rule names an attribute the interaction does not declare
        #[error(transparent)]
        Schema(#[from] SchemaError),

        /// A relation slot could not build its child
        #[error("Relation '{relation}' on {form} is unusable: {reason}")]
        Nested {
            /// Form name of the parent
            form: &'static str,
            /// Field name of the relation slot
            relation: &'static str,
            /// Why the child could not be built
            reason: String,
        },
    }

    /// Failure of [`ActiveInteraction::force_run`]
    pub enum ForceRunError<I: Interaction> {
        /// The run finished invalid or with errors; the instance is attached
        Invalid(Box<ActiveInteraction<I>>),

        /// The business logic raised
        Execution(I::Error),
    }

    impl<I: Interaction> ForceRunError<I> {
        /// The attached instance, for the `Invalid` case
        #[must_use]
        pub fn interaction(&self) -> Option<&ActiveInteraction<I>> {
            match self {
                Self::Invalid(instance) => Some(&**instance),
                Self::Execution(_) => None,
            }
        }

        /// Take the attached instance, for the `Invalid` case
        #[must_use]
        pub fn into_interaction(self) -> Option<ActiveInteraction<I>> {
            match self {
                Self::Invalid(instance) => Some(*instance),
                Self::Execution(_) => None,
            }
        }
    }

    impl<I: Interaction> fmt::Debug for ForceRunError<I> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Invalid(instance) => f.debug_tuple("Invalid").field(instance).finish(),
                Self::Execution(error) => f.debug_tuple("Execution").field(error).finish(),
            }
        }
    }

    impl<I: Interaction> fmt::Display for ForceRunError<I> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Invalid(instance) => write!(
                    f,
                    "{} failed: {}",
                    I::form_name(),
                    instance.collect_errors().to_json()
                ),
                Self::Execution(error) => write!(f, "{} raised: {error}", I::form_name()),
            }
        }
    }

    impl<I: Interaction> std::error::Error for ForceRunError<I> {}
}

pub use behaviors::{
    IsolationLevel, Transaction, TransactionError, TransactionManager, TransactionWrap,
};
pub use error::{ForceRunError, InteractionError};
pub use interaction::ActiveInteraction;
pub use relation::{Many, One};
