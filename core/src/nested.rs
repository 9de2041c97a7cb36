//! Nested relation capability.
//!
//! A parent interaction owns child interactions through relation slots. Each
//! slot declares a cardinality ([`Cardinality::One`] or [`Cardinality::Many`])
//! and the child's form name, which is where the child's sub-payload lives in
//! the parent's input.
//!
//! The pipeline only sees slots through the object-safe [`NestedRelation`]
//! trait, so loading and validation recurse without knowing child types.
//! Execution of children stays typed and is triggered explicitly by the
//! parent's business logic.

use crate::errors::Errors;
use serde_json::Value;
use std::fmt;

/// How many children a relation slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Exactly one child interaction
    One,

    /// An ordered sequence of children, sized by the input at load time
    Many,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "one"),
            Self::Many => write!(f, "many"),
        }
    }
}

/// Object-safe view over a relation slot.
///
/// Implemented by the runtime's `One<C>` and `Many<C>` slots.
pub trait NestedRelation: Send {
    /// Cardinality of this slot
    fn cardinality(&self) -> Cardinality;

    /// Form name of the child interaction type
    fn form_name(&self) -> &'static str;

    /// Load children from the sub-payload found under [`Self::form_name`]
    ///
    /// `payload` is `None` when the parent input has no such key. A `one`
    /// slot leaves its child untouched in that case; a `many` slot is
    /// replaced by an empty sequence.
    fn load_from(&mut self, payload: Option<&Value>);

    /// Validate every child, without short-circuiting
    fn validate(&mut self) -> bool;

    /// Whether every child is currently valid and no execute-time re-check failed
    fn is_valid(&self) -> bool;

    /// Whether the slot reports success (see the runtime docs for the rule)
    fn is_success(&self) -> bool;

    /// Number of children currently held
    fn len(&self) -> usize;

    /// True when no children are held
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append every child error into `errors`, keyed by `prefix` plus the
    /// child's own attribute path
    fn collect_errors(&self, prefix: &str, errors: &mut Errors);

    /// Why the slot's factory failed to build a child, if it did
    fn fault(&self) -> Option<String>;
}

/// Join a relation path segment onto a prefix with a dot.
#[must_use]
pub fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "items"), "items");
        assert_eq!(join_path("items.0", "sku"), "items.0.sku");
    }

    #[test]
    fn test_cardinality_display() {
        assert_eq!(Cardinality::One.to_string(), "one");
        assert_eq!(Cardinality::Many.to_string(), "many");
    }
}
