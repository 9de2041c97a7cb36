//! Attribute store contract.
//!
//! Every interaction exposes its declared input/output fields through the
//! [`Attributes`] trait: a static list of attribute names plus a
//! name → accessor map over the concrete struct. Nested relation slots are
//! exposed separately through [`Attributes::relations`] and
//! [`Attributes::relations_mut`], so the pipeline can recurse into children
//! without knowing their concrete types.
//!
//! The trait is normally generated with `#[derive(Attributes)]` from the
//! macros crate, but it is small enough to implement by hand:
//!
//! ```
//! use composable_interactions_core::attributes::{self, AttributeError, Attributes};
//! use serde_json::Value;
//!
//! #[derive(Default)]
//! struct Signup {
//!     email: Option<String>,
//! }
//!
//! impl Attributes for Signup {
//!     fn attribute_names() -> &'static [&'static str] {
//!         &["email"]
//!     }
//!
//!     fn get_attribute(&self, name: &str) -> Result<Value, AttributeError> {
//!         match name {
//!             "email" => attributes::to_value(name, &self.email),
//!             _ => Err(AttributeError::Unknown(name.to_string())),
//!         }
//!     }
//!
//!     fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), AttributeError> {
//!         match name {
//!             "email" => attributes::from_value(name, value).map(|v| self.email = v),
//!             _ => Err(AttributeError::Unknown(name.to_string())),
//!         }
//!     }
//! }
//!
//! let mut signup = Signup::default();
//! signup.set_attribute("email", "a@example.com".into()).unwrap();
//! assert_eq!(signup.get_attribute("email").unwrap(), "a@example.com");
//! ```

use crate::nested::NestedRelation;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised by attribute access.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// The name is not a declared attribute of this interaction
    #[error("Unknown attribute: {0}")]
    Unknown(String),

    /// The name refers to a nested relation slot, not a scalar attribute
    #[error("Attribute '{0}' is a nested relation and has no scalar value")]
    Relation(String),

    /// The value could not be converted to or from the attribute's type
    #[error("Attribute '{attribute}' could not be converted: {reason}")]
    Conversion {
        /// The attribute being read or written
        attribute: String,
        /// Why the conversion failed
        reason: String,
    },
}

/// Schema-bound key/value view over an interaction's fields.
///
/// Reading or writing a name outside [`Attributes::attribute_names`] is an
/// error rather than a fallback to some other property.
pub trait Attributes {
    /// Declared scalar attribute names, in declaration order
    fn attribute_names() -> &'static [&'static str];

    /// Current value of a declared attribute
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::Unknown`] for undeclared names and
    /// [`AttributeError::Relation`] for nested relation slots.
    fn get_attribute(&self, name: &str) -> Result<Value, AttributeError>;

    /// Assign a declared attribute from a raw value
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::Unknown`] for undeclared names and
    /// [`AttributeError::Conversion`] when the value has the wrong shape.
    fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), AttributeError>;

    /// Names of the nested relation slots, in declaration order
    fn relation_names() -> &'static [&'static str] {
        &[]
    }

    /// Nested relation slots keyed by attribute name
    fn relations(&self) -> Vec<(&'static str, &dyn NestedRelation)> {
        Vec::new()
    }

    /// Mutable nested relation slots keyed by attribute name
    fn relations_mut(&mut self) -> Vec<(&'static str, &mut dyn NestedRelation)> {
        Vec::new()
    }

    /// Whether `name` is a scalar attribute or a relation slot
    fn has_attribute(name: &str) -> bool {
        Self::attribute_names().contains(&name) || Self::relation_names().contains(&name)
    }

    /// Snapshot of every scalar attribute
    fn snapshot(&self) -> Map<String, Value> {
        Self::attribute_names()
            .iter()
            .filter_map(|name| {
                self.get_attribute(name)
                    .ok()
                    .map(|value| ((*name).to_string(), value))
            })
            .collect()
    }
}

/// Serialize a field into an attribute value
///
/// # Errors
///
/// Returns [`AttributeError::Conversion`] if the field cannot be serialized.
pub fn to_value<T: Serialize>(attribute: &str, field: &T) -> Result<Value, AttributeError> {
    serde_json::to_value(field).map_err(|e| AttributeError::Conversion {
        attribute: attribute.to_string(),
        reason: e.to_string(),
    })
}

/// Deserialize an attribute value into a field
///
/// # Errors
///
/// Returns [`AttributeError::Conversion`] if the value has the wrong shape.
pub fn from_value<T: DeserializeOwned>(attribute: &str, value: Value) -> Result<T, AttributeError> {
    serde_json::from_value(value).map_err(|e| AttributeError::Conversion {
        attribute: attribute.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Profile {
        name: Option<String>,
        age: Option<i64>,
    }

    impl Attributes for Profile {
        fn attribute_names() -> &'static [&'static str] {
            &["name", "age"]
        }

        fn get_attribute(&self, name: &str) -> Result<Value, AttributeError> {
            match name {
                "name" => to_value(name, &self.name),
                "age" => to_value(name, &self.age),
                _ => Err(AttributeError::Unknown(name.to_string())),
            }
        }

        fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), AttributeError> {
            match name {
                "name" => from_value(name, value).map(|v| self.name = v),
                "age" => from_value(name, value).map(|v| self.age = v),
                _ => Err(AttributeError::Unknown(name.to_string())),
            }
        }
    }

    #[test]
    fn test_set_and_get_declared_attribute() {
        let mut profile = Profile::default();
        assert!(profile.set_attribute("age", json!(42)).is_ok());
        assert_eq!(profile.get_attribute("age"), Ok(json!(42)));
        assert_eq!(profile.get_attribute("name"), Ok(Value::Null));
    }

    #[test]
    fn test_unknown_attribute_is_rejected() {
        let mut profile = Profile::default();
        assert_eq!(
            profile.set_attribute("nickname", json!("x")),
            Err(AttributeError::Unknown("nickname".to_string()))
        );
        assert!(!Profile::has_attribute("nickname"));
        assert!(Profile::has_attribute("name"));
    }

    #[test]
    fn test_wrong_shape_is_conversion_error() {
        let mut profile = Profile::default();
        let result = profile.set_attribute("age", json!("forty"));
        assert!(matches!(result, Err(AttributeError::Conversion { attribute, .. }) if attribute == "age"));
        assert_eq!(profile.age, None);
    }

    #[test]
    fn test_snapshot_lists_every_attribute() {
        let profile = Profile {
            name: Some("Ada".to_string()),
            age: None,
        };
        let snapshot = profile.snapshot();
        assert_eq!(snapshot.get("name"), Some(&json!("Ada")));
        assert_eq!(snapshot.get("age"), Some(&Value::Null));
        assert_eq!(snapshot.len(), 2);
    }
}
