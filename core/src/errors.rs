//! Field-level validation errors.
//!
//! [`Errors`] is the structured, non-fatal outcome of validation: an ordered
//! mapping from attribute name to the messages recorded against it. An empty
//! map means the interaction is valid.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Map;
use smallvec::SmallVec;

/// Messages recorded against a single attribute.
///
/// Most attributes carry zero or one message, so two fit inline.
pub type Messages = SmallVec<[String; 2]>;

/// Ordered mapping of attribute name to validation messages.
///
/// # Example
///
/// ```
/// use composable_interactions_core::errors::Errors;
///
/// let mut errors = Errors::new();
/// errors.add("email", "Email cannot be blank.");
/// errors.add("email", "Email is not a valid email address.");
///
/// assert!(errors.has("email"));
/// assert_eq!(errors.first("email"), Some("Email cannot be blank."));
/// assert_eq!(errors.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors {
    entries: Vec<(String, Messages)>,
}

impl Errors {
    /// Create an empty error map
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record a message against an attribute
    pub fn add(&mut self, attribute: impl Into<String>, message: impl Into<String>) {
        let attribute = attribute.into();
        let message = message.into();
        match self.entries.iter_mut().find(|(name, _)| *name == attribute) {
            Some((_, messages)) => messages.push(message),
            None => {
                let mut messages = Messages::new();
                messages.push(message);
                self.entries.push((attribute, messages));
            },
        }
    }

    /// Record several messages against an attribute
    pub fn add_all<M>(&mut self, attribute: &str, messages: M)
    where
        M: IntoIterator<Item = String>,
    {
        for message in messages {
            self.add(attribute, message);
        }
    }

    /// Merge another error map into this one, keeping message order
    pub fn extend(&mut self, other: Self) {
        for (attribute, messages) in other.entries {
            self.add_all(&attribute, messages);
        }
    }

    /// Whether any message is recorded against `attribute`
    #[must_use]
    pub fn has(&self, attribute: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == attribute)
    }

    /// All messages recorded against `attribute`
    #[must_use]
    pub fn get(&self, attribute: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, messages)| messages.as_slice())
            .unwrap_or_default()
    }

    /// The first message recorded against `attribute`
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.get(attribute).first().map(String::as_str)
    }

    /// Attribute names that carry at least one message, in recording order
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Iterate over `(attribute, messages)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, messages)| (name.as_str(), messages.as_slice()))
    }

    /// Number of attributes with errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no errors are recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every message
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove the messages recorded against `attribute`
    pub fn remove(&mut self, attribute: &str) {
        self.entries.retain(|(name, _)| name != attribute);
    }

    /// Render as a JSON object of `attribute -> [messages]`
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let map: Map<String, serde_json::Value> = self
            .entries
            .iter()
            .map(|(name, messages)| {
                (
                    name.clone(),
                    serde_json::Value::from(messages.iter().cloned().collect::<Vec<_>>()),
                )
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

impl Serialize for Errors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (attribute, messages) in &self.entries {
            map.serialize_entry(attribute, messages.as_slice())?;
        }
        map.end()
    }
}

impl<'a> IntoIterator for &'a Errors {
    type Item = (&'a str, &'a [String]);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a [String])> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_groups_messages_by_attribute() {
        let mut errors = Errors::new();
        errors.add("name", "Name cannot be blank.");
        errors.add("age", "Age must be an integer.");
        errors.add("name", "Name is too short.");

        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.get("name"),
            &["Name cannot be blank.".to_string(), "Name is too short.".to_string()]
        );
        assert_eq!(errors.attributes().collect::<Vec<_>>(), vec!["name", "age"]);
    }

    #[test]
    fn test_missing_attribute_has_no_messages() {
        let errors = Errors::new();
        assert!(errors.get("name").is_empty());
        assert_eq!(errors.first("name"), None);
        assert!(!errors.has("name"));
    }

    #[test]
    fn test_extend_and_remove() {
        let mut errors = Errors::new();
        errors.add("a", "one");

        let mut other = Errors::new();
        other.add("a", "two");
        other.add("b", "three");

        errors.extend(other);
        assert_eq!(errors.get("a").len(), 2);
        assert!(errors.has("b"));

        errors.remove("a");
        assert!(!errors.has("a"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_serializes_as_object() {
        let mut errors = Errors::new();
        errors.add("title", "Title cannot be blank.");

        let expected = serde_json::json!({ "title": ["Title cannot be blank."] });
        assert_eq!(errors.to_json(), expected);
        assert_eq!(serde_json::to_value(&errors).ok(), Some(expected));
    }
}
