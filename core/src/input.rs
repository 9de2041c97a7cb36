//! Raw input and its normalisation into a keyed map.
//!
//! Callers hand interactions loosely shaped payloads. Before binding, the
//! payload is normalised into one keyed map by applying, in order:
//!
//! 1. **Indexed collection**: a list whose first element is a map, or a map
//!    holding a map under the key `"0"`. The first map is taken and any other
//!    keyed entries of the outer payload are merged over it.
//! 2. **Form scoping**: if the result has a key equal to the interaction's
//!    form name whose value is a map, that map is removed and merged over the
//!    outer map, shadowing top-level keys of the same name.
//!
//! The precedence matters to call sites that embed an interaction's payload
//! inside a larger request.

use serde_json::{Map, Value};

/// Key under which an indexed collection keeps its first element.
const FIRST_INDEX: &str = "0";

/// Raw payload supplied to `load` / `run`.
///
/// # Example
///
/// ```
/// use composable_interactions_core::input::Input;
/// use serde_json::json;
///
/// let input = Input::from(json!({
///     "name": "outer",
///     "Signup": { "name": "inner", "email": "a@example.com" },
/// }));
///
/// let data = input.normalize("Signup");
/// assert_eq!(data["name"], "inner");
/// assert_eq!(data["email"], "a@example.com");
/// assert!(!data.contains_key("Signup"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Input(Value);

impl Input {
    /// No input at all
    #[must_use]
    pub const fn none() -> Self {
        Self(Value::Null)
    }

    /// Wrap a raw value
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// The raw value as supplied
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.0
    }

    /// Consume into the raw value
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// True when the payload carries nothing to bind
    ///
    /// Null, `false`, zero, `""`, `"0"`, an empty map and an empty list all
    /// count as empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Bool(flag) => !flag,
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::String(s) => s.is_empty() || s == "0",
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
        }
    }

    /// Normalise into a keyed map for the interaction named `form_name`
    #[must_use]
    pub fn normalize(&self, form_name: &str) -> Map<String, Value> {
        normalize(&self.0, form_name)
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<Map<String, Value>> for Input {
    fn from(map: Map<String, Value>) -> Self {
        Self(Value::Object(map))
    }
}

impl From<Option<Value>> for Input {
    fn from(value: Option<Value>) -> Self {
        Self(value.unwrap_or(Value::Null))
    }
}

/// Normalise a raw payload into a keyed map (see the module docs).
#[must_use]
pub fn normalize(value: &Value, form_name: &str) -> Map<String, Value> {
    let mut data = flatten_indexed(value);

    if matches!(data.get(form_name), Some(Value::Object(_))) {
        if let Some(Value::Object(scoped)) = data.remove(form_name) {
            for (key, value) in scoped {
                data.insert(key, value);
            }
        }
    }

    data
}

fn flatten_indexed(value: &Value) -> Map<String, Value> {
    match value {
        Value::Array(items) => match items.first() {
            Some(Value::Object(first)) => first.clone(),
            _ => Map::new(),
        },
        Value::Object(map) => match map.get(FIRST_INDEX) {
            Some(Value::Object(first)) => {
                let mut merged = first.clone();
                for (key, value) in map {
                    // Positional keys never name attributes
                    if key.parse::<usize>().is_err() {
                        merged.insert(key.clone(), value.clone());
                    }
                }
                merged
            },
            _ => map.clone(),
        },
        _ => Map::new(),
    }
}

/// Positional entries of a `many` sub-payload, in submission order.
///
/// A list yields its items; a keyed map yields its values in insertion order;
/// anything else yields nothing.
#[must_use]
pub fn entries(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_plain_map_is_unchanged() {
        let data = normalize(&json!({ "a": 1, "b": "two" }), "Form");
        assert_eq!(Value::Object(data), json!({ "a": 1, "b": "two" }));
    }

    #[test]
    fn test_list_takes_first_map() {
        let data = normalize(&json!([{ "a": 1 }, { "a": 2 }]), "Form");
        assert_eq!(Value::Object(data), json!({ "a": 1 }));
    }

    #[test]
    fn test_indexed_map_merges_keyed_entries_over_first() {
        let data = normalize(&json!({ "0": { "a": 1, "b": 1 }, "b": 2, "1": { "c": 3 } }), "Form");
        assert_eq!(data.get("a"), Some(&json!(1)));
        assert_eq!(data.get("b"), Some(&json!(2)));
        assert!(!data.contains_key("1"));
        assert!(!data.contains_key("0"));
    }

    #[test]
    fn test_form_scope_shadows_top_level() {
        let data = normalize(&json!({ "a": "outer", "c": 3, "Form": { "a": "inner", "b": 2 } }), "Form");
        assert_eq!(data.get("a"), Some(&json!("inner")));
        assert_eq!(data.get("b"), Some(&json!(2)));
        assert_eq!(data.get("c"), Some(&json!(3)));
        assert!(!data.contains_key("Form"));
    }

    #[test]
    fn test_indexed_then_form_scoped() {
        let data = normalize(&json!([{ "Form": { "a": 1 }, "a": 0 }]), "Form");
        assert_eq!(data.get("a"), Some(&json!(1)));
    }

    #[test]
    fn test_non_map_form_value_is_left_alone() {
        let data = normalize(&json!({ "Form": "scalar" }), "Form");
        assert_eq!(data.get("Form"), Some(&json!("scalar")));
    }

    #[test]
    fn test_scalar_payload_is_empty() {
        assert!(normalize(&json!(42), "Form").is_empty());
        assert!(normalize(&Value::Null, "Form").is_empty());
    }

    #[test]
    fn test_is_empty() {
        assert!(Input::none().is_empty());
        assert!(Input::from(json!({})).is_empty());
        assert!(Input::from(json!([])).is_empty());
        assert!(!Input::from(json!({ "a": null })).is_empty());
        assert!(!Input::from(json!([null])).is_empty());
    }

    #[test]
    fn test_falsy_scalars_are_empty() {
        assert!(Input::from(json!(0)).is_empty());
        assert!(Input::from(json!(0.0)).is_empty());
        assert!(Input::from(json!(false)).is_empty());
        assert!(Input::from(json!("")).is_empty());
        assert!(Input::from(json!("0")).is_empty());

        assert!(!Input::from(json!(1)).is_empty());
        assert!(!Input::from(json!(true)).is_empty());
        assert!(!Input::from(json!("0.0")).is_empty());
    }

    #[test]
    fn test_entries_preserve_submission_order() {
        let list = json!([{ "n": 1 }, { "n": 2 }]);
        assert_eq!(entries(&list).len(), 2);

        let keyed = json!({ "10": { "n": 1 }, "2": { "n": 2 } });
        let values = entries(&keyed);
        assert_eq!(values[0], &json!({ "n": 1 }));
        assert_eq!(values[1], &json!({ "n": 2 }));

        assert!(entries(&json!("x")).is_empty());
    }

    proptest! {
        #[test]
        fn prop_plain_maps_survive_normalisation(
            pairs in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..8)
        ) {
            let map: Map<String, Value> = pairs
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect();
            let raw = Value::Object(map.clone());

            prop_assert_eq!(normalize(&raw, "Form"), map.clone());
            prop_assert_eq!(normalize(&Value::Array(vec![raw]), "Form"), map);
        }

        #[test]
        fn prop_normalisation_is_idempotent(
            pairs in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..8),
            scoped in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..8),
        ) {
            let mut outer: Map<String, Value> = pairs
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect();
            let inner: Map<String, Value> = scoped
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect();
            outer.insert("Form".to_string(), Value::Object(inner));

            let once = normalize(&Value::Object(outer), "Form");
            let twice = normalize(&Value::Object(once.clone()), "Form");
            prop_assert_eq!(once, twice);
        }
    }
}
