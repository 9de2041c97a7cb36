//! Validation rules, schema, and the validator capability.
//!
//! An interaction declares [`Rule`]s; at construction they are folded into a
//! [`Schema`] (attribute → rules) which stays immutable for the lifetime of
//! the instance. Turning a rule into messages is delegated to a [`Validator`].
//! [`RuleValidator`] is the built-in engine; embedding environments can plug
//! in their own.

use crate::attributes::Attributes;
use crate::errors::Errors;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Custom check: returns a message when the value is invalid
pub type CustomCheck = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Kinds of checks a [`Rule`] can express.
#[derive(Clone)]
pub enum RuleKind {
    /// Value must be present and non-empty
    Required,

    /// Value must be a string, optionally bounded in character length
    String {
        /// Minimum number of characters
        min: Option<usize>,
        /// Maximum number of characters
        max: Option<usize>,
    },

    /// Value must be an integer (or an integer string), optionally bounded
    Integer {
        /// Smallest accepted value
        min: Option<i64>,
        /// Largest accepted value
        max: Option<i64>,
    },

    /// Value must be numeric
    Number,

    /// Value must be a boolean
    Boolean,

    /// Value must be a keyed map
    Object,

    /// Value must be a list
    Array,

    /// Value must be one of the listed values
    In(Vec<Value>),

    /// Arbitrary check
    Custom(CustomCheck),
}

impl fmt::Debug for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "Required"),
            Self::String { min, max } => f
                .debug_struct("String")
                .field("min", min)
                .field("max", max)
                .finish(),
            Self::Integer { min, max } => f
                .debug_struct("Integer")
                .field("min", min)
                .field("max", max)
                .finish(),
            Self::Number => write!(f, "Number"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Object => write!(f, "Object"),
            Self::Array => write!(f, "Array"),
            Self::In(values) => f.debug_tuple("In").field(values).finish(),
            Self::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}

/// A check applied to one or more attributes.
///
/// # Example
///
/// ```
/// use composable_interactions_core::validation::Rule;
///
/// let rules = vec![
///     Rule::required(&["email", "password"]),
///     Rule::string(&["password"]).min(8),
///     Rule::integer(&["age"]).min(18).message("Adults only."),
/// ];
/// assert_eq!(rules.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Rule {
    attributes: Vec<&'static str>,
    kind: RuleKind,
    message: Option<String>,
}

impl Rule {
    /// Rule of an arbitrary kind
    #[must_use]
    pub fn new(attributes: &[&'static str], kind: RuleKind) -> Self {
        Self {
            attributes: attributes.to_vec(),
            kind,
            message: None,
        }
    }

    /// Attributes must be present
    #[must_use]
    pub fn required(attributes: &[&'static str]) -> Self {
        Self::new(attributes, RuleKind::Required)
    }

    /// Attributes must be strings
    #[must_use]
    pub fn string(attributes: &[&'static str]) -> Self {
        Self::new(attributes, RuleKind::String { min: None, max: None })
    }

    /// Attributes must be integers
    #[must_use]
    pub fn integer(attributes: &[&'static str]) -> Self {
        Self::new(attributes, RuleKind::Integer { min: None, max: None })
    }

    /// Attributes must be numbers
    #[must_use]
    pub fn number(attributes: &[&'static str]) -> Self {
        Self::new(attributes, RuleKind::Number)
    }

    /// Attributes must be booleans
    #[must_use]
    pub fn boolean(attributes: &[&'static str]) -> Self {
        Self::new(attributes, RuleKind::Boolean)
    }

    /// Attributes must be keyed maps
    #[must_use]
    pub fn object(attributes: &[&'static str]) -> Self {
        Self::new(attributes, RuleKind::Object)
    }

    /// Attributes must be lists
    #[must_use]
    pub fn array(attributes: &[&'static str]) -> Self {
        Self::new(attributes, RuleKind::Array)
    }

    /// Attributes must be one of `values`
    #[must_use]
    pub fn one_of(attributes: &[&'static str], values: Vec<Value>) -> Self {
        Self::new(attributes, RuleKind::In(values))
    }

    /// Attributes must pass `check`
    #[must_use]
    pub fn custom<F>(attributes: &[&'static str], check: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        Self::new(attributes, RuleKind::Custom(Arc::new(check)))
    }

    /// Lower bound for `String` (characters) or `Integer` (value) rules
    #[must_use]
    pub fn min(mut self, bound: usize) -> Self {
        match &mut self.kind {
            RuleKind::String { min, .. } => *min = Some(bound),
            RuleKind::Integer { min, .. } => *min = i64::try_from(bound).ok(),
            _ => {},
        }
        self
    }

    /// Upper bound for `String` (characters) or `Integer` (value) rules
    #[must_use]
    pub fn max(mut self, bound: usize) -> Self {
        match &mut self.kind {
            RuleKind::String { max, .. } => *max = Some(bound),
            RuleKind::Integer { max, .. } => *max = i64::try_from(bound).ok(),
            _ => {},
        }
        self
    }

    /// Replace the generated message
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attributes this rule applies to
    #[must_use]
    pub fn attributes(&self) -> &[&'static str] {
        &self.attributes
    }

    /// The check this rule performs
    #[must_use]
    pub const fn kind(&self) -> &RuleKind {
        &self.kind
    }

    /// Custom message, if any
    #[must_use]
    pub fn custom_message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Errors raised while building a [`Schema`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A rule names an attribute the interaction does not declare
    #[error("Rule references undeclared attribute '{attribute}' on {form}")]
    UnknownAttribute {
        /// Form name of the interaction
        form: String,
        /// The undeclared attribute
        attribute: String,
    },
}

/// Immutable mapping of attribute name to declared rules.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entries: Vec<(&'static str, Vec<Rule>)>,
}

impl Schema {
    /// Build a schema for `declared` attributes from `rules`
    ///
    /// Every declared attribute gets an entry (possibly with no rules), so it
    /// stays bindable.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownAttribute`] if a rule names an attribute
    /// outside `declared`.
    pub fn from_rules(
        form: &str,
        declared: &[&'static str],
        rules: Vec<Rule>,
    ) -> Result<Self, SchemaError> {
        let mut entries: Vec<(&'static str, Vec<Rule>)> =
            declared.iter().map(|name| (*name, Vec::new())).collect();

        for rule in rules {
            for attribute in &rule.attributes {
                let Some((_, attribute_rules)) =
                    entries.iter_mut().find(|(name, _)| name == attribute)
                else {
                    return Err(SchemaError::UnknownAttribute {
                        form: form.to_string(),
                        attribute: (*attribute).to_string(),
                    });
                };
                attribute_rules.push(rule.clone());
            }
        }

        Ok(Self { entries })
    }

    /// Attribute names covered by this schema
    pub fn attributes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    /// Whether `attribute` is part of the schema
    #[must_use]
    pub fn contains(&self, attribute: &str) -> bool {
        self.entries.iter().any(|(name, _)| *name == attribute)
    }

    /// Rules declared for `attribute`
    #[must_use]
    pub fn rules_for(&self, attribute: &str) -> &[Rule] {
        self.entries
            .iter()
            .find(|(name, _)| *name == attribute)
            .map(|(_, rules)| rules.as_slice())
            .unwrap_or_default()
    }

    /// Run every rule against the current attribute values
    pub fn validate<A: Attributes>(&self, attributes: &A, validator: &dyn Validator) -> Errors {
        let mut errors = Errors::new();
        for (name, rules) in &self.entries {
            let value = attributes.get_attribute(name).ok();
            for rule in rules {
                let messages = validator.validate_field(name, value.as_ref(), rule);
                errors.add_all(name, messages);
            }
        }
        errors
    }
}

/// Validation-rule engine capability.
///
/// Turns one rule applied to one attribute value into zero or more messages.
pub trait Validator: Send + Sync {
    /// Validate `value` of `attribute` against `rule`
    fn validate_field(&self, attribute: &str, value: Option<&Value>, rule: &Rule) -> Vec<String>;
}

/// Built-in validator for [`RuleKind`].
///
/// Only `Required` inspects absent or empty values; every other kind skips
/// them, so optional attributes need no special casing.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleValidator;

impl Validator for RuleValidator {
    fn validate_field(&self, attribute: &str, value: Option<&Value>, rule: &Rule) -> Vec<String> {
        let label = label(attribute);
        let empty = value.is_none_or(is_empty);

        let failure = match rule.kind() {
            RuleKind::Required => empty.then(|| format!("{label} cannot be blank.")),
            _ if empty => None,
            RuleKind::String { min, max } => value.and_then(|v| check_string(&label, v, *min, *max)),
            RuleKind::Integer { min, max } => value.and_then(|v| check_integer(&label, v, *min, *max)),
            RuleKind::Number => value
                .filter(|v| as_f64(v).is_none())
                .map(|_| format!("{label} must be a number.")),
            RuleKind::Boolean => value
                .filter(|v| !v.is_boolean())
                .map(|_| format!("{label} must be either true or false.")),
            RuleKind::Object => value
                .filter(|v| !v.is_object())
                .map(|_| format!("{label} must be an object.")),
            RuleKind::Array => value
                .filter(|v| !v.is_array())
                .map(|_| format!("{label} must be an array.")),
            RuleKind::In(allowed) => value
                .filter(|v| !allowed.contains(v))
                .map(|_| format!("{label} is invalid.")),
            RuleKind::Custom(check) => value.and_then(|v| check(v)),
        };

        failure
            .map(|generated| rule.custom_message().map_or(generated, str::to_string))
            .into_iter()
            .collect()
    }
}

/// Human label for an attribute: `first_name` → `First Name`
#[must_use]
pub fn label(attribute: &str) -> String {
    attribute
        .split(['_', '-'])
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn check_string(label: &str, value: &Value, min: Option<usize>, max: Option<usize>) -> Option<String> {
    let Some(s) = value.as_str() else {
        return Some(format!("{label} must be a string."));
    };
    let length = s.chars().count();
    if let Some(min) = min.filter(|min| length < *min) {
        return Some(format!("{label} should contain at least {min} characters."));
    }
    if let Some(max) = max.filter(|max| length > *max) {
        return Some(format!("{label} should contain at most {max} characters."));
    }
    None
}

fn check_integer(label: &str, value: &Value, min: Option<i64>, max: Option<i64>) -> Option<String> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let Some(n) = parsed else {
        return Some(format!("{label} must be an integer."));
    };
    if let Some(min) = min.filter(|min| n < *min) {
        return Some(format!("{label} must be no less than {min}."));
    }
    if let Some(max) = max.filter(|max| n > *max) {
        return Some(format!("{label} must be no greater than {max}."));
    }
    None
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
