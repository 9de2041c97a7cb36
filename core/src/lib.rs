//! # Composable Interactions Core
//!
//! Core traits and types for composable, self-validating interactions.
//!
//! An *interaction* encapsulates a single business operation as a command
//! object with a fixed lifecycle: construct → bind input → validate →
//! execute → publish outcome. Interactions can own child interactions
//! ("nested relations") whose own cycles are driven by the parent and whose
//! outcomes fold into the parent's success.
//!
//! This crate holds the vocabulary; the pipeline that drives it lives in the
//! runtime crate.
//!
//! ## Core Concepts
//!
//! - **Attributes**: Schema-bound name → accessor map over an interaction's fields
//! - **Schema**: Attribute → validation rules, fixed at construction
//! - **Validator**: Capability turning a rule and a value into messages
//! - **Input**: Raw payload plus its normalisation into a keyed map
//! - **Lifecycle events**: Named hook points and the per-instance event bus
//! - **Nested relations**: Object-safe view over `one` / `many` child slots
//! - **Interaction**: The trait concrete business operations implement
//!
//! ## Architecture Principles
//!
//! - Typed attributes, no dynamic property fallback
//! - Explicit prepare parameters, no name-based hook resolution
//! - Cross-cutting behavior attaches through events, never through the pipeline
//! - Business-logic failures propagate; validation failures become data
//!
//! ## Example
//!
//! ```ignore
//! use composable_interactions_core::*;
//!
//! #[derive(Attributes, Default)]
//! struct PlaceOrder {
//!     customer_id: Option<i64>,
//!     #[nested]
//!     items: Many<AddLineItem>,
//! }
//!
//! impl Interaction for PlaceOrder {
//!     type Output = OrderId;
//!     type Params = ();
//!     type Error = OrderError;
//!
//!     fn form_name() -> &'static str {
//!         "PlaceOrder"
//!     }
//!
//!     fn rules() -> Vec<Rule> {
//!         vec![Rule::required(&["customer_id"]), Rule::integer(&["customer_id"])]
//!     }
//!
//!     async fn execute(&mut self, _ctx: &mut ExecutionContext<'_>) -> Result<OrderId, OrderError> {
//!         let lines = self.items.execute().await?;
//!         // ...
//!     }
//! }
//! ```

// Re-export commonly used types
pub use serde_json::{Map, Value};

/// Attribute store contract
pub mod attributes;

/// Interaction configuration
pub mod config;

/// Field-level validation errors
pub mod errors;

/// Lifecycle events and handler outcomes
pub mod event;

/// Per-instance lifecycle event bus
pub mod event_bus;

/// Raw input and its normalisation
pub mod input;

/// The interaction trait and lifecycle vocabulary
pub mod interaction;

/// Nested relation capability
pub mod nested;

/// Validation rules, schema, and validator capability
pub mod validation;

pub use attributes::{AttributeError, Attributes};
pub use config::{ConfigError, InteractionConfig};
pub use errors::Errors;
pub use event::{EventContext, EventOutcome, LifecycleEvent};
pub use event_bus::{Behavior, LifecycleEventBus, LifecycleHandler};
pub use input::Input;
pub use interaction::{ExecutionContext, Interaction, LifecycleState, PrepareOutcome};
pub use nested::{Cardinality, NestedRelation};
pub use validation::{Rule, RuleKind, RuleValidator, Schema, SchemaError, Validator};
