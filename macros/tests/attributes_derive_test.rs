//! Tests for #[derive(Attributes)] macro

use composable_interactions_core::attributes::{AttributeError, Attributes};
use composable_interactions_core::nested::{Cardinality, NestedRelation};
use composable_interactions_core::{ExecutionContext, Interaction};
use composable_interactions_macros::Attributes;
use composable_interactions_runtime::{Many, One};
use serde_json::json;

#[derive(Attributes, Default, Debug)]
struct AddLineItem {
    sku: Option<String>,
    quantity: Option<i64>,
}

impl Interaction for AddLineItem {
    type Output = ();
    type Params = ();
    type Error = String;

    fn form_name() -> &'static str {
        "AddLineItem"
    }

    async fn execute(&mut self, _ctx: &mut ExecutionContext<'_>) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Attributes, Default)]
struct Address {
    city: Option<String>,
}

impl Interaction for Address {
    type Output = ();
    type Params = ();
    type Error = String;

    fn form_name() -> &'static str {
        "Address"
    }

    async fn execute(&mut self, _ctx: &mut ExecutionContext<'_>) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Attributes, Default)]
struct PlaceOrder {
    customer_id: Option<i64>,
    #[attributes(rename = "note")]
    comment: Option<String>,
    #[attributes(skip)]
    attempts: u32,
    #[nested]
    items: Many<AddLineItem>,
    #[nested]
    shipping: One<Address>,
}

#[derive(Attributes, Default)]
struct Empty {}

#[test]
fn test_declared_names() {
    assert_eq!(PlaceOrder::attribute_names(), &["customer_id", "note"]);
    assert_eq!(PlaceOrder::relation_names(), &["items", "shipping"]);
    assert!(PlaceOrder::has_attribute("items"));
    assert!(!PlaceOrder::has_attribute("attempts"));
    assert!(!PlaceOrder::has_attribute("comment"));
}

#[test]
fn test_get_and_set() -> Result<(), AttributeError> {
    let mut order = PlaceOrder::default();
    order.set_attribute("customer_id", json!(7))?;
    order.set_attribute("note", json!("leave at door"))?;

    assert_eq!(order.customer_id, Some(7));
    assert_eq!(order.comment.as_deref(), Some("leave at door"));
    assert_eq!(order.get_attribute("note")?, json!("leave at door"));
    assert_eq!(order.attempts, 0);
    Ok(())
}

#[test]
fn test_unknown_and_relation_names_are_rejected() {
    let mut order = PlaceOrder::default();

    assert_eq!(
        order.get_attribute("attempts"),
        Err(AttributeError::Unknown("attempts".to_string()))
    );
    assert_eq!(
        order.set_attribute("items", json!([])),
        Err(AttributeError::Relation("items".to_string()))
    );
    assert!(matches!(
        order.set_attribute("customer_id", json!("seven")),
        Err(AttributeError::Conversion { .. })
    ));
}

#[test]
fn test_relations_are_exposed() {
    let mut order = PlaceOrder::default();

    let kinds: Vec<(&str, Cardinality, &str)> = order
        .relations()
        .into_iter()
        .map(|(name, relation)| (name, relation.cardinality(), relation.form_name()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("items", Cardinality::Many, "AddLineItem"),
            ("shipping", Cardinality::One, "Address"),
        ]
    );

    for (_, relation) in order.relations_mut() {
        relation.load_from(Some(&json!([{ "sku": "A-1" }])));
    }
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items.iter().next().and_then(|item| item.sku.as_deref()), Some("A-1"));
}

#[test]
fn test_snapshot_holds_scalars_only() {
    let order = PlaceOrder {
        customer_id: Some(3),
        ..PlaceOrder::default()
    };

    let snapshot = order.snapshot();
    assert_eq!(snapshot.get("customer_id"), Some(&json!(3)));
    assert_eq!(snapshot.get("note"), Some(&json!(null)));
    assert!(!snapshot.contains_key("items"));
}

#[test]
fn test_empty_struct() {
    let empty = Empty {};
    assert!(Empty::attribute_names().is_empty());
    assert!(empty.relations().is_empty());
}
