//! Shared interactions for the runtime integration tests.

#![allow(dead_code)]

use composable_interactions_core::validation::Rule;
use composable_interactions_core::{Errors, ExecutionContext, Interaction};
use composable_interactions_macros::Attributes;
use composable_interactions_runtime::{Many, One};
use std::collections::HashMap;

/// Stock levels handed to each line at execute time.
#[derive(Debug, Clone, Default)]
pub struct Stock {
    pub available: Option<i64>,
}

#[derive(Attributes, Default, Debug)]
pub struct ReserveLine {
    pub sku: Option<String>,
    pub quantity: Option<i64>,
    #[attributes(skip)]
    pub available: Option<i64>,
}

impl Interaction for ReserveLine {
    type Output = String;
    type Params = Stock;
    type Error = String;

    fn form_name() -> &'static str {
        "ReserveLine"
    }

    fn rules() -> Vec<Rule> {
        vec![
            Rule::required(&["sku", "quantity"]),
            Rule::string(&["sku"]).min(1),
            Rule::integer(&["quantity"]).min(1),
        ]
    }

    fn prepare(&mut self, params: Stock) {
        self.available = params.available;
    }

    fn check(&self, errors: &mut Errors) {
        if let (Some(available), Some(quantity)) = (self.available, self.quantity) {
            if quantity > available {
                errors.add("quantity", format!("Only {available} left in stock."));
            }
        }
    }

    async fn execute(&mut self, _ctx: &mut ExecutionContext<'_>) -> Result<String, String> {
        let sku = self.sku.clone().unwrap_or_default();
        if sku == "EXPLODE" {
            return Err("warehouse offline".to_string());
        }
        Ok(format!("{sku}x{}", self.quantity.unwrap_or_default()))
    }
}

#[derive(Attributes, Default, Debug)]
pub struct ShippingAddress {
    pub city: Option<String>,
}

impl Interaction for ShippingAddress {
    type Output = String;
    type Params = ();
    type Error = String;

    fn form_name() -> &'static str {
        "ShippingAddress"
    }

    fn rules() -> Vec<Rule> {
        vec![Rule::required(&["city"])]
    }

    async fn execute(&mut self, _ctx: &mut ExecutionContext<'_>) -> Result<String, String> {
        Ok(self.city.clone().unwrap_or_default())
    }
}

/// What a successful reservation hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub lines: Vec<Option<String>>,
    pub ship_to: Option<String>,
}

#[derive(Attributes, Default)]
pub struct ReserveOrder {
    pub customer: Option<String>,
    #[nested]
    pub lines: Many<ReserveLine>,
    #[nested]
    pub shipping: One<ShippingAddress>,
    #[attributes(skip)]
    pub stock: HashMap<String, i64>,
}

#[derive(Default)]
pub struct Warehouse {
    pub stock: HashMap<String, i64>,
}

impl Interaction for ReserveOrder {
    type Output = Reservation;
    type Params = Warehouse;
    type Error = String;

    fn form_name() -> &'static str {
        "ReserveOrder"
    }

    fn rules() -> Vec<Rule> {
        vec![Rule::required(&["customer"])]
    }

    fn prepare(&mut self, params: Warehouse) {
        self.stock = params.stock;
    }

    async fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<Reservation, String> {
        let stock = &self.stock;
        let lines = self
            .lines
            .execute_with(|_, line| {
                let available = line
                    .inner()
                    .sku
                    .as_ref()
                    .and_then(|sku| stock.get(sku))
                    .copied();
                line.prepare(Stock { available });
            })
            .await?;

        let ship_to = self.shipping.execute().await?;

        if lines.iter().all(Option::is_none) && !lines.is_empty() {
            ctx.add_error("lines", "Nothing could be reserved.");
        }

        Ok(Reservation { lines, ship_to })
    }
}

/// Stock with plenty of everything used in the scenarios.
pub fn plenty() -> HashMap<String, i64> {
    [("A", 10), ("B", 10), ("C", 10)]
        .into_iter()
        .map(|(sku, qty)| (sku.to_string(), qty))
        .collect()
}
