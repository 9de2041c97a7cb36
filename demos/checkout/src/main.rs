//! Checkout Demo - nested interactions end to end
//!
//! A `Checkout` interaction owns a `many` relation of line items and a `one`
//! relation for the shipping address. Execution is wrapped in a transaction,
//! and the run outcomes are exported as Prometheus text at the end.
//!
//! # Running the Example
//!
//! ```bash
//! RUST_LOG=debug cargo run -p checkout-demo
//! ```
//!
//! Pipeline policies can be overridden with `INTERACTIONS_*` variables, e.g.
//! `INTERACTIONS_BUBBLE_NESTED_ERRORS=true`.

#![allow(missing_docs)]

use composable_interactions_core::validation::Rule;
use composable_interactions_core::{
    Errors, EventContext, ExecutionContext, Interaction, InteractionConfig, LifecycleEvent,
    LifecycleEventBus,
};
use composable_interactions_macros::Attributes;
use composable_interactions_runtime::metrics::MetricsExporter;
use composable_interactions_runtime::{
    ActiveInteraction, IsolationLevel, Many, One, Transaction, TransactionError,
    TransactionManager, TransactionWrap,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, thiserror::Error)]
enum CheckoutError {
    #[error("Payment declined for {customer}")]
    PaymentDeclined { customer: String },
}

// Line items

#[derive(Debug, Clone, Default)]
struct Pricing {
    unit_price: Option<u64>,
    in_stock: Option<i64>,
}

#[derive(Attributes, Default, Debug)]
struct AddLineItem {
    sku: Option<String>,
    quantity: Option<i64>,
    #[attributes(skip)]
    pricing: Pricing,
}

impl Interaction for AddLineItem {
    type Output = u64;
    type Params = Pricing;
    type Error = CheckoutError;

    fn form_name() -> &'static str {
        "AddLineItem"
    }

    fn rules() -> Vec<Rule> {
        vec![
            Rule::required(&["sku", "quantity"]),
            Rule::string(&["sku"]).min(3).max(12),
            Rule::integer(&["quantity"]).min(1).max(20),
        ]
    }

    fn prepare(&mut self, pricing: Pricing) {
        self.pricing = pricing;
    }

    fn check(&self, errors: &mut Errors) {
        if let (Some(in_stock), Some(quantity)) = (self.pricing.in_stock, self.quantity) {
            if quantity > in_stock {
                errors.add("quantity", format!("Only {in_stock} left in stock."));
            }
        }
    }

    async fn execute(&mut self, _ctx: &mut ExecutionContext<'_>) -> Result<u64, CheckoutError> {
        let quantity = u64::try_from(self.quantity.unwrap_or_default()).unwrap_or_default();
        let subtotal = self.pricing.unit_price.unwrap_or_default() * quantity;
        tracing::info!(sku = ?self.sku, quantity, subtotal, "Line item added");
        Ok(subtotal)
    }
}

// Shipping address

#[derive(Attributes, Default, Debug)]
struct ShippingAddress {
    street: Option<String>,
    city: Option<String>,
    country: Option<String>,
}

impl Interaction for ShippingAddress {
    type Output = String;
    type Params = ();
    type Error = CheckoutError;

    fn form_name() -> &'static str {
        "ShippingAddress"
    }

    fn rules() -> Vec<Rule> {
        vec![
            Rule::required(&["street", "city", "country"]),
            Rule::one_of(&["country"], vec![json!("NO"), json!("SE"), json!("DK")]),
        ]
    }

    async fn execute(&mut self, _ctx: &mut ExecutionContext<'_>) -> Result<String, CheckoutError> {
        Ok(format!(
            "{}, {} ({})",
            self.street.as_deref().unwrap_or_default(),
            self.city.as_deref().unwrap_or_default(),
            self.country.as_deref().unwrap_or_default()
        ))
    }
}

// Checkout

#[derive(Debug)]
struct Receipt {
    total: u64,
    lines: Vec<Option<u64>>,
    ship_to: Option<String>,
}

#[derive(Attributes, Default)]
struct Checkout {
    customer: Option<String>,
    coupon: Option<String>,
    #[nested]
    items: Many<AddLineItem>,
    #[nested]
    shipping: One<ShippingAddress>,
    #[attributes(skip)]
    catalog: HashMap<String, (u64, i64)>,
}

struct Catalog(HashMap<String, (u64, i64)>);

impl Default for Catalog {
    fn default() -> Self {
        Self(
            [("APPLE", (120, 40)), ("PEAR", (90, 3)), ("MANGO", (310, 10))]
                .into_iter()
                .map(|(sku, entry)| (sku.to_string(), entry))
                .collect(),
        )
    }
}

fn transactions() -> Arc<dyn TransactionManager> {
    static MANAGER: OnceLock<Arc<dyn TransactionManager>> = OnceLock::new();
    Arc::clone(MANAGER.get_or_init(|| Arc::new(LoggingTransactions)))
}

impl Interaction for Checkout {
    type Output = Receipt;
    type Params = Catalog;
    type Error = CheckoutError;

    fn form_name() -> &'static str {
        "Checkout"
    }

    fn rules() -> Vec<Rule> {
        vec![
            Rule::required(&["customer"]),
            Rule::string(&["customer", "coupon"]).max(40),
        ]
    }

    fn config() -> InteractionConfig {
        InteractionConfig::from_env().unwrap_or_else(|error| {
            tracing::warn!(%error, "Ignoring invalid interaction configuration");
            InteractionConfig::default()
        })
    }

    fn behaviors(bus: &mut LifecycleEventBus<Self>) {
        bus.attach(TransactionWrap::new(transactions()).with_isolation(IsolationLevel::RepeatableRead))
            .subscribe(LifecycleEvent::OnErrors, |ctx: &EventContext<'_, Checkout>| {
                tracing::warn!(form = ctx.form_name(), errors = %ctx.errors().to_json(), "Checkout failed");
            });
    }

    fn prepare(&mut self, catalog: Catalog) {
        self.catalog = catalog.0;
    }

    async fn execute(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<Receipt, CheckoutError> {
        let customer = self.customer.clone().unwrap_or_default();
        if customer == "mallory" {
            return Err(CheckoutError::PaymentDeclined { customer });
        }

        let catalog = &self.catalog;
        let lines = self
            .items
            .execute_with(|_, item| {
                let entry = item.inner().sku.as_ref().and_then(|sku| catalog.get(sku));
                item.prepare(Pricing {
                    unit_price: entry.map(|(price, _)| *price),
                    in_stock: entry.map(|(_, stock)| *stock),
                });
            })
            .await?;
        let ship_to = self.shipping.execute().await?;

        let mut total: u64 = lines.iter().flatten().sum();
        if self.coupon.as_deref() == Some("TENOFF") {
            total = total.saturating_sub(total / 10);
        }
        if lines.is_empty() {
            ctx.add_error("items", "Add at least one item.");
        }

        Ok(Receipt {
            total,
            lines,
            ship_to,
        })
    }
}

// Transactions

struct LoggingTransactions;

struct LoggedTransaction {
    isolation: Option<IsolationLevel>,
}

impl TransactionManager for LoggingTransactions {
    fn begin(
        &self,
        isolation: Option<IsolationLevel>,
    ) -> Result<Box<dyn Transaction>, TransactionError> {
        tracing::info!(isolation = ?isolation.map(|level| level.to_string()), "BEGIN");
        Ok(Box::new(LoggedTransaction { isolation }))
    }
}

impl Transaction for LoggedTransaction {
    fn commit(self: Box<Self>) -> Result<(), TransactionError> {
        tracing::info!(isolation = ?self.isolation, "COMMIT");
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), TransactionError> {
        tracing::info!(isolation = ?self.isolation, "ROLLBACK");
        Ok(())
    }
}

async fn checkout(label: &str, input: serde_json::Value) -> anyhow::Result<()> {
    let mut order = ActiveInteraction::create(Checkout::default(), Catalog::default())?;
    tracing::info!(scenario = label, "Running checkout");

    match order.run(input).await {
        Ok(order) if order.is_success() => {
            if let Some(receipt) = order.result() {
                tracing::info!(
                    scenario = label,
                    total = receipt.total,
                    lines = ?receipt.lines,
                    ship_to = ?receipt.ship_to,
                    "Checkout succeeded"
                );
            }
        },
        Ok(order) => {
            tracing::warn!(
                scenario = label,
                state = %order.state(),
                errors = %order.collect_errors().to_json(),
                "Checkout did not succeed"
            );
        },
        Err(error) => tracing::error!(scenario = label, %error, "Checkout raised"),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,composable_interactions_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install the Prometheus recorder
    let mut exporter = MetricsExporter::new();
    exporter.install()?;

    // 3. A clean checkout
    checkout(
        "happy path",
        json!({
            "Checkout": { "customer": "ada", "coupon": "TENOFF" },
            "AddLineItem": [
                { "sku": "APPLE", "quantity": 3 },
                { "sku": "MANGO", "quantity": 1 },
            ],
            "ShippingAddress": { "street": "Storgata 1", "city": "Oslo", "country": "NO" },
        }),
    )
    .await?;

    // 4. Field errors on the parent and on a child
    checkout(
        "invalid input",
        json!({
            "coupon": "TENOFF",
            "AddLineItem": [{ "sku": "AP", "quantity": 0 }],
            "ShippingAddress": { "street": "Storgata 1", "city": "Oslo", "country": "US" },
        }),
    )
    .await?;

    // 5. One line runs out of stock at execute time
    checkout(
        "partial stock",
        json!({
            "customer": "grace",
            "AddLineItem": [
                { "sku": "APPLE", "quantity": 1 },
                { "sku": "PEAR", "quantity": 5 },
                { "sku": "MANGO", "quantity": 2 },
            ],
            "ShippingAddress": { "street": "Drottninggatan 9", "city": "Stockholm", "country": "SE" },
        }),
    )
    .await?;

    // 6. Business logic raises
    checkout(
        "declined",
        json!({
            "customer": "mallory",
            "AddLineItem": [{ "sku": "APPLE", "quantity": 1 }],
            "ShippingAddress": { "street": "Nyhavn 2", "city": "Copenhagen", "country": "DK" },
        }),
    )
    .await?;

    // 7. Nothing submitted yet
    checkout("waiting", json!({})).await?;

    if let Some(text) = exporter.render() {
        println!("{text}");
    }

    Ok(())
}
