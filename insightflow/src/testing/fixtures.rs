//! Dataset and invoker fixtures.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::dataset::Dataset;
use crate::invoker::FallbackInvoker;
use crate::providers::{ClientTable, EscalationLadder, LadderEntry, ProviderKind};

use super::ScriptedProviderClient;

fn records(name: &str, records: Vec<Value>) -> Dataset {
    match Dataset::from_records(name, records) {
        Ok(dataset) => dataset,
        Err(e) => panic!("fixture dataset '{name}' is malformed: {e}"),
    }
}

/// Twelve daily sales rows with a date, a region and two numeric columns.
#[must_use]
pub fn sales_dataset() -> Dataset {
    let regions = ["north", "south", "east"];
    let rows = (0..12)
        .map(|day| {
            json!({
                "order_date": format!("2024-01-{:02}", day + 1),
                "region": regions[day % regions.len()],
                "sales": 100.0 + 10.0 * day as f64,
                "quantity": 1 + day % 4,
            })
        })
        .collect();
    records("sales", rows)
}

/// Numeric and text columns but no date column.
#[must_use]
pub fn no_dates_dataset() -> Dataset {
    records(
        "inventory",
        vec![
            json!({"sku": "A-1", "category": "tools", "price": 12.5, "stock": 40}),
            json!({"sku": "B-2", "category": "garden", "price": 8.0, "stock": 15}),
            json!({"sku": "C-3", "category": "tools", "price": 30.0, "stock": 3}),
            json!({"sku": "D-4", "category": "kitchen", "price": 4.25, "stock": 120}),
        ],
    )
}

/// A dataset with no rows and no columns.
#[must_use]
pub fn empty_dataset() -> Dataset {
    records("empty", Vec::new())
}

/// An invoker whose only rung answers every request with `reply`.
#[must_use]
pub fn succeeding_invoker(reply: impl Into<String>) -> FallbackInvoker {
    let ladder = EscalationLadder::from_entries(vec![LadderEntry {
        provider: ProviderKind::Groq,
        model: "fixture-model".to_string(),
    }]);
    let client = ScriptedProviderClient::always_replying(ProviderKind::Groq, reply);
    FallbackInvoker::new(ladder, ClientTable::new().with_client(Arc::new(client)))
}

/// An invoker with one rung per provider, all of which fail.
#[must_use]
pub fn exhausted_invoker() -> FallbackInvoker {
    let ladder = EscalationLadder::from_entries(
        ProviderKind::ALL
            .into_iter()
            .map(|provider| LadderEntry {
                provider,
                model: format!("{provider}-fixture"),
            })
            .collect(),
    );
    let clients = ProviderKind::ALL.into_iter().fold(ClientTable::new(), |table, kind| {
        table.with_client(Arc::new(ScriptedProviderClient::new(kind)))
    });
    FallbackInvoker::new(ladder, clients)
}
