//! Test utilities for host types
//!
//! Provides a populated [`MemoryHost`] and a row builder shared by the host,
//! app and integration tests.

use serde_json::{json, Value};

use panelkit_core::{ChangeRequest, Item};

use crate::host::MemoryHost;

/// Build a row from a `json!` object literal
///
/// # Panics
/// If `value` is not an object.
pub fn item(value: Value) -> Item {
    match value {
        Value::Object(map) => map,
        other => panic!("test item must be an object, got {}", other),
    }
}

pub fn items(values: Vec<Value>) -> Vec<Item> {
    values.into_iter().map(item).collect()
}

/// A host with a small dataset for every built-in view
///
/// - `DataObjects`: Customer, Invoice, Order, Product
/// - `Workflows`: ApproveOrder, CancelOrder
/// - `REQ-001`: CR1 pending, CR2 approved and current, CR3 approved but stale
pub fn sample_host() -> MemoryHost {
    let mut cr2 = ChangeRequest::new("CR2", "objects[1].name", "Order", "PurchaseOrder");
    cr2.is_approved = true;
    let mut cr3 = ChangeRequest::new("CR3", "objects[0].name", "Buyer", "Shopper");
    cr3.is_approved = true;

    MemoryHost::new()
        .with_model(json!({
            "objects": [{"name": "Customer"}, {"name": "Order"}]
        }))
        .with_dataset(
            "DataObjects",
            items(vec![
                json!({"name": "Customer", "propertyCount": 12}),
                json!({"name": "Order", "propertyCount": 8}),
                json!({"name": "Invoice", "propertyCount": 5}),
                json!({"name": "Product", "propertyCount": 20}),
            ]),
        )
        .with_dataset(
            "Workflows",
            items(vec![
                json!({"flowName": "ApproveOrder", "ownerObject": "Order"}),
                json!({"flowName": "CancelOrder", "ownerObject": "Order"}),
            ]),
        )
        .with_dataset(
            "Pages",
            items(vec![json!({"name": "CustomerList", "type": "grid"})]),
        )
        .with_dataset(
            "UserStories",
            items(vec![
                json!({"storyCode": "US-1", "storyText": "As a Manager, I want to add a customer"}),
                json!({"storyCode": "US-2", "storyText": "Customers should be addable"}),
            ]),
        )
        .with_dataset(
            "CostForecast",
            items(vec![
                json!({"month": "2024-01", "amount": 120.0, "category": "Build"}),
                json!({"month": "2024-03", "amount": 80.0, "category": "AI"}),
            ]),
        )
        .with_change_requests(
            "REQ-001",
            vec![
                ChangeRequest::new("CR1", "objects[0].name", "Customer", "Client"),
                cr2,
                cr3,
            ],
        )
}
