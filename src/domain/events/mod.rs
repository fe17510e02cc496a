//! Domain events
use crate::domain::aggregates::{ComplaintStatus, OrderStatus};
use crate::domain::value_objects::{AccountId, ComplaintId, OrderId, ProductId};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
    Complaint(ComplaintEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: ProductId, supplier_id: AccountId },
    InventoryAdded { product_id: ProductId, quantity: u32 },
    InventoryRemoved { product_id: ProductId, quantity: u32, order_id: OrderId },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: OrderId, vendor_id: AccountId, supplier_id: AccountId, total: Decimal },
    StatusChanged { order_id: OrderId, from: OrderStatus, to: OrderStatus },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ComplaintEvent {
    Opened { complaint_id: ComplaintId, ticket_number: String },
    Resolved { complaint_id: ComplaintId, status: ComplaintStatus },
}

impl DomainEvent {
    /// Message subject, e.g. `marketplace.order.placed`.
    pub fn subject(&self) -> String {
        let (aggregate, name) = match self {
            Self::Product(e) => ("product", match e {
                ProductEvent::Created { .. } => "created",
                ProductEvent::InventoryAdded { .. } => "inventory_added",
                ProductEvent::InventoryRemoved { .. } => "inventory_removed",
            }),
            Self::Order(e) => ("order", match e {
                OrderEvent::Placed { .. } => "placed",
                OrderEvent::StatusChanged { .. } => "status_changed",
            }),
            Self::Complaint(e) => ("complaint", match e {
                ComplaintEvent::Opened { .. } => "opened",
                ComplaintEvent::Resolved { .. } => "resolved",
            }),
        };
        format!("marketplace.{aggregate}.{name}")
    }
}
