//! Order placement with inventory reservation.
//!
//! A placement either persists one order together with every stock
//! decrement it caused, or changes nothing. All reads, checks and writes
//! run inside one [`PlacementTx`]:
//!
//! 1. lock every requested product,
//! 2. walk the lines in request order checking existence, stock
//!    (cumulative for repeated products) and that all lines share one
//!    supplier, stopping at the first violation,
//! 3. freeze each line at the product's current price,
//! 4. apply conditional decrements and insert the order,
//! 5. commit.
//!
//! Any error before the commit rolls the transaction back.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use validator::Validate;

use crate::domain::aggregates::{LineItem, Order, OrderError, Product, ShippingAddress};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::{AccountId, ProductId};
use crate::messaging::EventPublisher;
use crate::store::{PlacementStore, PlacementTx, StoreError};

const MAX_NOTES_LEN: usize = 2000;

#[derive(Clone, Debug, Deserialize)]
pub struct PlaceOrder {
    pub items: Vec<RequestedLine>,
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Quantity is signed so that non-positive values reach validation
/// instead of failing deserialization.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct RequestedLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("invalid order request: {0}")]
    InvalidRequest(String),

    #[error("product {product_id} not found")]
    ProductNotFound { product_id: ProductId },

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock { product_id: ProductId, requested: u32, available: u32 },

    #[error("product {product_id} belongs to supplier {supplier_id}, order is for supplier {expected_supplier_id}")]
    MultiSupplierOrderUnsupported { product_id: ProductId, supplier_id: AccountId, expected_supplier_id: AccountId },

    #[error("transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl PlacementError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::ProductNotFound { .. } => "product_not_found",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::MultiSupplierOrderUnsupported { .. } => "multi_supplier_order_unsupported",
            Self::TransactionConflict(_) => "transaction_conflict",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Whether resubmitting the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InsufficientStock { .. } | Self::TransactionConflict(_))
    }

    pub fn product_id(&self) -> Option<ProductId> {
        match self {
            Self::ProductNotFound { product_id }
            | Self::InsufficientStock { product_id, .. }
            | Self::MultiSupplierOrderUnsupported { product_id, .. } => Some(*product_id),
            _ => None,
        }
    }

    pub fn shortfall(&self) -> Option<u32> {
        match self {
            Self::InsufficientStock { requested, available, .. } => Some(requested - available),
            _ => None,
        }
    }
}

impl From<StoreError> for PlacementError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => Self::TransactionConflict(msg),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<OrderError> for PlacementError {
    fn from(err: OrderError) -> Self { Self::InvalidRequest(err.to_string()) }
}

#[derive(Clone)]
pub struct OrderPlacement {
    store: Arc<dyn PlacementStore>,
    events: Arc<dyn EventPublisher>,
}

impl OrderPlacement {
    pub fn new(store: Arc<dyn PlacementStore>, events: Arc<dyn EventPublisher>) -> Self {
        Self { store, events }
    }

    #[tracing::instrument(skip_all, fields(vendor_id = %vendor_id, lines = request.items.len()))]
    pub async fn place(&self, vendor_id: AccountId, request: PlaceOrder) -> Result<Order, PlacementError> {
        let lines = match validate(&request) {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!(code = e.code(), error = %e, "order rejected");
                return Err(e);
            }
        };

        let mut tx = self.store.begin_placement().await?;
        let outcome = reserve_and_record(tx.as_mut(), vendor_id, &lines, request.shipping_address, request.notes).await;
        let mut order = match outcome {
            Ok(order) => order,
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!(error = %rollback, "placement rollback failed");
                }
                tracing::warn!(code = e.code(), error = %e, "order rejected");
                return Err(e);
            }
        };
        if let Err(e) = tx.commit().await {
            let e = PlacementError::from(e);
            tracing::warn!(code = e.code(), error = %e, "order rejected at commit");
            return Err(e);
        }

        tracing::info!(
            order_id = %order.id(),
            order_number = order.order_number(),
            total = %order.total_amount(),
            lines = order.items().len(),
            "order placed"
        );

        let mut events = order.take_events();
        events.extend(order.items().iter().map(|item| {
            DomainEvent::Product(ProductEvent::InventoryRemoved {
                product_id: item.product_id(),
                quantity: item.quantity(),
                order_id: order.id(),
            })
        }));
        self.events.publish_all(&events).await;
        Ok(order)
    }
}

fn validate(request: &PlaceOrder) -> Result<Vec<(ProductId, u32)>, PlacementError> {
    if request.items.is_empty() {
        return Err(PlacementError::InvalidRequest("order must contain at least one item".into()));
    }
    let lines = request
        .items
        .iter()
        .enumerate()
        .map(|(index, line)| match u32::try_from(line.quantity) {
            Ok(quantity) if quantity > 0 => Ok((line.product_id, quantity)),
            _ => Err(PlacementError::InvalidRequest(format!(
                "item {index}: quantity must be a positive integer, got {}",
                line.quantity
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    request
        .shipping_address
        .validate()
        .map_err(|e| PlacementError::InvalidRequest(format!("shipping address: {e}")))?;
    if request.notes.as_ref().is_some_and(|n| n.len() > MAX_NOTES_LEN) {
        return Err(PlacementError::InvalidRequest(format!("notes exceed {MAX_NOTES_LEN} characters")));
    }
    Ok(lines)
}

async fn reserve_and_record(
    tx: &mut dyn PlacementTx,
    vendor_id: AccountId,
    lines: &[(ProductId, u32)],
    shipping_address: ShippingAddress,
    notes: Option<String>,
) -> Result<Order, PlacementError> {
    let ids: Vec<ProductId> = lines.iter().map(|(id, _)| *id).collect();
    let products: HashMap<ProductId, Product> =
        tx.lock_products(&ids).await?.into_iter().map(|p| (p.id(), p)).collect();

    let mut claimed: BTreeMap<ProductId, u32> = BTreeMap::new();
    let mut supplier_id: Option<AccountId> = None;
    let mut items = Vec::with_capacity(lines.len());
    for &(product_id, quantity) in lines {
        let product = products.get(&product_id).ok_or(PlacementError::ProductNotFound { product_id })?;

        let already = claimed.entry(product_id).or_default();
        let available = product.available_quantity().saturating_sub(*already);
        if quantity > available {
            return Err(PlacementError::InsufficientStock { product_id, requested: quantity, available });
        }
        *already += quantity;

        let expected = *supplier_id.get_or_insert(product.supplier_id());
        if product.supplier_id() != expected {
            return Err(PlacementError::MultiSupplierOrderUnsupported {
                product_id,
                supplier_id: product.supplier_id(),
                expected_supplier_id: expected,
            });
        }

        items.push(LineItem::new(product_id, quantity, product.price().clone())?);
    }

    for (&product_id, &quantity) in &claimed {
        if !tx.decrement_stock(product_id, quantity).await? {
            return Err(PlacementError::TransactionConflict(format!(
                "stock of product {product_id} changed during placement"
            )));
        }
    }

    let supplier_id = supplier_id.ok_or_else(|| PlacementError::InvalidRequest("order has no items".into()))?;
    let order = Order::place(vendor_id, supplier_id, items, shipping_address, notes)?;
    tx.insert_order(&order).await?;
    Ok(order)
}
