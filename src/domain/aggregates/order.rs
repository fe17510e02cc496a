//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;
use crate::domain::value_objects::{reference_number, AccountId, Money, MoneyError, OrderId, ProductId, UnknownVariant};
use crate::domain::events::{DomainEvent, OrderEvent};

#[derive(Clone, Debug, Serialize)]
pub struct Order {
    id: OrderId,
    order_number: String,
    vendor_id: AccountId,
    supplier_id: AccountId,
    items: Vec<LineItem>,
    total_amount: Money,
    status: OrderStatus,
    payment_status: PaymentStatus,
    shipping_address: ShippingAddress,
    notes: Option<String>,
    tracking_number: Option<String>,
    order_date: DateTime<Utc>,
    delivery_date: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// A line frozen at placement time. `unit_price` is the catalog price
/// captured when the order was placed and is never re-read afterwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineItem { product_id: ProductId, quantity: u32, unit_price: Money, total: Money }

impl LineItem {
    pub fn new(product_id: ProductId, quantity: u32, unit_price: Money) -> Result<Self, OrderError> {
        let total = unit_price.multiply(quantity)?;
        Ok(Self { product_id, quantity, unit_price, total })
    }
    pub fn product_id(&self) -> ProductId { self.product_id }
    pub fn quantity(&self) -> u32 { self.quantity }
    pub fn unit_price(&self) -> &Money { &self.unit_price }
    pub fn total(&self) -> &Money { &self.total }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 200))]
    pub street: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub state: String,
    #[validate(length(min = 1, max = 20))]
    pub zip_code: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Returned }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending", Self::Confirmed => "confirmed", Self::Processing => "processing",
            Self::Shipped => "shipped", Self::Delivered => "delivered", Self::Cancelled => "cancelled",
            Self::Returned => "returned",
        }
    }

    pub fn is_terminal(&self) -> bool { matches!(self, Self::Delivered | Self::Cancelled | Self::Returned) }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (*self, next),
            (Pending, Confirmed) | (Pending, Cancelled)
                | (Confirmed, Processing) | (Confirmed, Cancelled)
                | (Processing, Shipped) | (Processing, Cancelled)
                | (Shipped, Delivered) | (Shipped, Returned)
        )
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending), "confirmed" => Ok(Self::Confirmed), "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped), "delivered" => Ok(Self::Delivered), "cancelled" => Ok(Self::Cancelled),
            "returned" => Ok(Self::Returned),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, Paid, Failed, Refunded }

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Paid => "paid", Self::Failed => "failed", Self::Refunded => "refunded" }
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending), "paid" => Ok(Self::Paid), "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Stored columns of an order. The total is not part of it: it is always
/// recomputed from the items.
#[derive(Clone, Debug)]
pub struct OrderParts {
    pub id: OrderId,
    pub order_number: String,
    pub vendor_id: AccountId,
    pub supplier_id: AccountId,
    pub items: Vec<LineItem>,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
    pub order_date: DateTime<Utc>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Order totals are stored as NUMERIC(24, 2).
fn max_order_total() -> Decimal { Decimal::from_i128_with_scale(10_i128.pow(22), 0) }

impl Order {
    pub fn place(
        vendor_id: AccountId,
        supplier_id: AccountId,
        items: Vec<LineItem>,
        shipping_address: ShippingAddress,
        notes: Option<String>,
    ) -> Result<Self, OrderError> {
        let first = items.first().ok_or(OrderError::NoItems)?;
        let total_amount = sum_items(&items, first.unit_price.currency())?;
        if total_amount.amount() >= max_order_total() {
            return Err(OrderError::AmountOverflow);
        }
        let id = OrderId::new();
        let now = Utc::now();
        let mut order = Self {
            id, order_number: reference_number("ORD"), vendor_id, supplier_id, items, total_amount,
            status: OrderStatus::Pending, payment_status: PaymentStatus::Pending, shipping_address, notes,
            tracking_number: None, order_date: now, delivery_date: None, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_id: id, vendor_id, supplier_id, total: order.total_amount.amount(),
        }));
        Ok(order)
    }

    pub fn restore(parts: OrderParts) -> Result<Self, OrderError> {
        let total_amount = sum_items(&parts.items, &parts.currency)?;
        Ok(Self {
            id: parts.id, order_number: parts.order_number, vendor_id: parts.vendor_id, supplier_id: parts.supplier_id,
            items: parts.items, total_amount, status: parts.status, payment_status: parts.payment_status,
            shipping_address: parts.shipping_address, notes: parts.notes, tracking_number: parts.tracking_number,
            order_date: parts.order_date, delivery_date: parts.delivery_date, updated_at: parts.updated_at, events: vec![],
        })
    }

    pub fn id(&self) -> OrderId { self.id }
    pub fn order_number(&self) -> &str { &self.order_number }
    pub fn vendor_id(&self) -> AccountId { self.vendor_id }
    pub fn supplier_id(&self) -> AccountId { self.supplier_id }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn total_amount(&self) -> &Money { &self.total_amount }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn shipping_address(&self) -> &ShippingAddress { &self.shipping_address }
    pub fn notes(&self) -> Option<&str> { self.notes.as_deref() }
    pub fn tracking_number(&self) -> Option<&str> { self.tracking_number.as_deref() }
    pub fn order_date(&self) -> DateTime<Utc> { self.order_date }
    pub fn delivery_date(&self) -> Option<DateTime<Utc>> { self.delivery_date }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidStatusTransition { from: self.status, to: next });
        }
        let from = self.status;
        self.status = next;
        if next == OrderStatus::Delivered { self.delivery_date = Some(Utc::now()); }
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from, to: next }));
        Ok(())
    }

    pub fn set_tracking_number(&mut self, tracking: impl Into<String>) -> Result<(), OrderError> {
        if self.status.is_terminal() { return Err(OrderError::Finalized(self.status)); }
        self.tracking_number = Some(tracking.into());
        self.touch();
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn sum_items(items: &[LineItem], currency: &str) -> Result<Money, OrderError> {
    items.iter().try_fold(Money::zero(currency), |acc, i| acc.add(&i.total)).map_err(OrderError::from)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("order has no items")]
    NoItems,
    #[error("line items use different currencies")]
    MixedCurrencies,
    #[error("order amount is out of range")]
    AmountOverflow,
    #[error("cannot move order from {} to {}", .from.as_str(), .to.as_str())]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },
    #[error("order is {} and can no longer change", .0.as_str())]
    Finalized(OrderStatus),
}

impl From<MoneyError> for OrderError {
    fn from(err: MoneyError) -> Self {
        match err {
            MoneyError::CurrencyMismatch => Self::MixedCurrencies,
            MoneyError::Overflow => Self::AmountOverflow,
        }
    }
}
