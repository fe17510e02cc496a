//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use rust_decimal::Decimal;
use std::str::FromStr;
use crate::domain::value_objects::{AccountId, Money, ProductId, Quantity, UnknownVariant};
use crate::domain::events::{DomainEvent, ProductEvent};

#[derive(Clone, Debug, Serialize)]
pub struct Product {
    id: ProductId,
    supplier_id: AccountId,
    name: String,
    description: String,
    category: String,
    price: Money,
    available_quantity: Quantity,
    min_order_quantity: u32,
    status: ProductStatus,
    images: Vec<String>,
    specifications: Vec<Specification>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specification { pub key: String, pub value: String }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus { #[default] Active, Inactive, OutOfStock }

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Active => "active", Self::Inactive => "inactive", Self::OutOfStock => "out_of_stock" }
    }
}

impl FromStr for ProductStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "out_of_stock" => Ok(Self::OutOfStock),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Supplier input for a new catalog entry.
#[derive(Clone, Debug, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub min_order_quantity: Option<u32>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub specifications: Vec<Specification>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update of descriptive fields. Stock is only changed through
/// [`Product::restock`] and order placement.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub min_order_quantity: Option<u32>,
    pub status: Option<ProductStatus>,
    pub images: Option<Vec<String>>,
    pub specifications: Option<Vec<Specification>>,
    pub tags: Option<Vec<String>>,
}

/// Every stored column of a product, used by stores to rebuild the aggregate.
#[derive(Clone, Debug)]
pub struct ProductParts {
    pub id: ProductId,
    pub supplier_id: AccountId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Money,
    pub available_quantity: u32,
    pub min_order_quantity: u32,
    pub status: ProductStatus,
    pub images: Vec<String>,
    pub specifications: Vec<Specification>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Prices are stored as NUMERIC(14, 2).
const MAX_PRICE_SCALE: u32 = 2;

fn check_price(price: &Money) -> Result<(), ProductError> {
    if price.is_negative() { return Err(ProductError::NegativePrice); }
    let limit = Decimal::from(1_000_000_000_000_i64);
    if price.amount().normalize().scale() > MAX_PRICE_SCALE || price.amount() >= limit {
        return Err(ProductError::PriceOutOfRange);
    }
    Ok(())
}

impl Product {
    pub fn create(supplier_id: AccountId, input: NewProduct, currency: &str) -> Result<Self, ProductError> {
        if input.name.trim().is_empty() { return Err(ProductError::MissingName); }
        let price = Money::new(input.price, currency);
        check_price(&price)?;
        if input.quantity > Quantity::MAX { return Err(ProductError::StockOutOfRange); }
        let id = ProductId::new();
        let now = Utc::now();
        let mut product = Self {
            id, supplier_id, name: input.name, description: input.description, category: input.category,
            price, available_quantity: Quantity::new(input.quantity),
            min_order_quantity: input.min_order_quantity.unwrap_or(1).max(1),
            status: ProductStatus::Active, images: input.images, specifications: input.specifications,
            tags: input.tags, created_at: now, updated_at: now, events: vec![],
        };
        product.raise_event(DomainEvent::Product(ProductEvent::Created { product_id: id, supplier_id }));
        Ok(product)
    }

    pub fn restore(parts: ProductParts) -> Self {
        Self {
            id: parts.id, supplier_id: parts.supplier_id, name: parts.name, description: parts.description,
            category: parts.category, price: parts.price, available_quantity: Quantity::new(parts.available_quantity),
            min_order_quantity: parts.min_order_quantity, status: parts.status, images: parts.images,
            specifications: parts.specifications, tags: parts.tags, created_at: parts.created_at,
            updated_at: parts.updated_at, events: vec![],
        }
    }

    pub fn id(&self) -> ProductId { self.id }
    pub fn supplier_id(&self) -> AccountId { self.supplier_id }
    pub fn name(&self) -> &str { &self.name }
    pub fn description(&self) -> &str { &self.description }
    pub fn category(&self) -> &str { &self.category }
    pub fn price(&self) -> &Money { &self.price }
    pub fn available_quantity(&self) -> u32 { self.available_quantity.value() }
    pub fn min_order_quantity(&self) -> u32 { self.min_order_quantity }
    pub fn status(&self) -> ProductStatus { self.status }
    pub fn images(&self) -> &[String] { &self.images }
    pub fn specifications(&self) -> &[Specification] { &self.specifications }
    pub fn tags(&self) -> &[String] { &self.tags }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn is_in_stock(&self) -> bool { !self.available_quantity.is_zero() }

    /// Case-insensitive match on name, description or any tag.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }

    pub fn apply_update(&mut self, update: ProductUpdate) -> Result<(), ProductError> {
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) { return Err(ProductError::MissingName); }
        let price = update.price.map(|p| Money::new(p, self.price.currency()));
        if let Some(price) = &price { check_price(price)?; }
        if let Some(name) = update.name { self.name = name; }
        if let Some(price) = price { self.price = price; }
        if let Some(description) = update.description { self.description = description; }
        if let Some(category) = update.category { self.category = category; }
        if let Some(min) = update.min_order_quantity { self.min_order_quantity = min.max(1); }
        if let Some(status) = update.status { self.status = status; }
        if let Some(images) = update.images { self.images = images; }
        if let Some(specifications) = update.specifications { self.specifications = specifications; }
        if let Some(tags) = update.tags { self.tags = tags; }
        self.touch();
        Ok(())
    }

    pub fn restock(&mut self, qty: u32) -> Result<(), ProductError> {
        self.available_quantity = self.available_quantity.checked_add(qty).ok_or(ProductError::StockOutOfRange)?;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::InventoryAdded { product_id: self.id, quantity: qty }));
        Ok(())
    }

    /// Conditional decrement: succeeds only while `qty` units are available.
    pub fn remove_inventory(&mut self, qty: u32) -> Result<(), ProductError> {
        self.available_quantity = self.available_quantity.subtract(qty).ok_or(ProductError::InsufficientInventory)?;
        self.touch();
        Ok(())
    }

    /// Overwrite stock with the value a store holds as authoritative.
    pub(crate) fn sync_stock(&mut self, qty: u32) { self.available_quantity = Quantity::new(qty); }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("product name is required")]
    MissingName,
    #[error("price cannot be negative")]
    NegativePrice,
    #[error("price must have at most 2 decimal places and be below 1000000000000")]
    PriceOutOfRange,
    #[error("stock cannot exceed {}", Quantity::MAX)]
    StockOutOfRange,
    #[error("insufficient inventory")]
    InsufficientInventory,
}
