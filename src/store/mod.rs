//! Persistence ports and their adapters.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::aggregates::{Complaint, ComplaintStatus, Order, OrderStatus, Priority, Product};
use crate::domain::value_objects::{AccountId, ComplaintId, OrderId, ProductId};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Lock wait exceeded, serialization failure or deadlock. The whole
    /// unit of work can be retried.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Clone, Debug, Default)]
pub struct ProductFilter {
    pub supplier_id: Option<AccountId>,
    pub active_only: bool,
    pub text: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        let price = product.price().amount();
        self.supplier_id.map_or(true, |s| product.supplier_id() == s)
            && (!self.active_only || product.status() == crate::domain::aggregates::ProductStatus::Active)
            && self.text.as_deref().map_or(true, |t| product.matches_text(t))
            && self.category.as_deref().map_or(true, |c| product.category() == c)
            && self.min_price.map_or(true, |min| price >= min)
            && self.max_price.map_or(true, |max| price <= max)
    }
}

#[derive(Clone, Debug, Default)]
pub struct OrderFilter {
    pub vendor_id: Option<AccountId>,
    pub supplier_id: Option<AccountId>,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.vendor_id.map_or(true, |v| order.vendor_id() == v)
            && self.supplier_id.map_or(true, |s| order.supplier_id() == s)
            && self.status.map_or(true, |s| order.status() == s)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ComplaintFilter {
    pub status: Option<ComplaintStatus>,
    pub priority: Option<Priority>,
}

impl ComplaintFilter {
    pub fn matches(&self, complaint: &Complaint) -> bool {
        self.status.map_or(true, |s| complaint.status == s)
            && self.priority.map_or(true, |p| complaint.priority == p)
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> StoreResult<()>;
    /// Writes descriptive fields and price. Never touches stock.
    async fn update_product(&self, product: &Product) -> StoreResult<()>;
    /// Atomic increment; returns the product after the change. `None` when
    /// the product is missing or the result would exceed [`Quantity::MAX`].
    ///
    /// [`Quantity::MAX`]: crate::domain::value_objects::Quantity::MAX
    async fn restock(&self, id: ProductId, quantity: u32) -> StoreResult<Option<Product>>;
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;
    /// Newest first.
    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;
}

#[async_trait]
pub trait OrderLedger: Send + Sync {
    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>>;
    /// Newest first.
    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>>;
    /// Compare-and-set on status. Returns `false` when the stored status
    /// is no longer `expected`.
    async fn update_order(&self, order: &Order, expected: OrderStatus) -> StoreResult<bool>;
}

#[async_trait]
pub trait ComplaintStore: Send + Sync {
    async fn insert_complaint(&self, complaint: &Complaint) -> StoreResult<()>;
    async fn get_complaint(&self, id: ComplaintId) -> StoreResult<Option<Complaint>>;
    async fn update_complaint(&self, complaint: &Complaint) -> StoreResult<()>;
    /// Newest first.
    async fn list_complaints(&self, filter: &ComplaintFilter) -> StoreResult<Vec<Complaint>>;
}

/// Opens the transaction scope an order placement runs in.
#[async_trait]
pub trait PlacementStore: Send + Sync {
    async fn begin_placement(&self) -> StoreResult<Box<dyn PlacementTx>>;
}

/// One placement's unit of work. Dropping it without [`commit`] discards
/// every change made through it.
///
/// [`commit`]: PlacementTx::commit
#[async_trait]
pub trait PlacementTx: Send {
    /// Reads and locks the given products for the rest of the transaction.
    /// Missing ids are simply absent from the result.
    async fn lock_products(&mut self, ids: &[ProductId]) -> StoreResult<Vec<Product>>;
    /// Decrements only if at least `quantity` is available. Returns `false`
    /// when the condition did not hold.
    async fn decrement_stock(&mut self, id: ProductId, quantity: u32) -> StoreResult<bool>;
    async fn insert_order(&mut self, order: &Order) -> StoreResult<()>;
    async fn commit(self: Box<Self>) -> StoreResult<()>;
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

pub trait Store: CatalogStore + OrderLedger + ComplaintStore + PlacementStore {}

impl<T> Store for T where T: CatalogStore + OrderLedger + ComplaintStore + PlacementStore {}
