//! In-process store used when no database is configured, and by tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    CatalogStore, ComplaintFilter, ComplaintStore, OrderFilter, OrderLedger, PlacementStore, PlacementTx,
    ProductFilter, StoreError, StoreResult,
};
use crate::domain::aggregates::{Complaint, Order, OrderStatus, Product};
use crate::domain::value_objects::{ComplaintId, OrderId, ProductId};

#[derive(Default)]
struct State {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    complaints: HashMap<ComplaintId, Complaint>,
}

/// Every operation takes one store-wide lock. A placement keeps it for
/// its whole transaction, so placements are fully serialized.
#[derive(Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    lock_timeout: Duration,
}

impl InMemoryStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self { state: Arc::new(Mutex::new(State::default())), lock_timeout }
    }

    async fn lock(&self) -> StoreResult<OwnedMutexGuard<State>> {
        tokio::time::timeout(self.lock_timeout, self.state.clone().lock_owned())
            .await
            .map_err(|_| StoreError::Conflict(format!("store lock not acquired within {:?}", self.lock_timeout)))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self { Self::new(Duration::from_secs(2)) }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        self.lock().await?.products.insert(product.id(), product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> StoreResult<()> {
        let mut state = self.lock().await?;
        let stored = state
            .products
            .get(&product.id())
            .ok_or_else(|| StoreError::Database(format!("product {} does not exist", product.id())))?;
        // Keep whatever stock the store holds; placements may have moved it.
        let mut updated = product.clone();
        updated.sync_stock(stored.available_quantity());
        state.products.insert(product.id(), updated);
        Ok(())
    }

    async fn restock(&self, id: ProductId, quantity: u32) -> StoreResult<Option<Product>> {
        let mut state = self.lock().await?;
        let Some(product) = state.products.get_mut(&id) else { return Ok(None) };
        if product.restock(quantity).is_err() {
            return Ok(None);
        }
        product.take_events();
        Ok(Some(product.clone()))
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.lock().await?.products.get(&id).cloned())
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let state = self.lock().await?;
        let mut products: Vec<Product> = state.products.values().filter(|p| filter.matches(p)).cloned().collect();
        products.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(b.id().cmp(&a.id())));
        Ok(products)
    }
}

#[async_trait]
impl OrderLedger for InMemoryStore {
    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.lock().await?.orders.get(&id).cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let state = self.lock().await?;
        let mut orders: Vec<Order> = state.orders.values().filter(|o| filter.matches(o)).cloned().collect();
        orders.sort_by(|a, b| b.order_date().cmp(&a.order_date()).then(b.id().cmp(&a.id())));
        Ok(orders)
    }

    async fn update_order(&self, order: &Order, expected: OrderStatus) -> StoreResult<bool> {
        let mut state = self.lock().await?;
        match state.orders.get_mut(&order.id()) {
            Some(stored) if stored.status() == expected => {
                let mut updated = order.clone();
                updated.take_events();
                *stored = updated;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ComplaintStore for InMemoryStore {
    async fn insert_complaint(&self, complaint: &Complaint) -> StoreResult<()> {
        self.lock().await?.complaints.insert(complaint.id, complaint.clone());
        Ok(())
    }

    async fn get_complaint(&self, id: ComplaintId) -> StoreResult<Option<Complaint>> {
        Ok(self.lock().await?.complaints.get(&id).cloned())
    }

    async fn update_complaint(&self, complaint: &Complaint) -> StoreResult<()> {
        self.lock().await?.complaints.insert(complaint.id, complaint.clone());
        Ok(())
    }

    async fn list_complaints(&self, filter: &ComplaintFilter) -> StoreResult<Vec<Complaint>> {
        let state = self.lock().await?;
        let mut complaints: Vec<Complaint> = state.complaints.values().filter(|c| filter.matches(c)).cloned().collect();
        complaints.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(complaints)
    }
}

#[async_trait]
impl PlacementStore for InMemoryStore {
    async fn begin_placement(&self) -> StoreResult<Box<dyn PlacementTx>> {
        let guard = self.lock().await?;
        tracing::debug!("in-memory placement transaction opened");
        Ok(Box::new(MemoryPlacement { guard, staged: HashMap::new(), orders: Vec::new() }))
    }
}

/// Writes are staged and only reach the shared state in `commit`.
struct MemoryPlacement {
    guard: OwnedMutexGuard<State>,
    staged: HashMap<ProductId, Product>,
    orders: Vec<Order>,
}

impl MemoryPlacement {
    fn current(&self, id: &ProductId) -> Option<&Product> {
        self.staged.get(id).or_else(|| self.guard.products.get(id))
    }
}

#[async_trait]
impl PlacementTx for MemoryPlacement {
    async fn lock_products(&mut self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        Ok(ids.iter().filter_map(|id| self.current(id).cloned()).collect())
    }

    async fn decrement_stock(&mut self, id: ProductId, quantity: u32) -> StoreResult<bool> {
        let Some(mut product) = self.current(&id).cloned() else { return Ok(false) };
        if product.remove_inventory(quantity).is_err() {
            return Ok(false);
        }
        self.staged.insert(id, product);
        Ok(true)
    }

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        let mut order = order.clone();
        order.take_events();
        self.orders.push(order);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryPlacement { mut guard, staged, orders } = *self;
        guard.products.extend(staged);
        guard.orders.extend(orders.into_iter().map(|o| (o.id(), o)));
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{LineItem, NewProduct, ShippingAddress};
    use crate::domain::value_objects::{AccountId, Quantity};
    use rust_decimal::Decimal;

    fn product(quantity: u32) -> Product {
        let input = NewProduct {
            name: "Cotton Yarn".into(), description: "40s count".into(), category: "textiles".into(),
            price: Decimal::new(250, 0), quantity, min_order_quantity: None, images: vec![],
            specifications: vec![], tags: vec![],
        };
        Product::create(AccountId::new(), input, "INR").unwrap()
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = InMemoryStore::default();
        let p = product(5);
        store.insert_product(&p).await.unwrap();

        let mut tx = store.begin_placement().await.unwrap();
        assert!(tx.decrement_stock(p.id(), 3).await.unwrap());
        assert_eq!(tx.lock_products(&[p.id()]).await.unwrap()[0].available_quantity(), 2);
        drop(tx);

        assert_eq!(store.get_product(p.id()).await.unwrap().unwrap().available_quantity(), 5);
    }

    #[tokio::test]
    async fn test_commit_applies_stock_and_order() {
        let store = InMemoryStore::default();
        let p = product(5);
        store.insert_product(&p).await.unwrap();
        let order = Order::place(
            AccountId::new(), p.supplier_id(), vec![LineItem::new(p.id(), 4, p.price().clone()).unwrap()],
            ShippingAddress::default(), None,
        ).unwrap();

        let mut tx = store.begin_placement().await.unwrap();
        assert!(tx.decrement_stock(p.id(), 4).await.unwrap());
        assert!(!tx.decrement_stock(p.id(), 2).await.unwrap());
        tx.insert_order(&order).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.get_product(p.id()).await.unwrap().unwrap().available_quantity(), 1);
        assert!(store.get_order(order.id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_lock_wait_is_bounded() {
        let store = InMemoryStore::new(Duration::from_millis(20));
        let _held = store.begin_placement().await.unwrap();
        let err = store.get_product(ProductId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_product_preserves_stock() {
        let store = InMemoryStore::default();
        let p = product(5);
        store.insert_product(&p).await.unwrap();
        store.restock(p.id(), 5).await.unwrap();

        let mut stale = p.clone();
        stale.apply_update(Default::default()).unwrap();
        store.update_product(&stale).await.unwrap();
        assert_eq!(store.get_product(p.id()).await.unwrap().unwrap().available_quantity(), 10);
    }

    #[tokio::test]
    async fn test_restock_past_limit_changes_nothing() {
        let store = InMemoryStore::default();
        let p = product(Quantity::MAX - 1);
        store.insert_product(&p).await.unwrap();

        assert!(store.restock(p.id(), 2).await.unwrap().is_none());
        assert_eq!(store.get_product(p.id()).await.unwrap().unwrap().available_quantity(), Quantity::MAX - 1);
        assert!(store.restock(ProductId::new(), 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_order_rejects_stale_status() {
        let store = InMemoryStore::default();
        let p = product(5);
        let order = Order::place(
            AccountId::new(), p.supplier_id(), vec![LineItem::new(p.id(), 1, p.price().clone()).unwrap()],
            ShippingAddress::default(), None,
        ).unwrap();
        let mut tx = store.begin_placement().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.commit().await.unwrap();

        let mut cancelled = order.clone();
        cancelled.transition_to(OrderStatus::Cancelled).unwrap();
        assert!(store.update_order(&cancelled, OrderStatus::Pending).await.unwrap());

        let mut confirmed = order.clone();
        confirmed.transition_to(OrderStatus::Confirmed).unwrap();
        assert!(!store.update_order(&confirmed, OrderStatus::Pending).await.unwrap());
        let stored = store.get_order(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::Cancelled);
    }
}
