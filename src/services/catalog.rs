//! Supplier catalog management and vendor-facing product lookup.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::aggregates::{NewProduct, Product, ProductUpdate};
use crate::domain::value_objects::{AccountId, ProductId, Quantity};
use crate::messaging::EventPublisher;
use crate::store::{ProductFilter, Store};
use crate::{MarketplaceError, Result};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    events: Arc<dyn EventPublisher>,
    currency: Arc<str>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, events: Arc<dyn EventPublisher>, currency: &str) -> Self {
        Self { store, events, currency: Arc::from(currency) }
    }

    pub async fn create_product(&self, supplier_id: AccountId, input: NewProduct) -> Result<Product> {
        let mut product = Product::create(supplier_id, input, &self.currency)?;
        let events = product.take_events();
        self.store.insert_product(&product).await?;
        tracing::info!(product_id = %product.id(), %supplier_id, "product created");
        self.events.publish_all(&events).await;
        Ok(product)
    }

    pub async fn update_product(&self, supplier_id: AccountId, id: ProductId, update: ProductUpdate) -> Result<Product> {
        let mut product = self.owned_product(supplier_id, id).await?;
        product.apply_update(update)?;
        self.store.update_product(&product).await?;
        self.store.get_product(id).await?.ok_or(MarketplaceError::ProductNotFound)
    }

    pub async fn restock(&self, supplier_id: AccountId, id: ProductId, quantity: u32) -> Result<Product> {
        if quantity == 0 {
            return Err(MarketplaceError::Validation("restock quantity must be positive".into()));
        }
        let mut product = self.owned_product(supplier_id, id).await?;
        product.restock(quantity)?;
        let updated = self
            .store
            .restock(id, quantity)
            .await?
            .ok_or_else(|| MarketplaceError::Validation(format!("stock cannot exceed {}", Quantity::MAX)))?;
        tracing::info!(product_id = %id, quantity, available = updated.available_quantity(), "product restocked");
        self.events.publish_all(&product.take_events()).await;
        Ok(updated)
    }

    pub async fn list_supplier_products(&self, supplier_id: AccountId) -> Result<Vec<Product>> {
        let filter = ProductFilter { supplier_id: Some(supplier_id), ..Default::default() };
        Ok(self.store.list_products(&filter).await?)
    }

    pub async fn search(&self, query: ProductQuery) -> Result<Vec<Product>> {
        let filter = ProductFilter {
            active_only: true,
            text: query.q.filter(|q| !q.trim().is_empty()),
            category: query.category,
            min_price: query.min_price,
            max_price: query.max_price,
            ..Default::default()
        };
        Ok(self.store.list_products(&filter).await?)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.store.get_product(id).await?.ok_or(MarketplaceError::ProductNotFound)
    }

    /// Another supplier's product is reported as missing.
    async fn owned_product(&self, supplier_id: AccountId, id: ProductId) -> Result<Product> {
        self.store
            .get_product(id)
            .await?
            .filter(|p| p.supplier_id() == supplier_id)
            .ok_or(MarketplaceError::ProductNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::ProductStatus;
    use crate::messaging::testing::RecordingPublisher;
    use crate::store::InMemoryStore;

    fn service() -> (CatalogService, Arc<RecordingPublisher>) {
        let events = Arc::new(RecordingPublisher::default());
        (CatalogService::new(Arc::new(InMemoryStore::default()), events.clone(), "INR"), events)
    }

    fn input(name: &str, price: i64, tags: &[&str]) -> NewProduct {
        NewProduct {
            name: name.into(), description: String::new(), category: "spices".into(), price: Decimal::new(price, 0),
            quantity: 5, min_order_quantity: None, images: vec![], specifications: vec![],
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_update_is_owner_only() {
        let (catalog, _) = service();
        let owner = AccountId::new();
        let p = catalog.create_product(owner, input("Turmeric", 120, &[])).await.unwrap();

        let err = catalog.update_product(AccountId::new(), p.id(), ProductUpdate::default()).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::ProductNotFound));

        let update = ProductUpdate { name: Some("Salem Turmeric".into()), ..Default::default() };
        let updated = catalog.update_product(owner, p.id(), update).await.unwrap();
        assert_eq!(updated.name(), "Salem Turmeric");
    }

    #[tokio::test]
    async fn test_restock_adds_and_publishes() {
        let (catalog, events) = service();
        let owner = AccountId::new();
        let p = catalog.create_product(owner, input("Cumin", 300, &[])).await.unwrap();

        let updated = catalog.restock(owner, p.id(), 7).await.unwrap();
        assert_eq!(updated.available_quantity(), 12);
        assert!(matches!(catalog.restock(owner, p.id(), 0).await, Err(MarketplaceError::Validation(_))));
        assert_eq!(events.subjects(), vec!["marketplace.product.created", "marketplace.product.inventory_added"]);
    }

    #[tokio::test]
    async fn test_restock_past_stock_limit_is_invalid() {
        let (catalog, events) = service();
        let owner = AccountId::new();
        let mut big = input("Rock Salt", 40, &[]);
        big.quantity = Quantity::MAX - 1;
        let p = catalog.create_product(owner, big).await.unwrap();

        let err = catalog.restock(owner, p.id(), 2).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::Validation(_)), "{err:?}");
        assert_eq!(catalog.get_product(p.id()).await.unwrap().available_quantity(), Quantity::MAX - 1);
        assert_eq!(events.subjects(), vec!["marketplace.product.created"]);
    }

    #[tokio::test]
    async fn test_price_beyond_stored_precision_is_invalid() {
        let (catalog, _) = service();
        let mut odd = input("Saffron", 0, &[]);
        odd.price = Decimal::new(1005, 3);
        let err = catalog.create_product(AccountId::new(), odd).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_search_filters_active_text_and_price() {
        let (catalog, _) = service();
        let supplier = AccountId::new();
        catalog.create_product(supplier, input("Black Pepper", 600, &["whole"])).await.unwrap();
        catalog.create_product(supplier, input("Cardamom", 2400, &["green", "whole"])).await.unwrap();
        let hidden = catalog.create_product(supplier, input("Clove", 900, &["whole"])).await.unwrap();
        let update = ProductUpdate { status: Some(ProductStatus::Inactive), ..Default::default() };
        catalog.update_product(supplier, hidden.id(), update).await.unwrap();

        let whole = catalog.search(ProductQuery { q: Some("WHOLE".into()), ..Default::default() }).await.unwrap();
        assert_eq!(whole.len(), 2);

        let cheap = catalog
            .search(ProductQuery { max_price: Some(Decimal::new(1000, 0)), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(cheap.iter().map(Product::name).collect::<Vec<_>>(), vec!["Black Pepper"]);

        assert_eq!(catalog.list_supplier_products(supplier).await.unwrap().len(), 3);
    }
}
