//! Order lifecycle after placement: lookups per role and supplier status updates.

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::aggregates::{Order, OrderStatus};
use crate::domain::value_objects::{AccountId, OrderId};
use crate::messaging::EventPublisher;
use crate::placement::{OrderPlacement, PlaceOrder};
use crate::store::{OrderFilter, Store};
use crate::{MarketplaceError, Result};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<OrderStatus>,
    pub tracking_number: Option<String>,
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    placement: OrderPlacement,
    events: Arc<dyn EventPublisher>,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, placement: OrderPlacement, events: Arc<dyn EventPublisher>) -> Self {
        Self { store, placement, events }
    }

    pub async fn place_order(&self, vendor_id: AccountId, request: PlaceOrder) -> Result<Order> {
        Ok(self.placement.place(vendor_id, request).await?)
    }

    pub async fn list_vendor_orders(&self, vendor_id: AccountId) -> Result<Vec<Order>> {
        let filter = OrderFilter { vendor_id: Some(vendor_id), ..Default::default() };
        Ok(self.store.list_orders(&filter).await?)
    }

    pub async fn track_order(&self, vendor_id: AccountId, id: OrderId) -> Result<Order> {
        self.fetch(id, |o| o.vendor_id() == vendor_id).await
    }

    pub async fn list_supplier_orders(&self, supplier_id: AccountId, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let filter = OrderFilter { supplier_id: Some(supplier_id), status, ..Default::default() };
        Ok(self.store.list_orders(&filter).await?)
    }

    /// Admin view over every order in the marketplace.
    pub async fn list_transactions(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let filter = OrderFilter { status, ..Default::default() };
        Ok(self.store.list_orders(&filter).await?)
    }

    #[tracing::instrument(skip(self, update), fields(status = ?update.status))]
    pub async fn update_order_status(&self, supplier_id: AccountId, id: OrderId, update: StatusUpdate) -> Result<Order> {
        if update.status.is_none() && update.tracking_number.is_none() {
            return Err(MarketplaceError::Validation("status or tracking_number is required".into()));
        }
        let mut order = self.fetch(id, |o| o.supplier_id() == supplier_id).await?;
        let expected = order.status();

        // Tracking is recorded against the current status so that a
        // shipped order can carry it into delivered.
        if let Some(tracking) = update.tracking_number.filter(|t| !t.trim().is_empty()) {
            order.set_tracking_number(tracking)?;
        }
        if let Some(next) = update.status {
            order.transition_to(next)?;
        }

        if !self.store.update_order(&order, expected).await? {
            tracing::warn!(order_id = %id, expected = expected.as_str(), "order changed underneath status update");
            return Err(MarketplaceError::Conflict(format!("order {id} is no longer {}", expected.as_str())));
        }
        tracing::info!(order_id = %id, from = expected.as_str(), to = order.status().as_str(), "order updated");
        self.events.publish_all(&order.take_events()).await;
        Ok(order)
    }

    /// Orders outside the caller's scope are reported as missing.
    async fn fetch(&self, id: OrderId, visible: impl Fn(&Order) -> bool) -> Result<Order> {
        self.store.get_order(id).await?.filter(|o| visible(o)).ok_or(MarketplaceError::OrderNotFound)
    }
}
