//! Application services, one per role-facing area.

use std::sync::Arc;

use crate::messaging::EventPublisher;
use crate::placement::OrderPlacement;
use crate::store::Store;

pub mod catalog;
pub mod complaints;
pub mod orders;

pub use catalog::{CatalogService, ProductQuery};
pub use complaints::{ComplaintService, ResolveComplaint};
pub use orders::{OrderService, StatusUpdate};

#[derive(Clone)]
pub struct Marketplace {
    pub catalog: CatalogService,
    pub orders: OrderService,
    pub complaints: ComplaintService,
}

impl Marketplace {
    pub fn new<S: Store + 'static>(store: S, events: Arc<dyn EventPublisher>, currency: &str) -> Self {
        let store = Arc::new(store);
        let placement = OrderPlacement::new(store.clone(), events.clone());
        let shared: Arc<dyn Store> = store;
        Self {
            catalog: CatalogService::new(shared.clone(), events.clone(), currency),
            orders: OrderService::new(shared.clone(), placement, events.clone()),
            complaints: ComplaintService::new(shared, events),
        }
    }
}
