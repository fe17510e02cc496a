//! Administrator complaint ticketing.

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::aggregates::{Complaint, ComplaintStatus, ComplaintUpdate, NewComplaint};
use crate::domain::value_objects::{AccountId, ComplaintId};
use crate::messaging::EventPublisher;
use crate::store::{ComplaintFilter, Store};
use crate::{MarketplaceError, Result};

#[derive(Clone, Debug, Deserialize)]
pub struct ResolveComplaint {
    pub resolution: String,
    #[serde(default = "resolved")]
    pub status: ComplaintStatus,
}

fn resolved() -> ComplaintStatus { ComplaintStatus::Resolved }

#[derive(Clone)]
pub struct ComplaintService {
    store: Arc<dyn Store>,
    events: Arc<dyn EventPublisher>,
}

impl ComplaintService {
    pub fn new(store: Arc<dyn Store>, events: Arc<dyn EventPublisher>) -> Self { Self { store, events } }

    pub async fn open_complaint(&self, admin_id: AccountId, input: NewComplaint) -> Result<Complaint> {
        let (complaint, event) = Complaint::open(input, admin_id)?;
        self.store.insert_complaint(&complaint).await?;
        tracing::info!(ticket = %complaint.ticket_number, "complaint opened");
        self.events.publish(&event).await;
        Ok(complaint)
    }

    pub async fn list_complaints(&self, filter: ComplaintFilter) -> Result<Vec<Complaint>> {
        Ok(self.store.list_complaints(&filter).await?)
    }

    pub async fn update_complaint(&self, id: ComplaintId, update: ComplaintUpdate) -> Result<Complaint> {
        let mut complaint = self.fetch(id).await?;
        complaint.apply_update(update)?;
        self.store.update_complaint(&complaint).await?;
        Ok(complaint)
    }

    pub async fn resolve_complaint(&self, id: ComplaintId, input: ResolveComplaint) -> Result<Complaint> {
        if input.resolution.trim().is_empty() {
            return Err(MarketplaceError::Validation("resolution is required".into()));
        }
        let mut complaint = self.fetch(id).await?;
        let event = complaint.resolve(input.resolution, input.status)?;
        self.store.update_complaint(&complaint).await?;
        tracing::info!(ticket = %complaint.ticket_number, status = input.status.as_str(), "complaint resolved");
        self.events.publish(&event).await;
        Ok(complaint)
    }

    async fn fetch(&self, id: ComplaintId) -> Result<Complaint> {
        self.store.get_complaint(id).await?.ok_or(MarketplaceError::ComplaintNotFound)
    }
}
