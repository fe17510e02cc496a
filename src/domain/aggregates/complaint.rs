//! Complaint tickets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use crate::domain::value_objects::{reference_number, AccountId, ComplaintId, OrderId, UnknownVariant};
use crate::domain::events::{ComplaintEvent, DomainEvent};

#[derive(Clone, Debug, Serialize)]
pub struct Complaint {
    pub id: ComplaintId,
    pub ticket_number: String,
    pub user_id: AccountId,
    pub order_id: Option<OrderId>,
    pub subject: String,
    pub description: String,
    pub category: ComplaintCategory,
    pub priority: Priority,
    pub status: ComplaintStatus,
    pub assigned_to: Option<AccountId>,
    pub resolution: Option<String>,
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintCategory { ProductQuality, DeliveryIssue, PaymentIssue, ServiceIssue, Other }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority { Low, #[default] Medium, High, Urgent }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus { #[default] Open, InProgress, Resolved, Closed }

macro_rules! labels {
    ($ty:ty { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self { $(Self::$variant => $label),+ }
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    other => Err(UnknownVariant(other.to_string())),
                }
            }
        }
    };
}

labels!(ComplaintCategory {
    ProductQuality => "product_quality", DeliveryIssue => "delivery_issue", PaymentIssue => "payment_issue",
    ServiceIssue => "service_issue", Other => "other",
});
labels!(Priority { Low => "low", Medium => "medium", High => "high", Urgent => "urgent" });
labels!(ComplaintStatus { Open => "open", InProgress => "in_progress", Resolved => "resolved", Closed => "closed" });

#[derive(Clone, Debug, Deserialize)]
pub struct NewComplaint {
    pub user_id: AccountId,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    pub subject: String,
    pub description: String,
    pub category: ComplaintCategory,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ComplaintUpdate {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub category: Option<ComplaintCategory>,
    pub priority: Option<Priority>,
    pub status: Option<ComplaintStatus>,
    pub assigned_to: Option<AccountId>,
    pub attachments: Option<Vec<String>>,
}

impl Complaint {
    pub fn open(input: NewComplaint, assignee: AccountId) -> Result<(Self, DomainEvent), ComplaintError> {
        if input.subject.trim().is_empty() { return Err(ComplaintError::MissingField("subject")); }
        if input.description.trim().is_empty() { return Err(ComplaintError::MissingField("description")); }
        let now = Utc::now();
        let complaint = Self {
            id: ComplaintId::new(), ticket_number: reference_number("TKT"), user_id: input.user_id,
            order_id: input.order_id, subject: input.subject, description: input.description,
            category: input.category, priority: input.priority, status: ComplaintStatus::Open,
            assigned_to: Some(assignee), resolution: None, attachments: input.attachments,
            created_at: now, updated_at: now,
        };
        let event = DomainEvent::Complaint(ComplaintEvent::Opened {
            complaint_id: complaint.id, ticket_number: complaint.ticket_number.clone(),
        });
        Ok((complaint, event))
    }

    pub fn apply_update(&mut self, update: ComplaintUpdate) -> Result<(), ComplaintError> {
        if update.subject.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(ComplaintError::MissingField("subject"));
        }
        if let Some(subject) = update.subject { self.subject = subject; }
        if let Some(description) = update.description { self.description = description; }
        if let Some(category) = update.category { self.category = category; }
        if let Some(priority) = update.priority { self.priority = priority; }
        if let Some(status) = update.status { self.status = status; }
        if let Some(assignee) = update.assigned_to { self.assigned_to = Some(assignee); }
        if let Some(attachments) = update.attachments { self.attachments = attachments; }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn resolve(&mut self, resolution: impl Into<String>, status: ComplaintStatus) -> Result<DomainEvent, ComplaintError> {
        if !matches!(status, ComplaintStatus::Resolved | ComplaintStatus::Closed) {
            return Err(ComplaintError::NotAResolution(status));
        }
        self.status = status;
        self.resolution = Some(resolution.into());
        self.updated_at = Utc::now();
        Ok(DomainEvent::Complaint(ComplaintEvent::Resolved { complaint_id: self.id, status }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComplaintError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{} is not a resolving status", .0.as_str())]
    NotAResolution(ComplaintStatus),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_complaint() -> NewComplaint {
        NewComplaint {
            user_id: AccountId::new(), order_id: None, subject: "Late delivery".into(),
            description: "Shipment is a week late".into(), category: ComplaintCategory::DeliveryIssue,
            priority: Priority::default(), attachments: vec![],
        }
    }

    #[test]
    fn test_open_defaults() {
        let admin = AccountId::new();
        let (c, _) = Complaint::open(new_complaint(), admin).unwrap();
        assert_eq!(c.status, ComplaintStatus::Open);
        assert_eq!(c.priority, Priority::Medium);
        assert_eq!(c.assigned_to, Some(admin));
        assert!(c.ticket_number.starts_with("TKT-"));
    }

    #[test]
    fn test_resolve() {
        let (mut c, _) = Complaint::open(new_complaint(), AccountId::new()).unwrap();
        assert_eq!(c.resolve("n/a", ComplaintStatus::InProgress), Err(ComplaintError::NotAResolution(ComplaintStatus::InProgress)));
        c.resolve("Refund issued", ComplaintStatus::Closed).unwrap();
        assert_eq!(c.status, ComplaintStatus::Closed);
        assert_eq!(c.resolution.as_deref(), Some("Refund issued"));
    }

    #[test]
    fn test_labels_round_trip_through_storage_strings() {
        assert_eq!("in_progress".parse::<ComplaintStatus>().unwrap(), ComplaintStatus::InProgress);
        assert_eq!(ComplaintCategory::PaymentIssue.as_str(), "payment_issue");
        assert!("critical".parse::<Priority>().is_err());
    }
}
