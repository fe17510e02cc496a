//! Bazaar Setu B2B Marketplace
//!
//! Backend connecting suppliers, vendors and administrators.
//!
//! ## Features
//! - Supplier catalog management and vendor product search
//! - Order placement with all-or-nothing inventory reservation
//! - Supplier-driven order status workflow
//! - Complaint ticketing for administrators

pub mod config;
pub mod domain;
pub mod http;
pub mod messaging;
pub mod placement;
pub mod services;
pub mod store;

use thiserror::Error;

use domain::aggregates::{ComplaintError, OrderError, ProductError};
use placement::PlacementError;
use store::StoreError;

pub use services::Marketplace;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum MarketplaceError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Complaint not found")]
    ComplaintNotFound,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("Order was modified concurrently: {0}")]
    Conflict(String),

    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<ProductError> for MarketplaceError {
    fn from(err: ProductError) -> Self { Self::Validation(err.to_string()) }
}

impl From<ComplaintError> for MarketplaceError {
    fn from(err: ComplaintError) -> Self { Self::Validation(err.to_string()) }
}

pub type Result<T> = std::result::Result<T, MarketplaceError>;
