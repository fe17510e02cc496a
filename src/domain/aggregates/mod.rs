//! Aggregates module
pub mod product;
pub mod order;
pub mod complaint;

pub use product::{NewProduct, Product, ProductError, ProductParts, ProductStatus, ProductUpdate, Specification};
pub use order::{LineItem, Order, OrderError, OrderParts, OrderStatus, PaymentStatus, ShippingAddress};
pub use complaint::{Complaint, ComplaintCategory, ComplaintError, ComplaintStatus, ComplaintUpdate, NewComplaint, Priority};
