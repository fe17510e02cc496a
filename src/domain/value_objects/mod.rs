//! Value Objects for the marketplace

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self { Self(Uuid::now_v7()) }
            pub fn from_uuid(id: Uuid) -> Self { Self(id) }
            pub fn as_uuid(&self) -> Uuid { self.0 }
        }

        impl Default for $name {
            fn default() -> Self { Self::new() }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }

        impl FromStr for $name {
            type Err = uuid::Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> { Uuid::parse_str(s).map(Self) }
        }
    };
}

entity_id!(
    /// Identity of any account (supplier, vendor or admin).
    AccountId
);
entity_id!(ProductId);
entity_id!(OrderId);
entity_id!(ComplaintId);

/// Account role as resolved by the upstream account directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Supplier,
    Vendor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supplier => "supplier",
            Self::Vendor => "vendor",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supplier" => Ok(Self::Supplier),
            "vendor" => Ok(Self::Vendor),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// An already-authenticated caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caller {
    pub account_id: AccountId,
    pub role: Role,
}

/// Returned when a stored or submitted enum label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant `{0}`")]
pub struct UnknownVariant(pub String);

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_negative(&self) -> bool { self.amount.is_sign_negative() && !self.amount.is_zero() }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        let amount = self.amount.checked_add(other.amount).ok_or(MoneyError::Overflow)?;
        Ok(Money::new(amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Result<Money, MoneyError> {
        let amount = self.amount.checked_mul(Decimal::from(qty)).ok_or(MoneyError::Overflow)?;
        Ok(Money::new(amount, &self.currency))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", self.amount, self.currency) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("currency mismatch")]
    CurrencyMismatch,
    #[error("amount out of range")]
    Overflow,
}

/// Stock quantity; never negative by construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// Largest stock level a store can hold.
    pub const MAX: u32 = i32::MAX as u32;

    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn checked_add(&self, other: u32) -> Option<Self> {
        self.0.checked_add(other).filter(|v| *v <= Self::MAX).map(Self)
    }
    pub fn subtract(&self, other: u32) -> Option<Self> { self.0.checked_sub(other).map(Self) }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}

/// Human-facing reference printed on orders and tickets.
///
/// Built from a UUIDv7 so concurrent writers cannot collide and numbers
/// still sort by creation time.
pub fn reference_number(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7().simple().to_string().to_uppercase())
}
