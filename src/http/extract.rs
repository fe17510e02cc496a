//! Request extractors: caller identity and JSON-rejecting wrappers.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};

use crate::domain::value_objects::{AccountId, Caller, Role};
use crate::http::ApiError;

pub const ACCOUNT_ID_HEADER: &str = "x-account-id";
pub const ACCOUNT_ROLE_HEADER: &str = "x-account-role";

/// Identity resolved by the upstream account directory and forwarded in
/// `x-account-id` / `x-account-role`.
#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok());
        let account_id = header(ACCOUNT_ID_HEADER)
            .and_then(|v| v.parse::<AccountId>().ok())
            .ok_or_else(|| ApiError::unauthorized("missing or malformed x-account-id"))?;
        let role = header(ACCOUNT_ROLE_HEADER)
            .and_then(|v| v.parse::<Role>().ok())
            .ok_or_else(|| ApiError::unauthorized("missing or malformed x-account-role"))?;
        Ok(Caller { account_id, role })
    }
}

macro_rules! role_extractor {
    ($(#[$meta:meta])* $name:ident, $role:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name(pub AccountId);

        #[async_trait]
        impl<S> FromRequestParts<S> for $name
        where
            S: Send + Sync,
        {
            type Rejection = ApiError;

            async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
                let caller = Caller::from_request_parts(parts, state).await?;
                if caller.role != $role {
                    return Err(ApiError::forbidden(format!(
                        "{} access required, caller is {}",
                        $role.as_str(),
                        caller.role.as_str()
                    )));
                }
                Ok(Self(caller.account_id))
            }
        }
    };
}

role_extractor!(
    /// A caller acting as a supplier.
    SupplierCaller,
    Role::Supplier
);
role_extractor!(VendorCaller, Role::Vendor);
role_extractor!(AdminCaller, Role::Admin);

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: serde::Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response { axum::Json(self.0).into_response() }
}

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);
