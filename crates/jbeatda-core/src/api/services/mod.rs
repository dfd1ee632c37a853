//! Typed bindings for the backend endpoints.
//!
//! Each service is a trait so repositories can be exercised against fakes;
//! the `Http*` adapters are the production bindings over the shared
//! `ApiClient`.

use std::future::Future;

use super::ApiError;
use crate::models::{LoginRequest, LoginResponse, LogoutResponse, Stamp, UserInfo};

mod stamp;
mod user;

pub use stamp::HttpStampService;
pub use user::HttpUserService;

/// Account endpoints under `users/`.
pub trait UserService: Send + Sync {
    /// Exchange credentials for an access token. Sent without a bearer token.
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<LoginResponse, ApiError>> + Send;

    /// Tell the backend the current token is done with.
    fn logout(&self) -> impl Future<Output = Result<LogoutResponse, ApiError>> + Send;

    /// The signed-in user.
    fn me(&self) -> impl Future<Output = Result<UserInfo, ApiError>> + Send;
}

/// Stamp endpoints under `stamps/`.
pub trait StampService: Send + Sync {
    /// Every stamp the signed-in user has collected.
    ///
    /// The backend answers `404` rather than an empty list when there are
    /// none; that surfaces here as `ApiError::NotFound`.
    fn my_stamps(&self) -> impl Future<Output = Result<Vec<Stamp>, ApiError>> + Send;

    fn stamp_for_menu(
        &self,
        menu_id: i64,
    ) -> impl Future<Output = Result<Stamp, ApiError>> + Send;

    fn delete_stamp(&self, stamp_id: i64) -> impl Future<Output = Result<(), ApiError>> + Send;
}
