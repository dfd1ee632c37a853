//! Data models for jbeatda backend entities.
//!
//! - `LoginRequest`, `LoginResponse`, `LogoutResponse`, `UserInfo`: user endpoints
//! - `Profile`: the signed-in user as the client presents it
//! - `Stamp`: a menu stamp collected by the user
//! - `ErrorBody`: the backend's `{code, message}` error envelope

pub mod stamp;
pub mod user;

pub use stamp::Stamp;
pub use user::{
    ErrorBody, LoginRequest, LoginResponse, LogoutRequest, LogoutResponse, Profile, UserInfo,
};
