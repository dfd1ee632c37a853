//! REST API client module for the jbeatda backend.
//!
//! This module provides the shared `ApiClient`, which attaches the current
//! session's bearer token to every request at dispatch time and turns a
//! backend rejection (HTTP 401) into a forced local logout, plus the typed
//! service bindings (`UserService`, `StampService`) built on top of it.

pub mod client;
pub mod error;
pub mod services;

pub use client::{ApiClient, ClientConfig};
pub use error::ApiError;
pub use services::{HttpStampService, HttpUserService, StampService, UserService};
