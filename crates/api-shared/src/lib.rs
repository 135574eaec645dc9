//! # API Shared
//!
//! Shared utilities and definitions for the Mandal APIs.
//!
//! Contains:
//! - Request/response types with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//! - API key checking
//!
//! Used by `api-rest` and the `mandal-run` binary.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{validate_api_key, AuthError, API_KEY_HEADER};
pub use dto::*;
pub use health::HealthService;
