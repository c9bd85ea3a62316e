//! REST API client
//!
//! One `ResourceApi` per entity type, all sharing a single `reqwest::Client`.
//! Errors are returned as `ApiError` values with a uniform `message()`.

pub mod client;
pub mod errors;

pub use client::{ApiClient, ResourceApi, ResourceClient};
pub use errors::{classify_message, ApiError, FailureKind};
