//! REST API client module for the blogging backend.
//!
//! `HttpClient` is the single choke point for backend calls: it attaches the
//! stored bearer token, renews it on 401 and ends the session when renewal
//! is impossible. `AuthApi` and `BlogApi` are typed wrappers on top of it.

pub mod auth;
pub mod blogs;
pub mod client;
pub mod error;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::AuthApi;
pub use blogs::BlogApi;
pub use client::{HttpClient, Notice};
pub use error::ApiError;
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
