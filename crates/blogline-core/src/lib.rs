//! Blogline core - the client library behind the `blogline` front ends.
//!
//! This crate provides:
//! - `auth`: credential storage, the process-wide session and startup hydration
//! - `api`: the HTTP client core (bearer attachment, 401 handling, token refresh)
//!   and typed wrappers for the auth, profile and blog endpoints
//! - `feed`: category filtering and pagination over fetched blogs
//! - `config`: persisted configuration and directory layout

pub mod api;
pub mod auth;
pub mod config;
pub mod feed;
pub mod models;
pub mod utils;

pub use api::{ApiError, AuthApi, BlogApi, HttpClient, Notice};
pub use auth::{Credential, CredentialStore, Session, SessionState};
pub use config::Config;
