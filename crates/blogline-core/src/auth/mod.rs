//! Authentication module for managing credentials and the user session.
//!
//! This module provides:
//! - `CredentialStore`: token persistence (memory, file, or OS keyring)
//! - `SessionState`: the process-wide signed-in user
//! - `hydrate` / `spawn_hydration`: restore the session at startup
//! - `OtpCountdown`: the signup verification countdown
//!
//! Access tokens are assumed to expire after 15 minutes, refresh tokens after 7 days.

pub mod credentials;
pub mod hydration;
pub mod otp;
pub mod session;

pub use credentials::{
    Credential, CredentialStore, FileCredentialStore, KeyringCredentialStore, MemoryCredentialStore,
};
pub use hydration::{hydrate, spawn_hydration};
pub use otp::{format_countdown, OtpCountdown, PendingOtp};
pub use session::{Session, SessionState};
