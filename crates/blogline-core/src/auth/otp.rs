use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OTP expiry file name in cache directory
const OTP_EXPIRY_FILE: &str = "otp_expiry.json";

/// How long an emailed OTP stays valid.
pub const OTP_VALIDITY_SECS: i64 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOtp {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Verification countdown that survives restarts.
///
/// Only the absolute expiry is persisted; the remaining time is always
/// recomputed from it.
pub struct OtpCountdown {
    cache_dir: PathBuf,
}

impl OtpCountdown {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn expiry_path(&self) -> PathBuf {
        self.cache_dir.join(OTP_EXPIRY_FILE)
    }

    /// Start a fresh countdown for `email`, replacing any pending one
    pub fn start(&self, email: &str, now: DateTime<Utc>) -> Result<PendingOtp> {
        let pending = PendingOtp {
            email: email.to_string(),
            expires_at: now + Duration::seconds(OTP_VALIDITY_SECS),
        };
        std::fs::create_dir_all(&self.cache_dir)?;
        let contents = serde_json::to_string_pretty(&pending)?;
        std::fs::write(self.expiry_path(), contents).context("Failed to write OTP expiry")?;
        Ok(pending)
    }

    pub fn pending(&self) -> Result<Option<PendingOtp>> {
        let path = self.expiry_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read OTP expiry")?;
        let pending = serde_json::from_str(&contents).context("Failed to parse OTP expiry")?;
        Ok(Some(pending))
    }

    /// Time left on the pending countdown. Once it reaches zero the stored
    /// expiry is discarded; with nothing stored the result is zero.
    pub fn remaining(&self, now: DateTime<Utc>) -> Result<Duration> {
        let Some(pending) = self.pending()? else {
            return Ok(Duration::zero());
        };
        let left = pending.expires_at - now;
        if left <= Duration::zero() {
            debug!("OTP countdown elapsed");
            self.clear()?;
            return Ok(Duration::zero());
        }
        Ok(left)
    }

    /// Time left on the countdown for `email`. With no countdown for that
    /// email the code counts as elapsed; only `start` opens a new window.
    pub fn remaining_for(&self, email: &str, now: DateTime<Utc>) -> Result<Duration> {
        match self.pending()? {
            Some(pending) if pending.email == email => self.remaining(now),
            _ => Ok(Duration::zero()),
        }
    }

    pub fn clear(&self) -> Result<()> {
        let path = self.expiry_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// `m:ss` rendering of a countdown
pub fn format_countdown(left: Duration) -> String {
    let secs = left.num_seconds().max(0);
    format!("{}:{:02}", secs / 60, secs % 60)
}
