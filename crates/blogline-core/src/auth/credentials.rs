use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SERVICE_NAME: &str = "blogline";

/// Keychain account under which the serialized credential is stored
const KEYRING_ACCOUNT: &str = "session";

/// Credential file name in cache directory
const CREDENTIAL_FILE: &str = "credentials.json";

/// Access token lifetime (1/96 of a day).
const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;

/// Refresh token lifetime.
const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Access/refresh token pair with the expiry assumed at issue time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn issue(access_token: &str, refresh_token: &str, now: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            access_expires_at: now + Duration::minutes(ACCESS_TOKEN_TTL_MINUTES),
            refresh_expires_at: now + Duration::days(REFRESH_TOKEN_TTL_DAYS),
        }
    }

    /// Access token, unless its lifetime has lapsed
    pub fn live_access_token(&self, now: DateTime<Utc>) -> Option<&str> {
        (now < self.access_expires_at && !self.access_token.is_empty())
            .then_some(self.access_token.as_str())
    }

    /// Refresh token, unless its lifetime has lapsed
    pub fn live_refresh_token(&self, now: DateTime<Utc>) -> Option<&str> {
        (now < self.refresh_expires_at && !self.refresh_token.is_empty())
            .then_some(self.refresh_token.as_str())
    }

    /// Nothing usable is left once the refresh token is gone
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.live_refresh_token(now).is_none()
    }
}

/// Persistence for the single credential of this client.
///
/// Implementations own TTL handling: `get` never returns a credential whose
/// refresh token has expired.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Result<Option<Credential>>;

    /// Store a freshly issued pair, replacing whatever was there
    fn set(&self, access_token: &str, refresh_token: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// Drop records whose refresh token has expired, clearing them from `store`.
fn unexpired(store: &dyn CredentialStore, credential: Option<Credential>) -> Result<Option<Credential>> {
    match credential {
        Some(c) if c.is_expired(Utc::now()) => {
            debug!("Stored credential expired, clearing");
            store.clear()?;
            Ok(None)
        }
        other => Ok(other),
    }
}

/// In-process store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<Credential>>> {
        self.slot
            .lock()
            .map_err(|_| anyhow!("Credential store lock poisoned"))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<Credential>> {
        let current = self.lock()?.clone();
        unexpired(self, current)
    }

    fn set(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        *self.lock()? = Some(Credential::issue(access_token, refresh_token, Utc::now()));
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }
}

/// JSON file in the cache directory.
///
/// Writes go to a private temp file that is renamed over the credential
/// file, so readers in this or another process never see a partial record.
pub struct FileCredentialStore {
    cache_dir: PathBuf,
    io_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            io_lock: Mutex::new(()),
        }
    }

    fn credential_path(&self) -> PathBuf {
        self.cache_dir.join(CREDENTIAL_FILE)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.io_lock
            .lock()
            .map_err(|_| anyhow!("Credential file lock poisoned"))
    }

    fn load(&self) -> Result<Option<Credential>> {
        let path = self.credential_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .context("Failed to read credential file")?;
        let credential = serde_json::from_str(&contents)
            .context("Failed to parse credential file")?;
        Ok(Some(credential))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        std::fs::create_dir_all(&self.cache_dir)?;
        let contents = serde_json::to_string_pretty(credential)?;

        // Per-process name keeps concurrent CLI processes off each other's temp file
        let tmp_path = self
            .cache_dir
            .join(format!(".{}.{}.tmp", CREDENTIAL_FILE, std::process::id()));
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(&tmp_path)
            .context("Failed to create credential file")?;
        file.write_all(contents.as_bytes())
            .and_then(|_| file.sync_all())
            .context("Failed to write credential file")?;
        drop(file);

        std::fs::rename(&tmp_path, self.credential_path())
            .context("Failed to replace credential file")?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        let path = self.credential_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove credential file")?;
        }
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Option<Credential>> {
        let current = {
            let _guard = self.lock()?;
            self.load()?
        };
        unexpired(self, current)
    }

    fn set(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        let credential = Credential::issue(access_token, refresh_token, Utc::now());
        let _guard = self.lock()?;
        self.save(&credential)
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.lock()?;
        self.remove()
    }
}

/// OS keychain entry holding the serialized credential
pub struct KeyringCredentialStore;

impl KeyringCredentialStore {
    fn entry() -> Result<Entry> {
        Entry::new(SERVICE_NAME, KEYRING_ACCOUNT).context("Failed to create keyring entry")
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn get(&self) -> Result<Option<Credential>> {
        let current = match Self::entry()?.get_password() {
            Ok(secret) => Some(
                serde_json::from_str(&secret).context("Failed to parse credential from keychain")?,
            ),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => return Err(e).context("Failed to retrieve credential from keychain"),
        };
        unexpired(self, current)
    }

    fn set(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        let secret = serde_json::to_string(&Credential::issue(access_token, refresh_token, Utc::now()))?;
        Self::entry()?
            .set_password(&secret)
            .context("Failed to store credential in keychain")
    }

    fn clear(&self) -> Result<()> {
        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}
