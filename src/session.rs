//! Bearer token storage and expiry checks.
//!
//! The backend issues a JWT on sign-in. The client never verifies its
//! signature; it only reads the `exp` claim to avoid sending requests that
//! are bound to fail. A token that cannot be decoded counts as expired.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::StorageError;

/// File name of the stored token inside the data directory.
pub const TOKEN_FILE: &str = "session.token";

/// base64url that accepts segments with or without padding.
const JWT_SEGMENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Where the bearer token lives between invocations.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, StorageError>;
    fn store(&self, token: &str) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Token kept in a file in the data directory; signing out deletes it.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn in_dir(data_dir: &std::path::Path) -> Self {
        Self::new(data_dir.join(TOKEN_FILE))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn store(&self, token: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, token).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Process-local token, used by tests and one-shot tooling.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.token.lock().map(|t| t.clone()).unwrap_or(None))
    }

    fn store(&self, token: &str) -> Result<(), StorageError> {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.to_string());
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        if let Ok(mut slot) = self.token.lock() {
            *slot = None;
        }
        Ok(())
    }
}

/// Read the `exp` claim (seconds since epoch) from a JWT.
pub fn decode_expiry(token: &str) -> Option<f64> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return None;
    };
    let bytes = JWT_SEGMENT.decode(payload).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("exp")?.as_f64()
}

pub fn is_expired_at(token: &str, now_secs: i64) -> bool {
    match decode_expiry(token) {
        Some(exp) => now_secs as f64 >= exp,
        None => true,
    }
}

/// Expired or undecodable.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now().timestamp())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOut {
    /// A token was removed; the operator has to sign in again.
    SignedOut,
    /// Nothing was stored.
    AlreadySignedOut,
}

/// Handle on the stored token shared by the API client and the commands.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(store: impl TokenStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryTokenStore::default())
    }

    pub fn token(&self) -> Result<Option<String>, StorageError> {
        self.store.load()
    }

    pub fn set_token(&self, token: &str) -> Result<(), StorageError> {
        self.store.store(token)
    }

    /// True when a token is stored and has not expired.
    pub fn validate_current(&self) -> Result<bool, StorageError> {
        Ok(self.token()?.is_some_and(|token| !is_expired(&token)))
    }

    pub fn sign_out(&self) -> Result<SignOut, StorageError> {
        if self.token()?.is_none() {
            return Ok(SignOut::AlreadySignedOut);
        }
        self.store.clear()?;
        info!("Signed out");
        Ok(SignOut::SignedOut)
    }

    /// Sign out after an auth failure. Storage errors are logged, not
    /// returned, so the caller can still report the auth failure.
    pub(crate) fn force_sign_out(&self, reason: &str) {
        match self.sign_out() {
            Ok(SignOut::SignedOut) => warn!(reason, "Session cleared"),
            Ok(SignOut::AlreadySignedOut) => {}
            Err(e) => warn!(error = %e, "Failed to clear session"),
        }
    }
}
