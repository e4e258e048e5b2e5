//! Key and registration store.
//!
//! Holds the device registration and the symmetric secret key obtained
//! during activation. The raw key never leaves this module's crypto
//! boundary through logs or `Debug` output, and the key material is zeroed
//! when dropped.

use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, Result};
use crate::storage::Storage;

/// The device registration returned by activation. Immutable once issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Opaque registration identifier.
    pub id: Uuid,
}

impl Registration {
    /// Create a registration from its identifier.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self { id }
    }
}

/// Raw symmetric key material, zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    inner: Vec<u8>,
}

impl SecretKey {
    /// Decode a key from its base64 transport form.
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the text is not valid base64.
    pub fn from_base64(base64_key: &str) -> Result<Self> {
        let inner = STANDARD
            .decode(base64_key)
            .map_err(|e| CoreError::Deserialization {
                reason: format!("secret key is not valid base64: {e}"),
            })?;
        Ok(Self { inner })
    }

    /// The raw key bytes. Use inside the crypto boundary only.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Re-encode the key for transport.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.inner)
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the actual key
        f.write_str("SecretKey(***)")
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for SecretKey {}

struct KeyStoreInner {
    base64_key: Option<String>,
    registration: Option<Registration>,
}

/// Durable store for the secret key and registration.
///
/// All operations are synchronous, touch only local storage, and are safe
/// to call from any thread.
pub struct KeyStore {
    storage: Storage,
    inner: Mutex<KeyStoreInner>,
}

impl KeyStore {
    /// Open the store, loading any previously persisted key and registration.
    pub fn open(storage: Storage) -> Result<Self> {
        let base64_key = storage.load_secret_key()?;
        let registration = match storage.load_registration()? {
            Some(content) => Some(serde_json::from_str(&content)?),
            None => None,
        };
        Ok(Self {
            storage,
            inner: Mutex::new(KeyStoreInner {
                base64_key,
                registration,
            }),
        })
    }

    /// Store or overwrite the secret key, given in base64 transport form.
    pub fn put_key(&self, base64_key: &str) -> Result<()> {
        let mut inner = self.lock()?;
        self.storage.save_secret_key(base64_key)?;
        inner.base64_key = Some(base64_key.to_string());
        Ok(())
    }

    /// Retrieve the secret key, if one has been provisioned.
    pub fn get_key(&self) -> Result<Option<SecretKey>> {
        let inner = self.lock()?;
        inner
            .base64_key
            .as_deref()
            .map(SecretKey::from_base64)
            .transpose()
    }

    /// Store or overwrite the device registration.
    pub fn put_registration(&self, registration: Registration) -> Result<()> {
        let mut inner = self.lock()?;
        let content = serde_json::to_string(&registration)?;
        self.storage.save_registration(&content)?;
        inner.registration = Some(registration);
        Ok(())
    }

    /// Retrieve the device registration, if activation has completed.
    pub fn get_registration(&self) -> Result<Option<Registration>> {
        Ok(self.lock()?.registration)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, KeyStoreInner>> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Storage("key store mutex poisoned".to_string()))
    }
}
