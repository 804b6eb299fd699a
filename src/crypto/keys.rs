use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::CryptoError;
use super::encryption::EncryptedData;

pub const KEY_LENGTH: usize = 32; // AES-256

/// Data encryption key for patient-owned records, zeroed on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ProfileKey {
    key_bytes: [u8; KEY_LENGTH],
}

impl ProfileKey {
    pub fn from_bytes(key_bytes: [u8; KEY_LENGTH]) -> Self {
        Self { key_bytes }
    }

    /// Encrypt data using AES-256-GCM
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedData, CryptoError> {
        EncryptedData::encrypt(&self.key_bytes, plaintext)
    }

    /// Decrypt data using AES-256-GCM
    pub fn decrypt(&self, encrypted: &EncryptedData) -> Result<Vec<u8>, CryptoError> {
        encrypted.decrypt(&self.key_bytes)
    }

    /// Serialize to JSON and seal into the `[nonce][ciphertext]` byte layout.
    pub fn seal_json<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CryptoError> {
        let plaintext = serde_json::to_vec(value)?;
        Ok(self.encrypt(&plaintext)?.to_bytes())
    }

    /// Inverse of [`ProfileKey::seal_json`].
    pub fn open_json<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CryptoError> {
        let encrypted = EncryptedData::from_bytes(bytes)?;
        let plaintext = self.decrypt(&encrypted)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

impl std::fmt::Debug for ProfileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ProfileKey(<redacted>)")
    }
}
