pub mod keys;
pub mod encryption;

pub use keys::*;
pub use encryption::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: wrong key or corrupted data")]
    DecryptionFailed,

    #[error("Corrupted record payload")]
    CorruptedPayload,

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
