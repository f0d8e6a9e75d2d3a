//! Encryption service for document content at rest

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};

/// Length of an AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    #[error("Encryption key must be {KEY_LEN} bytes (256 bits), got {0}")]
    InvalidKeyLength(usize),

    #[error("Failed to decode encryption key: {0}")]
    InvalidKeyEncoding(String),

    #[error("Encryption failed: {0}")]
    Encrypt(String),

    #[error("Decryption failed: {0}")]
    Decrypt(String),
}

/// Authenticated encryption of file content with AES-256-GCM.
///
/// Ciphertext layout is `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
/// A fresh random nonce is drawn for every call to [`EncryptionService::encrypt`].
#[derive(Clone)]
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService").finish_non_exhaustive()
    }
}

impl EncryptionService {
    /// Create a new encryption service from a raw 32-byte key.
    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self, EncryptionError> {
        if key_bytes.len() != KEY_LEN {
            return Err(EncryptionError::InvalidKeyLength(key_bytes.len()));
        }
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Create a new encryption service from a base64-encoded 32-byte key.
    pub fn from_base64(encoded: &str) -> Result<Self, EncryptionError> {
        let key_bytes = decode_key(encoded)?;
        Self::from_key_bytes(&key_bytes)
    }

    /// Generate fresh key material from the OS CSPRNG.
    pub fn generate_key() -> Vec<u8> {
        Aes256Gcm::generate_key(OsRng).to_vec()
    }

    /// Encrypt arbitrary bytes
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| EncryptionError::Encrypt(e.to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);
        Ok(combined)
    }

    /// Decrypt bytes produced by [`EncryptionService::encrypt`]
    pub fn decrypt(&self, combined: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        if combined.len() < NONCE_LEN {
            return Err(EncryptionError::Decrypt("Encrypted data too short".to_string()));
        }

        let (nonce, ciphertext) = combined.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| EncryptionError::Decrypt(e.to_string()))
    }
}

/// Decode a base64 key and check its length.
pub fn decode_key(encoded: &str) -> Result<Vec<u8>, EncryptionError> {
    let key_bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| EncryptionError::InvalidKeyEncoding(e.to_string()))?;
    if key_bytes.len() != KEY_LEN {
        return Err(EncryptionError::InvalidKeyLength(key_bytes.len()));
    }
    Ok(key_bytes)
}
