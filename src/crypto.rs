use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};

const NONCE_LEN: usize = 12;

/// Symmetric encryption for sensitive fields at rest (bank account numbers).
/// Ciphertext is stored as base64 of `nonce || ciphertext`.
#[derive(Clone)]
pub struct SecretBox {
    cipher: ChaCha20Poly1305,
}

impl SecretBox {
    pub fn new(secret: &str) -> Self {
        let key = Sha256::digest(secret.as_bytes());
        Self {
            cipher: ChaCha20Poly1305::new(&key),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| AppError::Internal("Encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(out))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|_| AppError::Internal("Stored ciphertext is not valid base64".to_string()))?;
        if bytes.len() <= NONCE_LEN {
            return Err(AppError::Internal("Stored ciphertext is truncated".to_string()));
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| AppError::Internal("Decryption failed".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| AppError::Internal("Decrypted value is not UTF-8".to_string()))
    }
}
