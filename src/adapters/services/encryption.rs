//! Encryption service for meta values flagged `encrypt`

use crate::config::SecretString;
use crate::domain::{MigrationError, Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose, Engine as _};
use rand::RngCore;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;

/// Opaque encryption of stored values
pub trait Encryptor: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String>;
}

/// AES-256-GCM keyed by the SHA-256 of the configured key
///
/// Output is `base64(nonce || ciphertext)` with a random 96-bit nonce.
pub struct AesGcmEncryptor {
    cipher: Aes256Gcm,
}

impl AesGcmEncryptor {
    pub fn new(key: &SecretString) -> Result<Self> {
        let digest = Sha256::digest(key.expose_secret().as_bytes());
        let cipher = Aes256Gcm::new_from_slice(digest.as_slice())
            .map_err(|e| MigrationError::Encryption(format!("Invalid key length: {e}")))?;
        Ok(Self { cipher })
    }

    /// Reverses [`Encryptor::encrypt`]
    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        let bytes = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| MigrationError::Encryption(format!("Invalid base64 payload: {e}")))?;
        if bytes.len() < NONCE_LEN {
            return Err(MigrationError::Encryption("Payload too short".to_string()));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| MigrationError::Encryption("Decryption failed".to_string()))?;
        String::from_utf8(plaintext)
            .map_err(|e| MigrationError::Encryption(format!("Invalid UTF-8 plaintext: {e}")))
    }
}

impl Encryptor for AesGcmEncryptor {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| MigrationError::Encryption("Encryption failed".to_string()))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    #[test]
    fn test_encrypt_is_reversible_and_salted() {
        let encryptor = AesGcmEncryptor::new(&secret_string("target-key".to_string())).unwrap();
        let first = encryptor.encrypt("hunter2").unwrap();
        let second = encryptor.encrypt("hunter2").unwrap();

        assert_ne!(first, second);
        assert_ne!(first, "hunter2");
        assert_eq!(encryptor.decrypt(&first).unwrap(), "hunter2");
    }

    #[test]
    fn test_decrypt_with_other_key_fails() {
        let a = AesGcmEncryptor::new(&secret_string("a".to_string())).unwrap();
        let b = AesGcmEncryptor::new(&secret_string("b".to_string())).unwrap();
        let payload = a.encrypt("secret").unwrap();
        assert!(matches!(b.decrypt(&payload), Err(MigrationError::Encryption(_))));
    }
}
