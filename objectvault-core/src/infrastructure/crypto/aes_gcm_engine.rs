// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # AES-256-GCM Crypto Engine
//!
//! Concrete implementation of `CryptoEngine` (§4.3): authenticated
//! symmetric encryption with a 96-bit random nonce prepended to the
//! ciphertext, so decryption can recover it without a side channel. The
//! authentication tag lives in the ciphertext the `aes-gcm` crate
//! produces, so any single-byte tamper is rejected during decryption
//! rather than silently accepted.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key};

use objectvault_domain::services::CryptoEngine;
use objectvault_domain::ObjectVaultError;

const NONCE_LEN: usize = 12;

pub struct AesGcmEngine {
    cipher: Aes256Gcm,
}

impl AesGcmEngine {
    /// `key` must be exactly 32 bytes. The key is supplied at
    /// initialization per §4.3 and held for the engine's lifetime.
    pub fn new(key: &[u8]) -> Result<Self, ObjectVaultError> {
        if key.len() != 32 {
            return Err(ObjectVaultError::Crypto(format!(
                "AES-256-GCM requires a 32-byte key, got {}",
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        Ok(Self { cipher })
    }
}

impl CryptoEngine for AesGcmEngine {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, ObjectVaultError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| ObjectVaultError::Crypto(format!("encryption failed: {e}")))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, ObjectVaultError> {
        if ciphertext.len() < NONCE_LEN {
            return Err(ObjectVaultError::Crypto("ciphertext shorter than nonce".into()));
        }
        let (nonce, body) = ciphertext.split_at(NONCE_LEN);
        self.cipher
            .decrypt(nonce.into(), body)
            .map_err(|e| ObjectVaultError::Crypto(format!("decryption failed (tag mismatch): {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> AesGcmEngine {
        AesGcmEngine::new(&[7u8; 32]).unwrap()
    }

    #[test]
    fn roundtrips() {
        let e = engine();
        let plaintext = b"the quick brown fox jumps over the lazy dog";
        let ciphertext = e.encrypt(plaintext).unwrap();
        assert_eq!(e.decrypt(&ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn tamper_is_rejected() {
        let e = engine();
        let mut ciphertext = e.encrypt(b"hello vault").unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xFF;
        assert!(e.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn rejects_short_key() {
        assert!(AesGcmEngine::new(&[1u8; 16]).is_err());
    }
}
