//! Crypto Engine port (§4.3): authenticated symmetric encryption of chunk
//! payloads. Tag mismatch or malformed ciphertext must surface as
//! `ObjectVaultError::Crypto`, never be silently swallowed.

use crate::error::ObjectVaultError;

pub trait CryptoEngine: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, ObjectVaultError>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, ObjectVaultError>;
}
