//! Integrity Engine port (§4.4): CRC-32 over the encrypted chunk bytes,
//! independent of key access.

pub trait IntegrityEngine: Send + Sync {
    fn crc32(&self, bytes: &[u8]) -> u32;

    fn verify(&self, bytes: &[u8], expected: u32) -> bool {
        self.crc32(bytes) == expected
    }
}
