// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! CRC-32 integrity engine (§4.4), backed by `crc32fast`'s SIMD-accelerated
//! implementation - the same checksum crate the teacher's async checksum
//! adapter uses.

use objectvault_domain::services::IntegrityEngine;

#[derive(Debug, Default, Clone, Copy)]
pub struct Crc32Engine;

impl IntegrityEngine for Crc32Engine {
    fn crc32(&self, bytes: &[u8]) -> u32 {
        crc32fast::hash(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_detects_single_byte_tamper() {
        let engine = Crc32Engine;
        let original = b"chunk payload bytes";
        let expected = engine.crc32(original);
        assert!(engine.verify(original, expected));

        let mut tampered = original.to_vec();
        tampered[0] ^= 0x01;
        assert!(!engine.verify(&tampered, expected));
    }
}
