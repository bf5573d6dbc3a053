//! # Integrity Functions
//!
//! Digests computed over the UTF-8 plaintext of an event before it is
//! encrypted, carried in the transport header, and recomputed on receipt.
//!
//! `crc16` is CRC-16/ARC (Modbus polynomial, zero initial value):
//! reflected polynomial `0xA001`, LSB-first, rendered as 4 lowercase hex
//! digits. Every peer must produce the same text for the same input.

use sha2::{Digest, Sha256};
use shared_types::Provider;

/// Digest function.
pub type IntegrityFn = fn(&[u8]) -> String;

/// Integrity provider contract.
pub trait IntegrityProvider: Provider {
    /// Function registered under `name`.
    fn select_integrity_function(&self, name: &str) -> Option<IntegrityFn>;

    /// Names of the available functions.
    fn available(&self) -> Vec<&'static str>;

    /// Whether `digest` matches `name(plaintext)`. Unknown names never match.
    fn integrity_check(&self, plaintext: &str, digest: &str, name: &str) -> bool {
        self.select_integrity_function(name)
            .is_some_and(|f| f(plaintext.as_bytes()) == digest)
    }
}

/// CRC-16/ARC.
#[must_use]
pub fn crc16(data: &[u8]) -> String {
    const POLY: u16 = 0xA001;
    let mut crc: u16 = 0x0000;
    for b in data {
        crc ^= u16::from(*b);
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    format!("{crc:04x}")
}

/// SHA-256 as lowercase hex.
#[must_use]
pub fn sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Built-in integrity functions.
#[derive(Debug, Default, Clone)]
pub struct DefaultIntegrity;

impl Provider for DefaultIntegrity {}

impl IntegrityProvider for DefaultIntegrity {
    fn select_integrity_function(&self, name: &str) -> Option<IntegrityFn> {
        match name {
            "crc16" => Some(crc16),
            "sha256" => Some(sha256),
            _ => None,
        }
    }

    fn available(&self) -> Vec<&'static str> {
        vec!["crc16", "sha256"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_reference_values() {
        assert_eq!(crc16(b"test"), "f82e");
        assert_eq!(crc16(b"123456789"), "bb3d");
        assert_eq!(crc16(b""), "0000");
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_integrity_check() {
        let p = DefaultIntegrity;
        assert!(p.integrity_check("test", "f82e", "crc16"));
        assert!(!p.integrity_check("test", "0000", "crc16"));
        assert!(!p.integrity_check("test", "f82e", "md5"));
    }
}
