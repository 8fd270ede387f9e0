//! Canonical hashing of ledger values
//!
//! Every hashed value appends a fixed byte encoding of itself to a shared
//! buffer through [`HashPart`]; [`hash_full`] then takes one SHA-256 digest of
//! the whole buffer. The encoding is consensus-relevant:
//!
//! - integers are written as 8 bytes little-endian (`u32` is widened first)
//! - strings are a compact-size length followed by the UTF-8 bytes
//! - amounts are the minimal big-endian magnitude, `0x00` for zero
//! - digests are their raw 32 bytes
//! - composites write their fields in declaration order
//!
//! Changing any of these rules changes every transaction and block hash.

use crate::{Amount, Hash};
use sha2::{Digest, Sha256};

/// A value with a canonical byte encoding for hashing
pub trait HashPart {
    /// Append the canonical encoding of `self` to `buffer`
    fn hash_part(&self, buffer: &mut Vec<u8>);
}

/// Digest of the full canonical encoding of `value`
pub fn hash_full<T: HashPart + ?Sized>(value: &T) -> Hash {
    let mut buffer = Vec::new();
    value.hash_part(&mut buffer);
    Hash::new(Sha256::digest(&buffer).into())
}

/// Digest of two digests written back to back
pub fn hash_multi(left: &Hash, right: &Hash) -> Hash {
    hash_full(&(*left, *right))
}

/// Write a compact-size length prefix
fn write_var_int(len: u64, buffer: &mut Vec<u8>) {
    if len < 0xfd {
        buffer.push(len as u8);
    } else if len <= u64::from(u16::MAX) {
        buffer.push(0xfd);
        buffer.extend_from_slice(&(len as u16).to_le_bytes());
    } else if len <= u64::from(u32::MAX) {
        buffer.push(0xfe);
        buffer.extend_from_slice(&(len as u32).to_le_bytes());
    } else {
        buffer.push(0xff);
        buffer.extend_from_slice(&len.to_le_bytes());
    }
}

impl HashPart for u64 {
    fn hash_part(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.to_le_bytes());
    }
}

impl HashPart for u32 {
    fn hash_part(&self, buffer: &mut Vec<u8>) {
        u64::from(*self).hash_part(buffer);
    }
}

impl HashPart for str {
    fn hash_part(&self, buffer: &mut Vec<u8>) {
        write_var_int(self.len() as u64, buffer);
        buffer.extend_from_slice(self.as_bytes());
    }
}

impl HashPart for String {
    fn hash_part(&self, buffer: &mut Vec<u8>) {
        self.as_str().hash_part(buffer);
    }
}

impl HashPart for Amount {
    fn hash_part(&self, buffer: &mut Vec<u8>) {
        let mut bytes = [0u8; 32];
        self.to_big_endian(&mut bytes);
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(31);
        buffer.extend_from_slice(&bytes[start..]);
    }
}

impl HashPart for Hash {
    fn hash_part(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(self.as_bytes());
    }
}

impl<A: HashPart, B: HashPart> HashPart for (A, B) {
    fn hash_part(&self, buffer: &mut Vec<u8>) {
        self.0.hash_part(buffer);
        self.1.hash_part(buffer);
    }
}

impl<T: HashPart + ?Sized> HashPart for &T {
    fn hash_part(&self, buffer: &mut Vec<u8>) {
        (**self).hash_part(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<T: HashPart + ?Sized>(value: &T) -> Vec<u8> {
        let mut buffer = Vec::new();
        value.hash_part(&mut buffer);
        buffer
    }

    #[test]
    fn test_integer_encoding() {
        assert_eq!(encode(&1668044556u64), hex::decode("0c576c6300000000").unwrap());
        assert_eq!(encode(&1u32), vec![1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_string_encoding() {
        assert_eq!(encode("F000100"), b"\x07F000100".to_vec());
        assert_eq!(encode(""), vec![0]);

        let long = "x".repeat(300);
        let encoded = encode(long.as_str());
        assert_eq!(&encoded[..3], &[0xfd, 0x2c, 0x01]);
        assert_eq!(encoded.len(), 303);
    }

    #[test]
    fn test_var_int_boundaries() {
        let mut buffer = Vec::new();
        write_var_int(0xfc, &mut buffer);
        assert_eq!(buffer, vec![0xfc]);

        buffer.clear();
        write_var_int(0xfd, &mut buffer);
        assert_eq!(buffer, vec![0xfd, 0xfd, 0x00]);

        buffer.clear();
        write_var_int(0x1_0000, &mut buffer);
        assert_eq!(buffer, vec![0xfe, 0x00, 0x00, 0x01, 0x00]);

        buffer.clear();
        write_var_int(0x1_0000_0000, &mut buffer);
        assert_eq!(buffer, vec![0xff, 0, 0, 0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn test_amount_encoding() {
        assert_eq!(encode(&Amount::from(1_000_000_000u64)), vec![0x3b, 0x9a, 0xca, 0x00]);
        assert_eq!(encode(&Amount::zero()), vec![0x00]);
        assert_eq!(encode(&Amount::from(1u64)), vec![0x01]);

        // 2^64 needs nine bytes
        let big = Amount::from(u64::MAX) + Amount::one();
        assert_eq!(encode(&big), vec![1, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_hash_multi_is_concatenation() {
        let a = Hash::new([1u8; 32]);
        let b = Hash::new([2u8; 32]);

        let mut joined = Vec::new();
        joined.extend_from_slice(a.as_bytes());
        joined.extend_from_slice(b.as_bytes());
        let expected = Hash::new(Sha256::digest(&joined).into());

        assert_eq!(hash_multi(&a, &b), expected);
        assert_ne!(hash_multi(&a, &b), hash_multi(&b, &a));
    }

    #[test]
    fn test_hash_full_deterministic() {
        let value = ("purchase".to_string(), 42u64);
        assert_eq!(hash_full(&value), hash_full(&value));
        assert_ne!(hash_full(&value), hash_full(&("purchase".to_string(), 43u64)));
    }

    #[test]
    fn test_empty_sha256() {
        assert_eq!(
            hash_full("").to_hex(),
            // sha256 of the single length byte 0x00
            "6e340b9cffb37a989ca544e6bb780a2c78901d3fb33738768511a30617afa01d"
        );
    }
}
