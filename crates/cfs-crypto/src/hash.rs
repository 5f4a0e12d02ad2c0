//! 128-bit content hash: hex formatting, shard paths, and hash-shape validation

use binrw::{BinRead, BinWrite};
use std::fmt;

use crate::error::CryptoError;

/// A 128-bit MD5 digest used to address content by its bytes.
///
/// The only hash type this format supports is MD5 over 16 bytes; there is no
/// algorithm tag in the wire format, so `Hash` does not carry one either.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 16]);

impl Hash {
    /// Wrap a raw 16-byte digest.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Digest of `data`.
    #[must_use]
    pub fn from_data(data: &[u8]) -> Self {
        let digest = md5::compute(data);
        Self(digest.0)
    }

    /// Parse a 32-character lowercase hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        if !Self::is_hash(s) {
            return Err(CryptoError::InvalidHash(s.to_string()));
        }
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| CryptoError::InvalidHash(s.to_string()))?;
        Ok(Self(bytes))
    }

    /// The raw 16 bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Lowercase hex representation, always 32 characters.
    #[must_use]
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// `true` iff `s` is exactly 32 characters, all `[0-9a-f]`.
    #[must_use]
    pub fn is_hash(s: &str) -> bool {
        s.len() == 32 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    /// Shard path `<first 2 hex chars>/<remaining 30>`, used to spread blobs
    /// across directories on disk-backed backends.
    #[must_use]
    pub fn shard_path(self) -> String {
        let hex = self.to_hex();
        format!("{}/{}", &hex[0..2], &hex[2..])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let h = Hash::from_data(b"hello world");
        let hex = h.to_hex();
        assert_eq!(hex.len(), 32);
        assert_eq!(Hash::from_hex(&hex).expect("valid hex"), h);
    }

    #[test]
    fn known_digest() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        let h = Hash::from_data(b"");
        assert_eq!(h.to_hex(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn is_hash_rejects_wrong_length_and_case() {
        assert!(!Hash::is_hash("abc"));
        assert!(!Hash::is_hash(&"a".repeat(31)));
        assert!(!Hash::is_hash(&"A".repeat(32)));
        assert!(Hash::is_hash(&"0".repeat(32)));
    }

    #[test]
    fn shard_path_splits_first_two_chars() {
        let h = Hash::from_hex(&"ab".to_string().repeat(16)).expect("valid hex");
        assert_eq!(h.shard_path(), format!("ab/{}", "ab".repeat(15)));
    }

    #[test]
    fn different_bytes_produce_different_hashes() {
        assert_ne!(Hash::from_data(b"a"), Hash::from_data(b"b"));
    }
}
