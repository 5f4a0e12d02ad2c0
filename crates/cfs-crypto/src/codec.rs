//! The per-blob encode/decode pipeline: optional zlib compression followed by
//! optional AES-CFB encryption.
//!
//! Encode order is compress then encrypt (compressed bytes are less
//! redundant and so better to encrypt). Decode reverses that: decrypt first,
//! then inflate. Hashing is always applied to the stored (post-encode)
//! bytes, so a backend can content-address a blob without ever holding the
//! key.

use std::io::{Read, Write};

use aes::{Aes128, Aes192, Aes256};
use cfb_mode::{Decryptor, Encryptor};
use cipher::{AsyncStreamCipher, KeyIvInit};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::CryptoError;

/// Bitfield over `{COMPRESSED, CRYPTED}` recording how a blob was encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ContentAttribute(u8);

impl ContentAttribute {
    /// Bytes stored verbatim.
    pub const NONE: Self = Self(0);
    /// Stored bytes are zlib-deflated.
    pub const COMPRESSED: Self = Self(1);
    /// Stored bytes are AES-CFB encrypted.
    pub const CRYPTED: Self = Self(2);

    /// Build from the raw decimal integer stored in a bucket manifest line.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// The raw decimal integer as stored in a bucket manifest line.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// `true` if the `COMPRESSED` bit is set.
    #[must_use]
    pub const fn compressed(self) -> bool {
        self.0 & Self::COMPRESSED.0 != 0
    }

    /// `true` if the `CRYPTED` bit is set.
    #[must_use]
    pub const fn crypted(self) -> bool {
        self.0 & Self::CRYPTED.0 != 0
    }

    /// The default attribute for a given configuration: `COMPRESSED` if
    /// compression is enabled, `CRYPTED` if an encryption key is configured.
    #[must_use]
    pub fn default_for(compress: bool, has_encrypt_key: bool) -> Self {
        let mut bits = 0;
        if compress {
            bits |= Self::COMPRESSED.0;
        }
        if has_encrypt_key {
            bits |= Self::CRYPTED.0;
        }
        Self(bits)
    }
}

impl std::ops::BitOr for ContentAttribute {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Compress (if `attr.compressed()`) then encrypt (if `attr.crypted()`).
///
/// Returns the possibly-transformed bytes and whether the bytes actually
/// changed (and so the stored hash must be recomputed rather than reusing
/// the original hash).
pub fn encode(
    bytes: &[u8],
    key: &[u8],
    iv: &[u8; 16],
    attr: ContentAttribute,
) -> Result<(Vec<u8>, bool), CryptoError> {
    let mut data = bytes.to_vec();
    let mut changed = false;

    if attr.compressed() {
        data = zlib_deflate(&data)?;
        changed = true;
    }

    if attr.crypted() {
        data = cfb_encrypt(&data, key, iv)?;
        changed = true;
    }

    Ok((data, changed))
}

/// Decrypt (if `attr.crypted()`) then inflate (if `attr.compressed()`) —
/// the inverse of [`encode`].
pub fn decode(
    bytes: &[u8],
    key: &[u8],
    iv: &[u8; 16],
    attr: ContentAttribute,
) -> Result<Vec<u8>, CryptoError> {
    let mut data = bytes.to_vec();

    if attr.crypted() {
        data = cfb_decrypt(&data, key, iv)?;
    }

    if attr.compressed() {
        data = zlib_inflate(&data)?;
    }

    Ok(data)
}

fn zlib_deflate(data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| CryptoError::Compress(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CryptoError::Compress(e.to_string()))
}

fn zlib_inflate(data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CryptoError::Decompress(e.to_string()))?;
    Ok(out)
}

fn cfb_encrypt(data: &[u8], key: &[u8], iv: &[u8; 16]) -> Result<Vec<u8>, CryptoError> {
    let mut buf = data.to_vec();
    match key.len() {
        16 => Encryptor::<Aes128>::new(key.into(), iv.into()).encrypt(&mut buf),
        24 => Encryptor::<Aes192>::new(key.into(), iv.into()).encrypt(&mut buf),
        32 => Encryptor::<Aes256>::new(key.into(), iv.into()).encrypt(&mut buf),
        n => return Err(CryptoError::InvalidKeySize(n)),
    }
    Ok(buf)
}

fn cfb_decrypt(data: &[u8], key: &[u8], iv: &[u8; 16]) -> Result<Vec<u8>, CryptoError> {
    let mut buf = data.to_vec();
    match key.len() {
        16 => Decryptor::<Aes128>::new(key.into(), iv.into()).decrypt(&mut buf),
        24 => Decryptor::<Aes192>::new(key.into(), iv.into()).decrypt(&mut buf),
        32 => Decryptor::<Aes256>::new(key.into(), iv.into()).decrypt(&mut buf),
        n => return Err(CryptoError::InvalidKeySize(n)),
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY128: &[u8; 16] = b"0123456789abcdef";
    const IV: &[u8; 16] = b"fedcba9876543210";

    #[test]
    fn round_trip_none() {
        let data = b"the quick brown fox";
        let (out, changed) = encode(data, KEY128, IV, ContentAttribute::NONE).expect("encode");
        assert!(!changed);
        assert_eq!(out, data);
        let back = decode(&out, KEY128, IV, ContentAttribute::NONE).expect("decode");
        assert_eq!(back, data);
    }

    #[test]
    fn round_trip_compressed() {
        let data = vec![b'a'; 4096];
        let attr = ContentAttribute::COMPRESSED;
        let (out, changed) = encode(&data, KEY128, IV, attr).expect("encode");
        assert!(changed);
        assert!(out.len() < data.len());
        let back = decode(&out, KEY128, IV, attr).expect("decode");
        assert_eq!(back, data);
    }

    #[test]
    fn round_trip_crypted() {
        let data = b"top secret payload";
        let attr = ContentAttribute::CRYPTED;
        let (out, changed) = encode(data, KEY128, IV, attr).expect("encode");
        assert!(changed);
        assert_ne!(out, data);
        let back = decode(&out, KEY128, IV, attr).expect("decode");
        assert_eq!(back, data);
    }

    #[test]
    fn round_trip_compressed_and_crypted() {
        let data = vec![42u8; 1024];
        let attr = ContentAttribute::COMPRESSED | ContentAttribute::CRYPTED;
        let (out, changed) = encode(&data, KEY128, IV, attr).expect("encode");
        assert!(changed);
        let back = decode(&out, KEY128, IV, attr).expect("decode");
        assert_eq!(back, data);
    }

    #[test]
    fn aes192_and_aes256_round_trip() {
        let data = b"variable key length";
        let attr = ContentAttribute::CRYPTED;
        for key in [&b"0123456789abcdef01234567"[..], &b"0123456789abcdef0123456789abcdef"[..]] {
            let (out, _) = encode(data, key, IV, attr).expect("encode");
            let back = decode(&out, key, IV, attr).expect("decode");
            assert_eq!(back, data);
        }
    }

    #[test]
    fn wrong_key_produces_garbage_not_error() {
        let data = b"sensitive data here";
        let attr = ContentAttribute::CRYPTED;
        let (out, _) = encode(data, KEY128, IV, attr).expect("encode");
        let wrong_key = b"ffffffffffffffff";
        let back = decode(&out, wrong_key, IV, attr).expect("decode does not fail by itself");
        assert_ne!(back, data);
    }

    #[test]
    fn default_for_matches_config() {
        assert_eq!(
            ContentAttribute::default_for(false, false),
            ContentAttribute::NONE
        );
        assert_eq!(
            ContentAttribute::default_for(true, true).bits(),
            ContentAttribute::COMPRESSED.bits() | ContentAttribute::CRYPTED.bits()
        );
    }

    proptest::proptest! {
        #[test]
        fn codec_round_trip_any_bytes(data: Vec<u8>) {
            for attr_bits in 0u8..4 {
                let attr = ContentAttribute::from_bits(attr_bits);
                let (out, _) = encode(&data, KEY128, IV, attr).expect("encode");
                let back = decode(&out, KEY128, IV, attr).expect("decode");
                proptest::prop_assert_eq!(back, data.clone());
            }
        }
    }
}
