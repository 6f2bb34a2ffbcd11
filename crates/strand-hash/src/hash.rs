//! Fixed-length 32-byte digest with lowercase hex text representation.

use std::fmt;
use std::str::FromStr;

use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// An error that can occur when parsing a digest.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HashError {
    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("Invalid hash length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("Non-canonical hex: expected lowercase digits without prefix")]
    NonCanonicalHex,
}

/// A 256-bit digest.
///
/// Equality is exact byte-for-byte comparison. Digests are deliberately not ordered.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash256([u8; Hash256::LENGTH]);

impl Hash256 {
    /// Digest length in bytes
    pub const LENGTH: usize = 32;
    /// Digest length in bits, i.e. the maximum depth of a key-hashed tree
    pub const BITS: usize = Self::LENGTH * 8;
    /// 32 zero bytes, the stand-in for an absent child
    pub const ZERO: Self = Self([0; Self::LENGTH]);

    pub const fn from_inner(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    pub const fn into_inner(self) -> [u8; Self::LENGTH] {
        self.0
    }

    pub const fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }

    /// Build a digest from a slice that must be exactly 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        let inner: [u8; Self::LENGTH] =
            bytes.try_into().map_err(|_| HashError::InvalidLength {
                expected: Self::LENGTH,
                actual: bytes.len(),
            })?;
        Ok(Self(inner))
    }

    /// Parse a hex digest typed by a user. An optional `0x` prefix and upper-case digits are
    /// accepted, use [`Hash256::from_canonical_hex`] for wire data.
    pub fn from_hex(hex: &str) -> Result<Self, HashError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(hex)?;
        Self::from_slice(&bytes)
    }

    /// Parse the lowercase, unprefixed form produced by [`Hash256::to_hex`].
    pub fn from_canonical_hex(hex: &str) -> Result<Self, HashError> {
        if hex.starts_with("0x") || hex.bytes().any(|c| c.is_ascii_uppercase()) {
            return Err(HashError::NonCanonicalHex);
        }
        Self::from_hex(hex)
    }

    /// Lowercase, unprefixed hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Bit `index` of the digest, where bit 0 is the most significant bit of byte 0.
    ///
    /// Increasing `index` moves from the root of a key-hashed tree toward the leaf.
    ///
    /// # Panics
    /// If `index >= Hash256::BITS`.
    pub fn bit(&self, index: usize) -> u8 {
        assert!(
            index < Self::BITS,
            "bit index out of range: {index} >= {}",
            Self::BITS
        );
        (self.0[index / 8] >> (7 - index % 8)) & 1
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; Hash256::LENGTH]> for Hash256 {
    fn from(bytes: [u8; Hash256::LENGTH]) -> Self {
        Self(bytes)
    }
}

impl From<Hash256> for [u8; Hash256::LENGTH] {
    fn from(hash: Hash256) -> Self {
        hash.0
    }
}

impl FromStr for Hash256 {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl Serialize for Hash256 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        Self::from_canonical_hex(&hex)
            .map_err(|e| D::Error::custom(format!("invalid hash {hex:?}: {e}")))
    }
}
