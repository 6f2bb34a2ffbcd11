//! Hash function instantiations used by the state tree and the bridge tree.

use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::Hash256;

/// A pure 256-bit cryptographic hash function
pub trait Hasher {
    /// Hash the concatenation of `parts`.
    fn hash_parts(parts: &[&[u8]]) -> Hash256;

    fn hash(data: &[u8]) -> Hash256 {
        Self::hash_parts(&[data])
    }

    /// `H(left ‖ right)`
    fn hash_pair(left: &Hash256, right: &Hash256) -> Hash256 {
        Self::hash_parts(&[left.as_bytes(), right.as_bytes()])
    }
}

/// SHA-256, used for the key-hashed state tree
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn hash_parts(parts: &[&[u8]]) -> Hash256 {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        Hash256::from_inner(hasher.finalize().into())
    }
}

/// Keccak-256, used for the bridge message commitment tree
#[derive(Debug, Clone, Copy, Default)]
pub struct Keccak256Hasher;

impl Hasher for Keccak256Hasher {
    fn hash_parts(parts: &[&[u8]]) -> Hash256 {
        let mut hasher = Keccak256::new();
        for part in parts {
            hasher.update(part);
        }
        Hash256::from_inner(hasher.finalize().into())
    }
}

/// Hashing shortcuts for raw byte strings
pub trait HashExt {
    fn sha256(&self) -> Hash256;
    fn keccak256(&self) -> Hash256;
}

impl<T: AsRef<[u8]> + ?Sized> HashExt for T {
    fn sha256(&self) -> Hash256 {
        Sha256Hasher::hash(self.as_ref())
    }

    fn keccak256(&self) -> Hash256 {
        Keccak256Hasher::hash(self.as_ref())
    }
}
