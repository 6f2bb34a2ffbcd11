//! Hash primitives shared by the Strand crates
//!
//! This crate provides the fixed-size [`Hash256`] digest, the [`Hasher`] trait with its
//! SHA-256 (state tree) and Keccak-256 (bridge tree) instantiations, and the bit
//! extraction rule used to derive a key's path through a key-hashed Merkle tree.

pub mod hash;
pub mod hasher;

pub use hash::{Hash256, HashError};
pub use hasher::{HashExt, Hasher, Keccak256Hasher, Sha256Hasher};
