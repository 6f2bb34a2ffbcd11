//! Node hashing for the key-hashed state tree.

use strand_hash::{Hash256, Hasher, Sha256Hasher};

const INTERNAL_NODE_HASH_PREFIX: &[u8] = &[0];
const LEAF_NODE_HASH_PREFIX: &[u8] = &[1];

/// `SHA256(0x00 ‖ left ‖ right)`, absent children hashed as 32 zero bytes
pub fn hash_internal_node(left_hash: Option<Hash256>, right_hash: Option<Hash256>) -> Hash256 {
    let left_hash = left_hash.unwrap_or(Hash256::ZERO);
    let right_hash = right_hash.unwrap_or(Hash256::ZERO);
    Sha256Hasher::hash_parts(&[
        INTERNAL_NODE_HASH_PREFIX,
        left_hash.as_bytes(),
        right_hash.as_bytes(),
    ])
}

/// `SHA256(0x01 ‖ key_hash ‖ value_hash)`
pub fn hash_leaf_node(key_hash: Hash256, value_hash: Hash256) -> Hash256 {
    Sha256Hasher::hash_parts(&[
        LEAF_NODE_HASH_PREFIX,
        key_hash.as_bytes(),
        value_hash.as_bytes(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_hash::HashExt;

    #[test]
    fn test_absent_child_hashes_as_zero() {
        let child = Hash256::from_inner([7; 32]);
        assert_eq!(
            hash_internal_node(None, Some(child)),
            hash_internal_node(Some(Hash256::ZERO), Some(child))
        );
        assert_ne!(
            hash_internal_node(None, Some(child)),
            hash_internal_node(Some(child), None)
        );
    }

    #[test]
    fn test_domain_separation() {
        let key_hash = "foo".sha256();
        let value_hash = "bar".sha256();

        let mut preimage = vec![1u8];
        preimage.extend_from_slice(key_hash.as_bytes());
        preimage.extend_from_slice(value_hash.as_bytes());
        assert_eq!(hash_leaf_node(key_hash, value_hash), preimage.sha256());

        // Same payload under the internal prefix must not collide with the leaf
        assert_ne!(
            hash_leaf_node(key_hash, value_hash),
            hash_internal_node(Some(key_hash), Some(value_hash))
        );
    }
}
