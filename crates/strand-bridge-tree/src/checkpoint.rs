//! Checkpoints signed off by validators after each insertion.

use serde::{Deserialize, Serialize};
use strand_hash::Hash256;

use crate::tree::IncrementalMerkleTree;

/// Tree root together with the index and id of the message that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub merkle_root: Hash256,
    pub merkle_index: u32,
    pub message_id: Hash256,
}

impl IncrementalMerkleTree {
    /// Checkpoint for the latest inserted leaf, `None` for an empty tree
    pub fn checkpoint(&self, message_id: Hash256) -> Option<Checkpoint> {
        let merkle_index = self.count().checked_sub(1)?;
        Some(Checkpoint {
            merkle_root: self.cached_root(),
            merkle_index,
            message_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_hash::HashExt;

    #[test]
    fn test_checkpoint() {
        let mut tree = IncrementalMerkleTree::new();
        let id = "message".keccak256();
        assert_eq!(tree.checkpoint(id), None);

        tree.insert(id).unwrap();
        tree.insert(id).unwrap();
        let checkpoint = tree.checkpoint(id).unwrap();
        assert_eq!(checkpoint.merkle_index, 1);
        assert_eq!(checkpoint.merkle_root, tree.root());

        let json = serde_json::to_value(checkpoint).unwrap();
        assert_eq!(json["merkleIndex"], 1);
        assert_eq!(json["messageId"], id.to_hex());
    }
}
