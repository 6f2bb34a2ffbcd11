//! Serializable tree state.

use serde::{Deserialize, Serialize};
use strand_hash::Hash256;

use crate::tree::{IncrementalMerkleTree, TREE_DEPTH, ZERO_HASHES};

/// Frontier, leaf count and root of an [`IncrementalMerkleTree`].
///
/// The root is informational: a restored tree recomputes it from `branch` and `count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub branch: [Hash256; TREE_DEPTH],
    pub count: u32,
    pub root: Hash256,
}

impl TreeSnapshot {
    /// Whether the recorded root matches the one recomputed from the frontier.
    /// An empty tree may also record the genesis value `ZERO_HASHES[0]`.
    ///
    /// This only detects corrupted or mismatched fields, a relayer producing the whole
    /// snapshot can always make it consistent.
    pub fn is_consistent(&self) -> bool {
        if self.count == 0 && self.root == ZERO_HASHES[0] {
            return true;
        }
        IncrementalMerkleTree::from_snapshot(self.clone()).root() == self.root
    }
}

impl Default for TreeSnapshot {
    fn default() -> Self {
        IncrementalMerkleTree::default().save()
    }
}
