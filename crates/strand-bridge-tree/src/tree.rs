//! Incremental Merkle tree of fixed depth with Keccak-256 node hashing.
//!
//! Only the frontier (one node per level) is kept in memory, which is enough to append a
//! leaf and to recompute the root in `O(TREE_DEPTH)`.

use once_cell::sync::Lazy;
use strand_hash::{Hash256, Hasher, Keccak256Hasher};
use thiserror::Error;
use tracing::error;

use crate::snapshot::TreeSnapshot;

/// Number of levels between the leaves and the root
pub const TREE_DEPTH: usize = 32;

/// Maximum number of leaves, `2^TREE_DEPTH - 1`
pub const MAX_LEAVES: u32 = u32::MAX;

/// Roots of empty subtrees for every height, `ZERO_HASHES[TREE_DEPTH]` is the empty tree root
pub static ZERO_HASHES: Lazy<[Hash256; TREE_DEPTH + 1]> = Lazy::new(|| {
    let mut hashes = [Hash256::ZERO; TREE_DEPTH + 1];
    for height in 1..=TREE_DEPTH {
        hashes[height] = Keccak256Hasher::hash_pair(&hashes[height - 1], &hashes[height - 1]);
    }
    hashes
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Merkle tree is full ({MAX_LEAVES} leaves)")]
    TreeFull,
}

/// Append-only Merkle tree of depth [`TREE_DEPTH`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementalMerkleTree {
    /// Left-hand nodes on the path of the next insertion, one per level
    branch: [Hash256; TREE_DEPTH],
    /// Number of inserted leaves
    count: u32,
    /// Root as of the last insertion
    root: Hash256,
}

impl Default for IncrementalMerkleTree {
    fn default() -> Self {
        let mut branch = [Hash256::ZERO; TREE_DEPTH];
        branch.copy_from_slice(&ZERO_HASHES[..TREE_DEPTH]);
        Self {
            branch,
            count: 0,
            root: ZERO_HASHES[0],
        }
    }
}

impl IncrementalMerkleTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a tree from a snapshot.
    /// The snapshot is trusted as is, use [`TreeSnapshot::is_consistent`] to check it first.
    pub fn from_snapshot(snapshot: TreeSnapshot) -> Self {
        Self {
            branch: snapshot.branch,
            count: snapshot.count,
            root: snapshot.root,
        }
    }

    /// Append a leaf and return its index.
    /// A full tree is left untouched.
    pub fn insert(&mut self, leaf: Hash256) -> Result<u32, TreeError> {
        if self.count == MAX_LEAVES {
            error!("Cannot insert leaf {}: tree is full", leaf);
            return Err(TreeError::TreeFull);
        }

        self.count += 1;
        let mut size = self.count;
        let mut node = leaf;
        for level in 0..TREE_DEPTH {
            if size & 1 == 1 {
                self.branch[level] = node;
                break;
            }
            node = Keccak256Hasher::hash_pair(&self.branch[level], &node);
            size >>= 1;
        }

        self.root = self.root();
        Ok(self.count - 1)
    }

    /// Recompute the root from the frontier
    pub fn root(&self) -> Hash256 {
        let mut current = ZERO_HASHES[0];
        for level in 0..TREE_DEPTH {
            current = if (self.count >> level) & 1 == 1 {
                Keccak256Hasher::hash_pair(&self.branch[level], &current)
            } else {
                Keccak256Hasher::hash_pair(&current, &ZERO_HASHES[level])
            };
        }
        current
    }

    /// Export the tree state
    pub fn save(&self) -> TreeSnapshot {
        TreeSnapshot {
            branch: self.branch,
            count: self.count,
            root: self.root,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn branch(&self) -> &[Hash256; TREE_DEPTH] {
        &self.branch
    }

    /// Root recorded at the last insertion (or restored from a snapshot).
    /// A fresh tree records `ZERO_HASHES[0]`, use [`IncrementalMerkleTree::root`] for the empty tree root.
    pub fn cached_root(&self) -> Hash256 {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == MAX_LEAVES
    }
}

impl From<TreeSnapshot> for IncrementalMerkleTree {
    fn from(snapshot: TreeSnapshot) -> Self {
        Self::from_snapshot(snapshot)
    }
}
