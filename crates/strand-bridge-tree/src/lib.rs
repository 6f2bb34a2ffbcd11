//! Append-only Merkle commitment tree for bridge messages
//!
//! This crate provides the incremental (frontier) Keccak-256 tree that a relayer keeps in
//! memory, its persisted snapshot form, and the message encoding whose hashes become the
//! tree leaves.

pub mod checkpoint;
pub mod message;
pub mod snapshot;
pub mod tree;

pub use checkpoint::Checkpoint;
pub use message::{BridgeMessage, MessageError, MESSAGE_HEADER_LENGTH, MESSAGE_VERSION};
pub use snapshot::TreeSnapshot;
pub use tree::{IncrementalMerkleTree, TreeError, MAX_LEAVES, TREE_DEPTH, ZERO_HASHES};
