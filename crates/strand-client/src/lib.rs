//! Strand client library
//!
//! This library provides functionality to verify state proofs against a trusted root and to
//! fetch, store and extend bridge tree snapshots served by a Strand relayer.

pub mod fetch;
pub mod format;
pub mod root;
pub mod verify;

// Re-export the main entry points for library usage
pub use fetch::{fetch_tree_snapshot, load_snapshot_from_bzip2, save_snapshot_with_bzip2};
pub use verify::verify_proof_file;
