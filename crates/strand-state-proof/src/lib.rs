//! Strand state proof verification library
//!
//! This crate verifies membership and non-membership proofs for a sparse, key-hashed Merkle
//! tree. It is the trust boundary between an untrusted query endpoint and the caller: data
//! returned by the endpoint must not be used unless the accompanying proof verifies against
//! a root the caller already trusts.

pub mod node;
pub mod proof;
pub mod verify;

pub use node::{hash_internal_node, hash_leaf_node};
pub use proof::{MembershipProof, NonMembershipProof, Proof, ProofKind, ProofNode};
pub use verify::{
    verify_membership_proof, verify_non_membership_proof, verify_proof, verify_raw, ProofError,
};
