//! Proof types as received from the query layer.
//!
//! Sibling hashes are ordered from the sibling nearest the leaf (index 0) up to the sibling
//! directly below the root (last index). An absent sibling is `None` on the Rust side and
//! `null` on the wire, which keeps it distinct from a present all-zero hash.

use std::fmt;

use serde::{Deserialize, Serialize};
use strand_hash::Hash256;

/// Either kind of state proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proof {
    Membership(MembershipProof),
    NonMembership(NonMembershipProof),
}

/// Proof that a key/value pair is committed under a root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipProof {
    /// Sibling hashes, nearest-leaf first
    pub sibling_hashes: Vec<Option<Hash256>>,
}

/// Proof that no value is committed for a key under a root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonMembershipProof {
    /// The node where the search path for the key ended
    pub node: ProofNode,
    /// Sibling hashes from the boundary node up to the root, nearest-leaf first
    pub sibling_hashes: Vec<Option<Hash256>>,
}

/// Boundary node of a non-membership proof.
///
/// Internal nodes carry only their child hashes, which is all the verifier needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofNode {
    /// The search path reached an internal node whose child on the key's side is absent
    Internal {
        left: Option<Hash256>,
        right: Option<Hash256>,
    },
    /// The search path reached a leaf belonging to a different key with the same prefix
    Leaf {
        #[serde(rename = "keyHash")]
        key_hash: Hash256,
        #[serde(rename = "valueHash")]
        value_hash: Hash256,
    },
}

/// Proof variant, used in error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofKind {
    Membership,
    NonMembership,
}

impl fmt::Display for ProofKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProofKind::Membership => f.write_str("membership"),
            ProofKind::NonMembership => f.write_str("non-membership"),
        }
    }
}

impl Proof {
    pub fn kind(&self) -> ProofKind {
        match self {
            Proof::Membership(_) => ProofKind::Membership,
            Proof::NonMembership(_) => ProofKind::NonMembership,
        }
    }

    pub fn sibling_hashes(&self) -> &[Option<Hash256>] {
        match self {
            Proof::Membership(proof) => &proof.sibling_hashes,
            Proof::NonMembership(proof) => &proof.sibling_hashes,
        }
    }
}

impl From<MembershipProof> for Proof {
    fn from(proof: MembershipProof) -> Self {
        Proof::Membership(proof)
    }
}

impl From<NonMembershipProof> for Proof {
    fn from(proof: NonMembershipProof) -> Self {
        Proof::NonMembership(proof)
    }
}
