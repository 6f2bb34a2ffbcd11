//! A minimal in-memory key-hashed tree used to produce proofs for the verifier tests.
//!
//! Leaves sit at the shallowest depth where they are alone in their subtree; internal nodes
//! are never collapsed, so an internal node may have a single child.

use strand_hash::Hash256;
use strand_state_proof::{
    hash_internal_node, hash_leaf_node, MembershipProof, NonMembershipProof, Proof, ProofNode,
};

enum Node {
    Internal {
        left: Option<Box<Node>>,
        right: Option<Box<Node>>,
    },
    Leaf {
        key_hash: Hash256,
        value_hash: Hash256,
    },
}

impl Node {
    fn hash(&self) -> Hash256 {
        match self {
            Node::Internal { left, right } => hash_internal_node(
                left.as_ref().map(|n| n.hash()),
                right.as_ref().map(|n| n.hash()),
            ),
            Node::Leaf {
                key_hash,
                value_hash,
            } => hash_leaf_node(*key_hash, *value_hash),
        }
    }
}

pub struct TestTree {
    root: Node,
}

impl TestTree {
    /// Build a tree from distinct key hashes. The root is always an internal node.
    pub fn new(entries: Vec<(Hash256, Hash256)>) -> Self {
        let root = build(entries, 0).expect("tree must not be empty");
        Self { root }
    }

    pub fn root_hash(&self) -> Hash256 {
        self.root.hash()
    }

    pub fn prove(&self, key_hash: Hash256) -> Proof {
        let mut node = &self.root;
        let mut sibling_hashes = Vec::new();
        let mut depth = 0;

        loop {
            match node {
                Node::Internal { left, right } => {
                    let (child, sibling) = if key_hash.bit(depth) == 0 {
                        (left, right)
                    } else {
                        (right, left)
                    };
                    match child {
                        Some(child) => {
                            sibling_hashes.push(sibling.as_ref().map(|n| n.hash()));
                            node = &**child;
                            depth += 1;
                        }
                        None => {
                            sibling_hashes.reverse();
                            return Proof::NonMembership(NonMembershipProof {
                                node: ProofNode::Internal {
                                    left: left.as_ref().map(|n| n.hash()),
                                    right: right.as_ref().map(|n| n.hash()),
                                },
                                sibling_hashes,
                            });
                        }
                    }
                }
                Node::Leaf {
                    key_hash: existing_key_hash,
                    value_hash: existing_value_hash,
                } => {
                    sibling_hashes.reverse();
                    if *existing_key_hash == key_hash {
                        return Proof::Membership(MembershipProof { sibling_hashes });
                    }
                    return Proof::NonMembership(NonMembershipProof {
                        node: ProofNode::Leaf {
                            key_hash: *existing_key_hash,
                            value_hash: *existing_value_hash,
                        },
                        sibling_hashes,
                    });
                }
            }
        }
    }
}

fn build(entries: Vec<(Hash256, Hash256)>, depth: usize) -> Option<Node> {
    match entries.len() {
        0 => None,
        1 if depth > 0 => {
            let (key_hash, value_hash) = entries[0];
            Some(Node::Leaf {
                key_hash,
                value_hash,
            })
        }
        _ => {
            let (left, right): (Vec<_>, Vec<_>) = entries
                .into_iter()
                .partition(|(key_hash, _)| key_hash.bit(depth) == 0);
            Some(Node::Internal {
                left: build(left, depth + 1).map(Box::new),
                right: build(right, depth + 1).map(Box::new),
            })
        }
    }
}
