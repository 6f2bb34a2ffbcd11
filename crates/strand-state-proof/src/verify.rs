//! Verification routines for state proofs: recompute the root bottom-up from a leaf or a
//! boundary node and compare it against the claimed root.

use strand_hash::{Hash256, HashExt};
use thiserror::Error;
use tracing::debug;

use crate::node::{hash_internal_node, hash_leaf_node};
use crate::proof::{MembershipProof, NonMembershipProof, Proof, ProofKind, ProofNode};

/// Reasons a state proof is rejected.
///
/// Every variant is a hard trust failure: the queried data must be treated as unverified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("Wrong proof kind: expected {expected}, got {actual}")]
    WrongProofKind {
        expected: ProofKind,
        actual: ProofKind,
    },
    #[error("Root hash mismatch: computed {computed}, expected {expected}")]
    RootMismatch { computed: Hash256, expected: Hash256 },
    #[error("Expected the child at depth {depth} on side {bit} to be absent, but it exists")]
    ExpectedAbsentChild { depth: usize, bit: u8 },
    #[error("Key hashes diverge at depth {depth}: boundary leaf does not share the search prefix")]
    DivergentPrefix { depth: usize },
    #[error("Boundary leaf holds the queried key itself, so the key is present")]
    KeyExists,
    #[error("Proof depth {depth} exceeds the maximum of {max}")]
    ProofTooDeep { depth: usize, max: usize },
}

/// Verify a proof for `key_hash`.
///
/// A present `value_hash` claims the key is committed with that value and requires a
/// membership proof; an absent one claims the key is not committed and requires a
/// non-membership proof.
pub fn verify_proof(
    root_hash: Hash256,
    key_hash: Hash256,
    value_hash: Option<Hash256>,
    proof: &Proof,
) -> Result<(), ProofError> {
    let res = match (value_hash, proof) {
        (Some(value_hash), Proof::Membership(proof)) => {
            verify_membership_proof(root_hash, key_hash, value_hash, proof)
        }
        (None, Proof::NonMembership(proof)) => {
            verify_non_membership_proof(root_hash, key_hash, proof)
        }
        (Some(_), Proof::NonMembership(_)) => Err(ProofError::WrongProofKind {
            expected: ProofKind::Membership,
            actual: ProofKind::NonMembership,
        }),
        (None, Proof::Membership(_)) => Err(ProofError::WrongProofKind {
            expected: ProofKind::NonMembership,
            actual: ProofKind::Membership,
        }),
    };

    if let Err(err) = &res {
        debug!("Proof for key hash {} rejected: {}", key_hash, err);
    }
    res
}

/// Verify a proof for raw key/value bytes, hashing both with SHA-256 first.
pub fn verify_raw(
    root_hash: Hash256,
    key: &[u8],
    value: Option<&[u8]>,
    proof: &Proof,
) -> Result<(), ProofError> {
    verify_proof(root_hash, key.sha256(), value.map(|v| v.sha256()), proof)
}

pub fn verify_membership_proof(
    root_hash: Hash256,
    key_hash: Hash256,
    value_hash: Hash256,
    proof: &MembershipProof,
) -> Result<(), ProofError> {
    check_depth(proof.sibling_hashes.len())?;
    let hash = hash_leaf_node(key_hash, value_hash);

    compute_and_compare_root_hash(root_hash, key_hash, &proof.sibling_hashes, hash)
}

pub fn verify_non_membership_proof(
    root_hash: Hash256,
    key_hash: Hash256,
    proof: &NonMembershipProof,
) -> Result<(), ProofError> {
    let depth = proof.sibling_hashes.len();
    check_depth(depth)?;

    let hash = match proof.node {
        // The search path stopped at an internal node. The key's bit at this depth
        // selects the child the path would continue into, and that child must be absent.
        ProofNode::Internal { left, right } => {
            if depth == Hash256::BITS {
                return Err(ProofError::ProofTooDeep {
                    depth: depth + 1,
                    max: Hash256::BITS,
                });
            }
            let bit = key_hash.bit(depth);
            match (bit, left, right) {
                (0, Some(_), _) | (1, _, Some(_)) => {
                    return Err(ProofError::ExpectedAbsentChild { depth, bit });
                }
                _ => hash_internal_node(left, right),
            }
        }
        // The search path reached a leaf for another key. That leaf lives in the subtree
        // the key would live in, so both keys must share every bit above it.
        ProofNode::Leaf {
            key_hash: existing_key_hash,
            value_hash: existing_value_hash,
        } => {
            if existing_key_hash == key_hash {
                return Err(ProofError::KeyExists);
            }
            if let Some(depth) =
                (0..depth).find(|&i| key_hash.bit(i) != existing_key_hash.bit(i))
            {
                return Err(ProofError::DivergentPrefix { depth });
            }
            hash_leaf_node(existing_key_hash, existing_value_hash)
        }
    };

    compute_and_compare_root_hash(root_hash, key_hash, &proof.sibling_hashes, hash)
}

fn check_depth(depth: usize) -> Result<(), ProofError> {
    if depth > Hash256::BITS {
        return Err(ProofError::ProofTooDeep {
            depth,
            max: Hash256::BITS,
        });
    }
    Ok(())
}

/// Fold the sibling hashes into `hash`, nearest-leaf first, and compare the result with
/// `root_hash`. Sibling `i` sits at depth `len - 1 - i`.
fn compute_and_compare_root_hash(
    root_hash: Hash256,
    key_hash: Hash256,
    sibling_hashes: &[Option<Hash256>],
    mut hash: Hash256,
) -> Result<(), ProofError> {
    for (depth, sibling_hash) in (0..sibling_hashes.len()).rev().zip(sibling_hashes) {
        if key_hash.bit(depth) == 0 {
            hash = hash_internal_node(Some(hash), *sibling_hash);
        } else {
            hash = hash_internal_node(*sibling_hash, Some(hash));
        }
    }

    if hash != root_hash {
        return Err(ProofError::RootMismatch {
            computed: hash,
            expected: root_hash,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tree holding (r, foo), (m, bar), (L, fuzz), (a, buzz)
    const HASH_ROOT: &str = "ae08c246d53a8ff3572a68d5bba4d610aaaa765e3ef535320c5653969aaa031b";
    const HASH_0: &str = "b843a96765fc40641227234e9f9a2736c2e0cdf8fb2dc54e358bb4fa29a61042";
    const HASH_1: &str = "cb640e68682628445a3e0713fafe91b9cefe4f81c2337e9d3df201d81ae70222";
    const HASH_01: &str = "521de0a3ef2b7791666435a872ca9ec402ce886aff07bb4401de28bfdde4a13b";
    const HASH_010: &str = "c8348e9a7a327e8b76e97096c362a1f87071ee4108b565d1f409529c189cb684";
    const HASH_011: &str = "e104e2bcf24027af737c021033cb9d8cbd710a463f54ae6f2ff9eb06c784c744";
    const HASH_0110: &str = "fd34e3f8d9840e7f6d6f639435b6f9b67732fc5e3d5288e268021aeab873f280";
    const HASH_0111: &str = "412341380b1e171077dd9da9af936ae2126ede2dd91dc5acb0f77363d46eb76b";
    const HASH_M: &str = "62c66a7a5dd70c3146618063c344e531e6d4b59e379808443ce962b3abd63c5a";
    const HASH_BAR: &str = "fcde2b2edba56bf408601fb721fe9b5c338d10ee429ea04fae5511b68fbf8fb9";

    fn h(hex: &str) -> Hash256 {
        Hash256::from_hex(hex).unwrap()
    }

    fn siblings(hashes: &[Option<&str>]) -> Vec<Option<Hash256>> {
        hashes.iter().map(|hash| hash.map(h)).collect()
    }

    fn membership_cases() -> Vec<(&'static str, &'static str, MembershipProof)> {
        vec![
            (
                "r",
                "foo",
                MembershipProof {
                    sibling_hashes: siblings(&[Some(HASH_011), None, Some(HASH_1)]),
                },
            ),
            (
                "m",
                "bar",
                MembershipProof {
                    sibling_hashes: siblings(&[
                        Some(HASH_0111),
                        Some(HASH_010),
                        None,
                        Some(HASH_1),
                    ]),
                },
            ),
            (
                "L",
                "fuzz",
                MembershipProof {
                    sibling_hashes: siblings(&[
                        Some(HASH_0110),
                        Some(HASH_010),
                        None,
                        Some(HASH_1),
                    ]),
                },
            ),
            (
                "a",
                "buzz",
                MembershipProof {
                    sibling_hashes: siblings(&[Some(HASH_0)]),
                },
            ),
        ]
    }

    fn non_membership_cases() -> Vec<(&'static str, NonMembershipProof)> {
        vec![
            (
                "b",
                NonMembershipProof {
                    node: ProofNode::Internal {
                        left: None,
                        right: Some(h(HASH_01)),
                    },
                    sibling_hashes: siblings(&[Some(HASH_1)]),
                },
            ),
            (
                "o",
                NonMembershipProof {
                    node: ProofNode::Leaf {
                        key_hash: h(HASH_M),
                        value_hash: h(HASH_BAR),
                    },
                    sibling_hashes: siblings(&[
                        Some(HASH_0111),
                        Some(HASH_010),
                        None,
                        Some(HASH_1),
                    ]),
                },
            ),
        ]
    }

    #[test]
    fn test_verify_membership() {
        for (key, value, proof) in membership_cases() {
            assert_eq!(
                verify_membership_proof(h(HASH_ROOT), key.sha256(), value.sha256(), &proof),
                Ok(()),
                "proving ({key}, {value})"
            );
        }
    }

    #[test]
    fn test_verify_non_membership() {
        for (key, proof) in non_membership_cases() {
            assert_eq!(
                verify_non_membership_proof(h(HASH_ROOT), key.sha256(), &proof),
                Ok(()),
                "proving absence of {key}"
            );
        }
    }

    #[test]
    fn test_verify_raw() {
        let (key, value, proof) = membership_cases().remove(0);
        let proof = Proof::from(proof);
        assert_eq!(
            verify_raw(h(HASH_ROOT), key.as_bytes(), Some(value.as_bytes()), &proof),
            Ok(())
        );
        assert!(matches!(
            verify_raw(h(HASH_ROOT), key.as_bytes(), Some(b"bar"), &proof),
            Err(ProofError::RootMismatch { .. })
        ));
    }

    #[test]
    fn test_wrong_value_is_rejected() {
        let (key, _, proof) = membership_cases().remove(1);
        let err = verify_membership_proof(h(HASH_ROOT), key.sha256(), "baz".sha256(), &proof)
            .unwrap_err();
        match err {
            ProofError::RootMismatch { expected, computed } => {
                assert_eq!(expected, h(HASH_ROOT));
                assert_ne!(computed, h(HASH_ROOT));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tampered_siblings_are_rejected() {
        for (key, value, proof) in membership_cases() {
            for i in 0..proof.sibling_hashes.len() {
                let Some(sibling) = proof.sibling_hashes[i] else {
                    continue;
                };
                for byte in 0..Hash256::LENGTH {
                    let mut bytes = sibling.into_inner();
                    bytes[byte] ^= 0x01;
                    let mut tampered = proof.clone();
                    tampered.sibling_hashes[i] = Some(Hash256::from_inner(bytes));
                    assert!(
                        matches!(
                            verify_membership_proof(
                                h(HASH_ROOT),
                                key.sha256(),
                                value.sha256(),
                                &tampered
                            ),
                            Err(ProofError::RootMismatch { .. })
                        ),
                        "tampered sibling {i} byte {byte} accepted for ({key}, {value})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_zero_sibling_hashes_like_absent() {
        let (key, value, mut proof) = membership_cases().remove(0);
        proof.sibling_hashes[1] = Some(Hash256::ZERO);
        assert_eq!(
            verify_membership_proof(h(HASH_ROOT), key.sha256(), value.sha256(), &proof),
            Ok(())
        );
        // A missing entry shifts every depth
        proof.sibling_hashes.remove(1);
        assert!(verify_membership_proof(h(HASH_ROOT), key.sha256(), value.sha256(), &proof)
            .is_err());
    }

    #[test]
    fn test_wrong_proof_kind() {
        let (key, value, membership) = membership_cases().remove(0);
        let membership = Proof::from(membership);
        assert_eq!(
            verify_proof(h(HASH_ROOT), key.sha256(), None, &membership),
            Err(ProofError::WrongProofKind {
                expected: ProofKind::NonMembership,
                actual: ProofKind::Membership,
            })
        );

        let (key, non_membership) = non_membership_cases().remove(0);
        let non_membership = Proof::from(non_membership);
        assert_eq!(
            verify_proof(
                h(HASH_ROOT),
                key.sha256(),
                Some(value.sha256()),
                &non_membership
            ),
            Err(ProofError::WrongProofKind {
                expected: ProofKind::Membership,
                actual: ProofKind::NonMembership,
            })
        );
        assert_eq!(
            verify_proof(h(HASH_ROOT), key.sha256(), None, &non_membership),
            Ok(())
        );
    }

    #[test]
    fn test_present_child_is_rejected() {
        // "b" goes left at depth 1, so claiming a left child there is contradictory
        let proof = NonMembershipProof {
            node: ProofNode::Internal {
                left: Some(h(HASH_01)),
                right: None,
            },
            sibling_hashes: siblings(&[Some(HASH_1)]),
        };
        assert_eq!(
            verify_non_membership_proof(h(HASH_ROOT), "b".sha256(), &proof),
            Err(ProofError::ExpectedAbsentChild { depth: 1, bit: 0 })
        );
    }

    #[test]
    fn test_divergent_prefix_is_rejected() {
        // "a" (0b1100...) does not share the 0110 prefix of "m"
        let (_, proof) = non_membership_cases().remove(1);
        assert_eq!(
            verify_non_membership_proof(h(HASH_ROOT), "a".sha256(), &proof),
            Err(ProofError::DivergentPrefix { depth: 0 })
        );
    }

    #[test]
    fn test_boundary_leaf_for_same_key_is_rejected() {
        let (_, proof) = non_membership_cases().remove(1);
        assert_eq!(
            verify_non_membership_proof(h(HASH_ROOT), h(HASH_M), &proof),
            Err(ProofError::KeyExists)
        );
    }

    #[test]
    fn test_non_membership_is_bound_to_root() {
        let (_, proof) = non_membership_cases().remove(1);
        assert!(matches!(
            verify_non_membership_proof(h(HASH_0), "o".sha256(), &proof),
            Err(ProofError::RootMismatch { .. })
        ));
    }

    #[test]
    fn test_oversized_proofs_are_rejected() {
        let proof = MembershipProof {
            sibling_hashes: vec![None; Hash256::BITS + 1],
        };
        assert_eq!(
            verify_membership_proof(h(HASH_ROOT), "r".sha256(), "foo".sha256(), &proof),
            Err(ProofError::ProofTooDeep {
                depth: Hash256::BITS + 1,
                max: Hash256::BITS
            })
        );

        let proof = NonMembershipProof {
            node: ProofNode::Internal {
                left: None,
                right: None,
            },
            sibling_hashes: vec![None; Hash256::BITS],
        };
        assert!(matches!(
            verify_non_membership_proof(h(HASH_ROOT), "r".sha256(), &proof),
            Err(ProofError::ProofTooDeep { .. })
        ));
    }
}
