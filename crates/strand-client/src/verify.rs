//! CLI wrapper for state proof verification

use std::path::{Path, PathBuf};

use clap::{ArgGroup, Args};
use strand_hash::{Hash256, HashExt};
use strand_state_proof::{verify_proof, Proof, ProofKind};
use tracing::info;

use crate::format::format_verification;

/// CLI arguments for the `verify` subcommand
#[derive(Clone, Debug, Args)]
#[command(group(ArgGroup::new("key_input").required(true).args(["key", "key_hash"])))]
pub struct VerifyArgs {
    /// Trusted root hash the proof must lead to
    #[arg(long)]
    root: Hash256,
    /// Raw key, hashed with SHA-256
    #[arg(long)]
    key: Option<String>,
    /// Key hash
    #[arg(long)]
    key_hash: Option<Hash256>,
    /// Raw value, hashed with SHA-256; omit both value options to prove absence
    #[arg(long, conflicts_with = "value_hash")]
    value: Option<String>,
    /// Value hash
    #[arg(long)]
    value_hash: Option<Hash256>,
    /// Path to the JSON proof
    #[arg(long)]
    proof_path: PathBuf,
}

/// Run the `verify` subcommand: read a proof from disk and verify it
pub async fn run(args: VerifyArgs) -> Result<(), anyhow::Error> {
    let key_hash = match (&args.key, args.key_hash) {
        (Some(key), _) => key.sha256(),
        (None, Some(key_hash)) => key_hash,
        (None, None) => anyhow::bail!("Either --key or --key-hash is required"),
    };
    let value_hash = args
        .value
        .as_ref()
        .map(|value| value.sha256())
        .or(args.value_hash);

    let kind = verify_proof_file(args.root, key_hash, value_hash, &args.proof_path)?;
    println!(
        "{}",
        format_verification(args.root, key_hash, value_hash, kind)
    );
    Ok(())
}

/// Read a JSON proof from `proof_path` and verify it against `root`.
///
/// Returns the kind of the verified proof.
pub fn verify_proof_file(
    root: Hash256,
    key_hash: Hash256,
    value_hash: Option<Hash256>,
    proof_path: &Path,
) -> Result<ProofKind, anyhow::Error> {
    info!("Loading proof from {}", proof_path.display());
    let content = std::fs::read_to_string(proof_path)?;
    let proof: Proof = serde_json::from_str(&content)?;

    verify_proof(root, key_hash, value_hash, &proof)?;
    info!(
        "{} proof for key hash {} verified against root {}",
        proof.kind(),
        key_hash,
        root
    );
    Ok(proof.kind())
}
