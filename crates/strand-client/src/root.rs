//! Recompute the bridge tree root offline from a saved snapshot

use std::path::PathBuf;

use clap::Args;
use strand_bridge_tree::IncrementalMerkleTree;
use strand_hash::Hash256;
use tracing::info;

use crate::fetch::{load_snapshot_from_bzip2, save_snapshot_with_bzip2};
use crate::format::format_snapshot;

/// CLI arguments for the `root` subcommand
#[derive(Clone, Debug, Args)]
pub struct RootArgs {
    /// Path to the saved snapshot
    #[arg(long)]
    snapshot_path: PathBuf,
    /// Leaves (message ids) to append before computing the root
    #[arg(long, num_args = 1..)]
    append: Vec<Hash256>,
    /// Save the resulting snapshot to this path
    #[arg(long)]
    output_path: Option<PathBuf>,
}

/// Run the `root` subcommand
pub async fn run(args: RootArgs) -> Result<(), anyhow::Error> {
    let snapshot = load_snapshot_from_bzip2(&args.snapshot_path)?;
    anyhow::ensure!(
        snapshot.is_consistent(),
        "Snapshot root {} does not match its frontier",
        snapshot.root
    );

    let tree = append_leaves(IncrementalMerkleTree::from_snapshot(snapshot), &args.append)?;
    let snapshot = tree.save();

    if let Some(output_path) = &args.output_path {
        save_snapshot_with_bzip2(&snapshot, output_path)?;
    }
    println!("{}", format_snapshot(&snapshot));
    Ok(())
}

/// Append `leaves` in order, failing if the tree fills up
pub fn append_leaves(
    mut tree: IncrementalMerkleTree,
    leaves: &[Hash256],
) -> Result<IncrementalMerkleTree, anyhow::Error> {
    for leaf in leaves {
        let index = tree.insert(*leaf)?;
        info!("Leaf {} appended at index {}", leaf, index);
    }
    Ok(tree)
}
