//! Functions to fetch bridge tree snapshots from a Strand relayer and keep them on disk.

use std::io::{Read, Write};
use std::path::Path;
use std::path::PathBuf;

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use bzip2::Compression;
use strand_bridge_tree::TreeSnapshot;
use tracing::info;

use crate::format::format_snapshot;

/// CLI arguments for the `fetch` subcommand
#[derive(Clone, Debug, clap::Args)]
pub struct FetchArgs {
    /// Path to save the snapshot
    #[arg(long)]
    snapshot_path: PathBuf,
    /// Strand relayer RPC URL
    #[arg(long, env = "STRAND_RELAYER_RPC", default_value = "http://127.0.0.1:5000")]
    relayer_url: String,
    /// Fetch the tree as of this many leaves instead of the latest one
    #[arg(long)]
    count: Option<u32>,
}

/// Run the `fetch` subcommand: download a snapshot, check it and write it to disk
pub async fn run(args: FetchArgs) -> Result<(), anyhow::Error> {
    let snapshot = fetch_tree_snapshot(&args.relayer_url, args.count).await?;
    save_snapshot_with_bzip2(&snapshot, &args.snapshot_path)?;
    println!("{}", format_snapshot(&snapshot));
    Ok(())
}

/// Fetch a tree snapshot from the relayer: latest or for a given leaf count (optional)
///
/// A snapshot whose leaf count or root does not match its frontier is rejected. This catches
/// transport or storage corruption, not a relayer serving a fabricated tree.
pub async fn fetch_tree_snapshot(
    relayer_url: &str,
    count: Option<u32>,
) -> Result<TreeSnapshot, anyhow::Error> {
    let url = match count {
        Some(count) => format!("{relayer_url}/tree?count={count}"),
        None => format!("{relayer_url}/tree"),
    };

    info!("Fetching tree snapshot from {} ...", url);
    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .header("Accept-Encoding", "gzip")
        .send()
        .await?;
    let snapshot: TreeSnapshot = response.error_for_status()?.json().await?;

    if let Some(count) = count {
        anyhow::ensure!(
            snapshot.count == count,
            "Requested a tree with {} leaves, got {}",
            count,
            snapshot.count
        );
    }
    anyhow::ensure!(
        snapshot.is_consistent(),
        "Snapshot root {} does not match its frontier",
        snapshot.root
    );

    info!(
        "Fetched tree with {} leaves, root {}",
        snapshot.count, snapshot.root
    );
    Ok(snapshot)
}

/// Save a snapshot to disk using bincode binary codec with bzip2 compression
pub fn save_snapshot_with_bzip2(
    snapshot: &TreeSnapshot,
    snapshot_path: &Path,
) -> Result<(), anyhow::Error> {
    let serialized_bytes = bincode::serialize(snapshot)?;

    if let Some(snapshot_dir) = snapshot_path.parent() {
        std::fs::create_dir_all(snapshot_dir)?;
    }

    let file = std::fs::File::create(snapshot_path)?;
    let mut bz_encoder = BzEncoder::new(file, Compression::best());
    bz_encoder.write_all(&serialized_bytes)?;
    // Finish the bzip2 stream to ensure all data is written
    bz_encoder.finish()?;

    info!("Snapshot written to {}", snapshot_path.display());
    Ok(())
}

/// Load a snapshot saved by [`save_snapshot_with_bzip2`]
pub fn load_snapshot_from_bzip2(snapshot_path: &Path) -> Result<TreeSnapshot, anyhow::Error> {
    info!("Loading snapshot from {}", snapshot_path.display());

    let file = std::fs::File::open(snapshot_path)?;
    let mut bz_decoder = BzDecoder::new(file);
    let mut decompressed_bytes = Vec::new();
    bz_decoder.read_to_end(&mut decompressed_bytes)?;

    Ok(bincode::deserialize(&decompressed_bytes)?)
}
