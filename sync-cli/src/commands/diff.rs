//! Print the patches between two snapshots.

use anyhow::Result;
use serde_json::Value;
use std::path::Path;
use sync_client::generate_diff_patches;
use sync_types::DiffPatch;

use super::{print_json, read_json};

/// Run the diff command.
pub async fn run(old: &Path, new: &Path) -> Result<()> {
    let patches = diff_files(old, new).await?;
    tracing::info!(patches = patches.len(), "computed diff");
    print_json(&patches)
}

async fn diff_files(old: &Path, new: &Path) -> Result<Vec<DiffPatch>> {
    let old: Value = read_json(old).await?;
    let new: Value = read_json(new).await?;
    Ok(generate_diff_patches(&old, &new))
}
