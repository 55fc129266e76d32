//! Apply a patch list to a snapshot.

use anyhow::Result;
use serde_json::Value;
use std::path::Path;
use sync_client::apply_diff_patches;
use sync_types::DiffPatch;

use super::{print_json, read_json};

/// Run the patch command.
pub async fn run(data: &Path, patches: &Path) -> Result<()> {
    let patched = patch_files(data, patches).await?;
    print_json(&patched)
}

async fn patch_files(data: &Path, patches: &Path) -> Result<Value> {
    let data: Value = read_json(data).await?;
    let patches: Vec<DiffPatch> = read_json(patches).await?;
    tracing::info!(patches = patches.len(), "applying patches");
    Ok(apply_diff_patches(&data, &patches))
}
