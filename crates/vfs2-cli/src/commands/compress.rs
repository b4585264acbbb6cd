use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::BuildArgs;
use crate::fs::{collect_tree, write_atomic};

pub fn handle(output: &Path, input: &Path, build: &BuildArgs) -> Result<()> {
    let tree = collect_tree(input, build.build_options())?;
    info!(
        "Packing {} directories and {} files from {}",
        tree.directories().len(),
        tree.files().len(),
        input.display()
    );

    let archive = tree
        .encode(&build.encode_options())
        .with_context(|| format!("Failed to encode {}", output.display()))?;
    write_atomic(output, &archive)?;
    info!("Wrote {} ({} bytes)", output.display(), archive.len());
    Ok(())
}
