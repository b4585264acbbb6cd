use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::fs::{extract_tree, read_archive};

pub fn handle(input: &Path, output: &Path) -> Result<()> {
    let tree = read_archive(input)?;
    info!(
        "Extracting {} directories and {} files from {}",
        tree.directories().len(),
        tree.files().len(),
        input.display()
    );

    let stats = extract_tree(&tree, output)?;
    info!(
        "Extracted {} files ({} bytes) to {}",
        stats.files,
        stats.bytes,
        output.display()
    );
    Ok(())
}
