use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info, warn};
use vfs2_formats::vfs2::reconcile;

use crate::BuildArgs;
use crate::fs::{collect_tree, default_reference, read_archive, write_atomic};

pub fn handle(
    output: &Path,
    input: &Path,
    reference: Option<&Path>,
    build: &BuildArgs,
) -> Result<()> {
    let reference_path = reference.map_or_else(|| default_reference(output), Path::to_path_buf);
    info!("Taking flags from {}", reference_path.display());
    let reference = read_archive(&reference_path)
        .with_context(|| format!("Failed to load reference {}", reference_path.display()))?;

    let fresh = collect_tree(input, build.build_options())?;
    let fixed = reconcile(&fresh, &reference);
    let report = &fixed.report;
    for change in &report.updated {
        debug!(
            "{} {}: {} -> {}",
            change.kind, change.path, change.old, change.new
        );
    }
    if !report.unmatched.is_empty() {
        warn!(
            "{} entries have no counterpart in {} and keep default flags",
            report.unmatched.len(),
            reference_path.display()
        );
    }
    info!(
        "Fixed flags: {} updated, {} unchanged, {} unmatched, {} kind mismatches",
        report.updated.len(),
        report.unchanged,
        report.unmatched.len(),
        report.kind_mismatches.len()
    );

    let archive = fixed
        .tree
        .encode(&build.encode_options())
        .with_context(|| format!("Failed to encode {}", output.display()))?;
    write_atomic(output, &archive)?;
    info!("Wrote {} ({} bytes)", output.display(), archive.len());
    Ok(())
}
