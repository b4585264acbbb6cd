//! Filesystem side of the tool: loose folders in, extracted folders and
//! archives out

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use vfs2_formats::vfs2::{BuildOptions, EntryRef, EntryTree, TreeBuilder};
use walkdir::WalkDir;

/// Read an archive from disk and decode it
pub fn read_archive(path: &Path) -> Result<EntryTree> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    debug!("Read {} bytes from {}", data.len(), path.display());
    EntryTree::decode(data).with_context(|| format!("Failed to decode {}", path.display()))
}

/// Walk `root` and build a fresh tree from everything below it.
///
/// Symbolic links and other special files are skipped.
pub fn collect_tree(root: &Path, options: BuildOptions) -> Result<EntryTree> {
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }

    let mut builder = TreeBuilder::new(options);
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        let relative = archive_path(root, entry.path())?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            builder.add_directory(&relative)?;
        } else if file_type.is_file() {
            let contents = std::fs::read(entry.path())
                .with_context(|| format!("Failed to read {}", entry.path().display()))?;
            builder.add_file(&relative, Bytes::from(contents))?;
        } else {
            warn!("Skipping {}: not a regular file", entry.path().display());
        }
    }

    builder
        .build()
        .with_context(|| format!("Failed to build a tree from {}", root.display()))
}

/// `/`-separated path of `path` relative to `root`
fn archive_path(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => match part.to_str() {
                Some(part) => parts.push(part),
                None => bail!("{} is not valid UTF-8", path.display()),
            },
            _ => bail!("unexpected path component in {}", path.display()),
        }
    }
    Ok(parts.join("/"))
}

/// Join an archive path onto `root`, refusing anything that would land outside it
pub fn safe_join(root: &Path, relative: &str) -> Result<PathBuf> {
    let mut joined = root.to_path_buf();
    for part in relative.split('/').filter(|part| !part.is_empty()) {
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !part.contains('\\') => joined.push(part),
            _ => bail!("unsafe path in archive: {relative}"),
        }
    }
    Ok(joined)
}

/// Counts from one extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub directories: usize,
    pub files: usize,
    pub bytes: u64,
}

/// Write every directory and file of `tree` below `output`.
///
/// Paths are checked and every payload is inflated before anything is
/// written, so a bad archive leaves `output` untouched.
pub fn extract_tree(tree: &EntryTree, output: &Path) -> Result<ExtractStats> {
    let directories = (0..tree.directories().len() as u32)
        .map(|id| safe_join(output, &tree.path_of(EntryRef::Directory(id))))
        .collect::<Result<Vec<_>>>()?;

    let mut files = Vec::with_capacity(tree.files().len());
    for (id, file) in tree.files().iter().enumerate() {
        let relative = tree.path_of(EntryRef::File(id as u32));
        let path = safe_join(output, &relative)?;
        let contents = file
            .contents()
            .with_context(|| format!("Failed to read {relative} from the archive"))?;
        files.push((relative, path, contents));
    }

    let mut stats = ExtractStats::default();
    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    for path in &directories {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        stats.directories += 1;
    }

    for (relative, path, contents) in &files {
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Extracted {} ({} bytes)", relative, contents.len());
        stats.files += 1;
        stats.bytes += contents.len() as u64;
    }

    Ok(stats)
}

/// Write `data` to `path` through a temporary file in the same directory.
///
/// The destination is either left untouched or fully replaced.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create a temporary file in {}", parent.display()))?;
    temp.write_all(data)
        .with_context(|| format!("Failed to write {}", temp.path().display()))?;
    temp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to sync {}", temp.path().display()))?;
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    debug!("Wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}

/// Reference archive used by `fix` when none is given: `<stem>_old<.ext>`
/// next to the output
pub fn default_reference(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!("{stem}_old.{}", ext.to_string_lossy()),
        None => format!("{stem}_old"),
    };
    output.with_file_name(name)
}
