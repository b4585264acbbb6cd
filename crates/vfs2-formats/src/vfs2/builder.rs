//! Builder for fresh entry trees from a loose-file listing

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use bytes::Bytes;
use tracing::debug;

use crate::vfs2::compression::Compression;
use crate::vfs2::error::{Vfs2Error, Vfs2Result};
use crate::vfs2::hash::path_hash;
use crate::vfs2::tree::{Directory, EntryTree, File, Payload};

/// Flags given to the root directory of a fresh tree
pub const DEFAULT_ROOT_FLAGS: i32 = 1;

/// Flags given to other directories of a fresh tree
pub const DEFAULT_DIRECTORY_FLAGS: i32 = -1;

/// Default flags for freshly built entries.
///
/// Directory flags have no known meaning; these values reproduce what the
/// shipped archives use for the common cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Flags of the root directory
    pub root_flags: i32,
    /// Flags of every other directory without an override
    pub directory_flags: i32,
    /// Per-name directory flags, matched against the directory's own name
    pub directory_flag_overrides: BTreeMap<String, i32>,
    /// Extensions (without the dot) of files stored uncompressed
    pub raw_extensions: Vec<String>,
    /// File and directory names left out of the tree
    pub ignored_names: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            root_flags: DEFAULT_ROOT_FLAGS,
            directory_flags: DEFAULT_DIRECTORY_FLAGS,
            directory_flag_overrides: BTreeMap::from([("ui".to_string(), 9)]),
            raw_extensions: vec!["at9".to_string()],
            ignored_names: vec![".DS_Store".to_string()],
        }
    }
}

impl BuildOptions {
    /// Default flags for a non-root directory called `name`
    pub fn directory_flags_for(&self, name: &str) -> i32 {
        self.directory_flag_overrides
            .get(name)
            .copied()
            .unwrap_or(self.directory_flags)
    }

    /// Default flags (compression type) for a file called `name`
    pub fn file_flags_for(&self, name: &str) -> i32 {
        let raw = self.raw_extensions.iter().any(|ext| {
            name.len() > ext.len()
                && name.ends_with(ext.as_str())
                && name.as_bytes()[name.len() - ext.len() - 1] == b'.'
        });
        if raw {
            Compression::NONE_FLAG
        } else {
            Compression::ZLIB_FLAG
        }
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.ignored_names.iter().any(|ignored| ignored == name)
    }
}

#[derive(Debug, Default)]
struct PendingDirectory {
    subdirectories: BTreeSet<String>,
    files: BTreeMap<String, Bytes>,
}

/// Collects directories and files, then assigns ids and default flags.
///
/// Directory ids are assigned breadth-first with children sorted by name;
/// when a directory is visited its subdirectories get ids first, then its
/// files get consecutive file ids.
#[derive(Debug)]
pub struct TreeBuilder {
    options: BuildOptions,
    directories: BTreeMap<String, PendingDirectory>,
}

impl TreeBuilder {
    /// Create a builder holding only the root directory
    pub fn new(options: BuildOptions) -> Self {
        let mut directories = BTreeMap::new();
        directories.insert(String::new(), PendingDirectory::default());
        Self {
            options,
            directories,
        }
    }

    /// Options the builder assigns defaults from
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Add a directory (and any missing parents) by `/`-separated relative path
    pub fn add_directory(&mut self, path: &str) -> Vfs2Result<&mut Self> {
        let components = split_path(path)?;
        if components.iter().any(|c| self.options.is_ignored(c)) {
            debug!("Skipping ignored directory {}", path);
            return Ok(self);
        }
        self.ensure_directory(&components);
        Ok(self)
    }

    /// Add a file (and any missing parent directories) by `/`-separated relative path
    pub fn add_file(&mut self, path: &str, contents: Bytes) -> Vfs2Result<&mut Self> {
        let components = split_path(path)?;
        let Some((name, parents)) = components.split_last() else {
            return Err(Vfs2Error::InvalidPath(path.to_string()));
        };
        if components.iter().any(|c| self.options.is_ignored(c)) {
            debug!("Skipping ignored file {}", path);
            return Ok(self);
        }
        let parent = self.ensure_directory(parents);
        if let Some(dir) = self.directories.get_mut(&parent) {
            dir.files.insert((*name).to_string(), contents);
        }
        Ok(self)
    }

    fn ensure_directory(&mut self, components: &[&str]) -> String {
        let mut current = String::new();
        for component in components {
            let parent = current.clone();
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(component);

            if let Some(dir) = self.directories.get_mut(&parent) {
                dir.subdirectories.insert((*component).to_string());
            }
            self.directories.entry(current.clone()).or_default();
        }
        current
    }

    /// Assign ids, hashes and default flags
    pub fn build(self) -> Vfs2Result<EntryTree> {
        let mut directories = vec![Directory::new(
            String::new(),
            0,
            None,
            self.options.root_flags,
        )];
        let mut files = Vec::new();
        let mut queue = VecDeque::from([(0u32, String::new())]);

        while let Some((id, path)) = queue.pop_front() {
            let Some(pending) = self.directories.get(&path) else {
                continue;
            };

            for name in &pending.subdirectories {
                let child_path = join(&path, name);
                let child_id = directories.len() as u32;
                directories.push(Directory::new(
                    name.clone(),
                    path_hash(&child_path),
                    Some(id),
                    self.options.directory_flags_for(name),
                ));
                queue.push_back((child_id, child_path));
            }

            for (name, contents) in &pending.files {
                files.push(File {
                    name: name.clone(),
                    hash: path_hash(&join(&path, name)),
                    parent: id,
                    flags: self.options.file_flags_for(name),
                    payload: Payload::Loose(contents.clone()),
                });
            }
        }

        debug!(
            "Built tree with {} directories and {} files",
            directories.len(),
            files.len()
        );
        EntryTree::from_parts(directories, files)
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn split_path(path: &str) -> Vfs2Result<Vec<&str>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let components: Vec<&str> = trimmed.split('/').collect();
    if components
        .iter()
        .any(|c| c.is_empty() || *c == "." || *c == ".." || c.contains('\\'))
    {
        return Err(Vfs2Error::InvalidPath(path.to_string()));
    }
    Ok(components)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::vfs2::tree::EntryRef;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_flags() {
        let options = BuildOptions::default();
        assert_eq!(options.directory_flags_for("ui"), 9);
        assert_eq!(options.directory_flags_for("sound"), -1);
        assert_eq!(options.file_flags_for("title.at9"), 0);
        assert_eq!(options.file_flags_for("button.png"), 2);
        assert_eq!(options.file_flags_for("at9"), 2);
        assert_eq!(options.file_flags_for("titleat9"), 2);
    }

    #[test]
    fn test_ids_are_breadth_first_and_sorted() {
        let mut builder = TreeBuilder::new(BuildOptions::default());
        builder
            .add_file("b/deep/x.bin", Bytes::from_static(b"x"))
            .unwrap()
            .add_file("a/y.bin", Bytes::from_static(b"y"))
            .unwrap()
            .add_file("a/w.bin", Bytes::from_static(b"w"))
            .unwrap()
            .add_file("z.bin", Bytes::from_static(b"z"))
            .unwrap()
            .add_directory("a/sub")
            .unwrap();
        let tree = builder.build().unwrap();

        let dirs: Vec<String> = (0..tree.directories().len() as u32)
            .map(|id| tree.path_of(EntryRef::Directory(id)))
            .collect();
        assert_eq!(dirs, vec!["", "a", "b", "a/sub", "b/deep"]);

        let files: Vec<String> = (0..tree.files().len() as u32)
            .map(|id| tree.path_of(EntryRef::File(id)))
            .collect();
        assert_eq!(files, vec!["z.bin", "a/w.bin", "a/y.bin", "b/deep/x.bin"]);

        assert_eq!(tree.root().flags(), DEFAULT_ROOT_FLAGS);
        assert_eq!(tree.root().hash(), 0);
        assert_eq!(tree.directory(1).unwrap().flags(), DEFAULT_DIRECTORY_FLAGS);
        assert_eq!(tree.directory(1).unwrap().hash(), path_hash("a"));
    }

    #[test]
    fn test_overrides_and_raw_extensions() {
        let options = BuildOptions {
            directory_flag_overrides: BTreeMap::from([("sound".to_string(), 3)]),
            raw_extensions: vec!["ogg".to_string()],
            ..BuildOptions::default()
        };
        let mut builder = TreeBuilder::new(options);
        builder
            .add_file("ui/a.at9", Bytes::new())
            .unwrap()
            .add_file("sound/b.ogg", Bytes::new())
            .unwrap();
        let tree = builder.build().unwrap();

        let flags = |path: &str| tree.lookup_by_hash(path_hash(path)).unwrap().flags();
        assert_eq!(flags("ui"), -1);
        assert_eq!(flags("sound"), 3);
        assert_eq!(flags("ui/a.at9"), 2);
        assert_eq!(flags("sound/b.ogg"), 0);
    }

    #[test]
    fn test_ignored_names_are_skipped() {
        let mut builder = TreeBuilder::new(BuildOptions::default());
        builder
            .add_file(".DS_Store", Bytes::new())
            .unwrap()
            .add_file("ui/.DS_Store", Bytes::new())
            .unwrap()
            .add_file("ui/ok.png", Bytes::new())
            .unwrap();
        let tree = builder.build().unwrap();
        assert_eq!(tree.files().len(), 1);
        assert_eq!(tree.path_of(EntryRef::File(0)), "ui/ok.png");
    }

    #[test]
    fn test_invalid_paths() {
        let mut builder = TreeBuilder::new(BuildOptions::default());
        for bad in ["a//b", "../x", "a/./b", "a\\b"] {
            assert!(
                matches!(
                    builder.add_file(bad, Bytes::new()),
                    Err(Vfs2Error::InvalidPath(_))
                ),
                "{bad} accepted"
            );
        }
        assert!(matches!(
            builder.add_file("", Bytes::new()),
            Err(Vfs2Error::InvalidPath(_))
        ));
        assert!(builder.add_file("/leading/slash.txt", Bytes::new()).is_ok());
    }

    #[test]
    fn test_empty_builder_yields_root_only() {
        let tree = TreeBuilder::new(BuildOptions::default()).build().unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 1);
        assert!(tree.hash_index().is_empty());
    }

    #[test]
    fn test_case_insensitive_collision_is_reported() {
        let mut builder = TreeBuilder::new(BuildOptions::default());
        builder
            .add_file("ui/Button.png", Bytes::new())
            .unwrap()
            .add_file("ui/button.png", Bytes::new())
            .unwrap();
        assert!(matches!(
            builder.build(),
            Err(Vfs2Error::DuplicateHash { .. })
        ));
    }
}
