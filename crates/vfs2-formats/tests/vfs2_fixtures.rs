#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests against an archive written by the Python packing tool
//!
//! That tool stores the packed folder path (`data/`) as the root's name.
//! `sample.vfs` holds:
//!
//! ```text
//! readme.txt            zlib
//! empty/
//! sound/title.at9       stored, 200 random bytes
//! sound/voice.at9       stored
//! ui/button.png         zlib, 4096 bytes
//! ui/icons/a.png        zlib, 4 bytes
//! ```

use std::path::Path;

use vfs2_formats::ArchiveFormat;
use vfs2_formats::vfs2::{
    EncodeOptions, Entry, EntryKind, EntryRef, EntryTree, RecordTables, path_hash,
};

fn fixture() -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("test_fixtures/vfs2/sample.vfs");
    std::fs::read(&path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

fn contents(tree: &EntryTree, path: &str) -> Vec<u8> {
    match tree.lookup_by_hash(path_hash(path)) {
        Some(Entry::File(_, file)) => file.contents().unwrap().to_vec(),
        other => panic!("{path}: expected a file, got {other:?}"),
    }
}

#[test]
fn vfs2_fixture_parse() {
    let tree = EntryTree::decode(fixture()).unwrap();
    assert_eq!(tree.directories().len(), 5);
    assert_eq!(tree.files().len(), 5);
    assert_eq!(tree.root().flags(), 1);
    // the stored root name is carried through; paths stay root-relative
    assert_eq!(tree.root().name(), "data/");
    assert_eq!(tree.path_of(EntryRef::Directory(0)), "");

    let mut paths: Vec<(EntryKind, String)> = tree
        .walk()
        .map(|entry| (entry.kind(), tree.path_of(entry.id())))
        .collect();
    paths.sort_by(|a, b| a.1.cmp(&b.1));
    let expected = [
        (EntryKind::Directory, ""),
        (EntryKind::Directory, "empty"),
        (EntryKind::File, "readme.txt"),
        (EntryKind::Directory, "sound"),
        (EntryKind::File, "sound/title.at9"),
        (EntryKind::File, "sound/voice.at9"),
        (EntryKind::Directory, "ui"),
        (EntryKind::File, "ui/button.png"),
        (EntryKind::Directory, "ui/icons"),
        (EntryKind::File, "ui/icons/a.png"),
    ];
    let expected: Vec<(EntryKind, String)> = expected
        .iter()
        .map(|(kind, path)| (*kind, (*path).to_string()))
        .collect();
    assert_eq!(paths, expected);
}

#[test]
fn vfs2_fixture_hashes_match_paths() {
    let tree = EntryTree::decode(fixture()).unwrap();
    for entry in tree.walk() {
        let path = tree.path_of(entry.id());
        if path.is_empty() {
            assert_eq!(entry.hash(), 0);
        } else {
            assert_eq!(entry.hash(), path_hash(&path), "hash of {path}");
        }
    }
    assert_eq!(path_hash("ui"), 0x4B87_8A52);
    assert_eq!(path_hash("sound/title.at9"), 0x7E98_682A);
}

#[test]
fn vfs2_fixture_flags() {
    let tree = EntryTree::decode(fixture()).unwrap();
    let flags = |path: &str| tree.lookup_by_hash(path_hash(path)).unwrap().flags();
    assert_eq!(flags("ui"), 9);
    assert_eq!(flags("sound"), -1);
    assert_eq!(flags("ui/icons"), -1);
    assert_eq!(flags("readme.txt"), 2);
    assert_eq!(flags("sound/title.at9"), 0);
    assert_eq!(flags("ui/button.png"), 2);
}

#[test]
fn vfs2_fixture_contents() {
    let tree = EntryTree::decode(fixture()).unwrap();
    assert_eq!(contents(&tree, "readme.txt"), b"hello vfs2\n");
    assert_eq!(contents(&tree, "ui/icons/a.png"), b"icon");
    assert_eq!(contents(&tree, "sound/voice.at9"), b"AT9 voice ".repeat(20));

    let button = contents(&tree, "ui/button.png");
    let expected: Vec<u8> = (0..16).flat_map(|_| 0..=255u8).collect();
    assert_eq!(button, expected);

    let title = contents(&tree, "sound/title.at9");
    assert_eq!(title.len(), 200);
    assert_eq!(title.iter().map(|&b| u64::from(b)).sum::<u64>(), 25670);
}

#[test]
fn vfs2_fixture_payload_layout() {
    let tree = EntryTree::decode(fixture()).unwrap();
    let Some(Entry::File(_, button)) = tree.lookup_by_hash(path_hash("ui/button.png")) else {
        panic!("ui/button.png missing");
    };
    assert!(button.is_compressed());
    assert_eq!(button.offset(), Some(423));
    assert_eq!(button.compressed_size(), Some(321));
    assert_eq!(button.uncompressed_size(), 4096);

    let tables = RecordTables::parse(&fixture()).unwrap();
    assert_eq!(tables.data_offset(), 236);
    assert_eq!(tables.name_table_offset, 1000);
}

#[test]
fn vfs2_fixture_round_trip() {
    let data = fixture();
    let tree = EntryTree::decode(data.clone()).unwrap();
    let rebuilt = tree.encode(&EncodeOptions::default()).unwrap();
    assert_eq!(rebuilt, data, "re-encoding must reproduce the archive");

    EntryTree::verify_round_trip(&data).unwrap();
}
