#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Build, encode, decode and fix round trips through the public API

use std::collections::BTreeMap;

use bytes::Bytes;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use vfs2_formats::vfs2::{
    BuildOptions, Compression, EncodeOptions, Entry, EntryRef, EntryTree, File, RecordTables,
    TreeBuilder, path_hash, reconcile,
};

fn build(files: &BTreeMap<String, Vec<u8>>) -> EntryTree {
    let mut builder = TreeBuilder::new(BuildOptions::default());
    for (path, contents) in files {
        builder
            .add_file(path, Bytes::copy_from_slice(contents))
            .unwrap();
    }
    builder.build().unwrap()
}

fn file<'a>(tree: &'a EntryTree, path: &str) -> &'a File {
    match tree.lookup_by_hash(path_hash(path)) {
        Some(Entry::File(_, file)) => file,
        other => panic!("{path}: expected a file, got {other:?}"),
    }
}

fn file_map() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    let path = (
        prop::collection::vec("[a-z]{1,4}", 0..3),
        "[a-z]{1,6}",
        prop::sample::select(vec!["bin", "at9", "png"]),
    )
        .prop_map(|(dirs, stem, ext)| {
            let mut path = dirs.join("/");
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(&format!("{stem}.{ext}"));
            path
        });
    let contents = prop_oneof![
        prop::collection::vec(any::<u8>(), 0..300),
        (any::<u8>(), 0usize..2000).prop_map(|(byte, len)| vec![byte; len]),
    ];
    prop::collection::btree_map(path, contents, 0..20)
}

proptest! {
    #[test]
    fn prop_round_trip_preserves_contents(files in file_map()) {
        let tree = build(&files);
        let archive = tree.encode(&EncodeOptions::default()).unwrap();
        let decoded = EntryTree::decode(archive.clone()).unwrap();

        prop_assert_eq!(decoded.files().len(), files.len());
        for (path, contents) in &files {
            let decoded_file = file(&decoded, path);
            let got = decoded_file.contents().unwrap();
            prop_assert_eq!(got.as_ref(), contents.as_slice());
            prop_assert_eq!(decoded_file.uncompressed_size() as usize, contents.len());
        }
        for (ours, theirs) in tree.walk().zip(decoded.walk()) {
            prop_assert_eq!(ours.id(), theirs.id());
            prop_assert_eq!(ours.hash(), theirs.hash());
            prop_assert_eq!(ours.name(), theirs.name());
        }

        let again = decoded.encode(&EncodeOptions::default()).unwrap();
        prop_assert_eq!(again, archive);
    }

    #[test]
    fn prop_payloads_are_consistent_with_records(files in file_map()) {
        let archive = build(&files).encode(&EncodeOptions::default()).unwrap();
        let tables = RecordTables::parse(&archive).unwrap();
        let data_offset = tables.data_offset();

        let mut stored = 0usize;
        for record in &tables.files {
            let start = data_offset + record.offset as usize;
            let mut payload_start = start;
            if record.compression == Compression::ZLIB_FLAG {
                payload_start += 4;
            }
            let end = payload_start + record.size as usize;
            prop_assert!(end <= tables.name_table_offset as usize);
            stored += end - start;
        }
        // payloads tile the data region without gaps
        prop_assert_eq!(data_offset + stored, tables.name_table_offset as usize);
    }
}

#[test]
fn compress_extract_fix_scenario() {
    let button: Vec<u8> = b"button pixels ".iter().copied().cycle().take(4096).collect();
    let files = BTreeMap::from([("ui/button.png".to_string(), button.clone())]);

    // compress
    let fresh = build(&files);
    let archive = fresh.encode(&EncodeOptions::default()).unwrap();

    // extract
    let decoded = EntryTree::decode(archive).unwrap();
    assert_eq!(file(&decoded, "ui/button.png").contents().unwrap(), button);
    let ui = decoded.lookup_by_hash(path_hash("ui")).unwrap();
    assert_eq!(ui.flags(), 9);

    // a shipped archive with a different flag on ui
    let mut reference = build(&files);
    let ui = reference.lookup_by_hash(path_hash("ui")).unwrap().id();
    reference.set_flags(ui, 5);
    let reference = EntryTree::decode(reference.encode(&EncodeOptions::default()).unwrap()).unwrap();

    // fix
    let fixed = reconcile(&fresh, &reference);
    assert_eq!(fixed.report.updated.len(), 1);
    let fixed = EntryTree::decode(fixed.tree.encode(&EncodeOptions::default()).unwrap()).unwrap();
    assert_eq!(fixed.lookup_by_hash(path_hash("ui")).unwrap().flags(), 5);
    assert_eq!(file(&fixed, "ui/button.png").contents().unwrap(), button);
}

#[test]
fn fix_carries_file_compression_from_reference() {
    let files = BTreeMap::from([
        ("data/table.bin".to_string(), vec![7u8; 1024]),
        ("data/other.bin".to_string(), vec![1u8; 1024]),
    ]);
    let fresh = build(&files);

    let mut reference = build(&files);
    let table = reference
        .lookup_by_hash(path_hash("data/table.bin"))
        .unwrap()
        .id();
    reference.set_flags(table, Compression::NONE_FLAG);

    let fixed = reconcile(&fresh, &reference).tree;
    let archive = fixed.encode(&EncodeOptions::default()).unwrap();
    let decoded = EntryTree::decode(archive).unwrap();

    let table = file(&decoded, "data/table.bin");
    assert!(!table.is_compressed());
    assert_eq!(table.compressed_size(), Some(1024));
    assert!(file(&decoded, "data/other.bin").is_compressed());
}

#[test]
fn decoded_children_are_in_id_order() {
    let files = BTreeMap::from([
        ("b/two.bin".to_string(), vec![2]),
        ("a/one.bin".to_string(), vec![1]),
        ("root.bin".to_string(), vec![0]),
    ]);
    let archive = build(&files).encode(&EncodeOptions::default()).unwrap();
    let tree = EntryTree::decode(archive).unwrap();

    let root = tree.root();
    assert_eq!(root.subdirectories(), &[1, 2]);
    assert_eq!(root.files(), &[0]);
    assert_eq!(tree.path_of(EntryRef::Directory(1)), "a");
    assert_eq!(tree.path_of(EntryRef::File(1)), "a/one.bin");
    assert_eq!(tree.files_in_data_order(), vec![0, 1, 2]);
}
