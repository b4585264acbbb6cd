//! Flag reconciliation ("fix")
//!
//! A freshly built tree gets default flags. The loader expects the values a
//! shipped archive carries, so the fix pass copies them across, matching
//! entries by path hash.

use tracing::{debug, warn};

use crate::vfs2::tree::{EntryKind, EntryRef, EntryTree};

/// One flag value that was replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagChange {
    /// Path of the entry in the fresh tree
    pub path: String,
    /// Entry kind
    pub kind: EntryKind,
    /// Flags before reconciliation
    pub old: i32,
    /// Flags taken from the reference
    pub new: i32,
}

/// Outcome of a reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Entries whose flags changed
    pub updated: Vec<FlagChange>,
    /// Matched entries that already carried the reference value
    pub unchanged: usize,
    /// Paths in the fresh tree with no counterpart in the reference
    pub unmatched: Vec<String>,
    /// Paths whose hash matched an entry of the other kind
    pub kind_mismatches: Vec<String>,
}

impl ReconcileReport {
    /// Number of entries found in both trees, including kind mismatches
    pub fn matched(&self) -> usize {
        self.updated.len() + self.unchanged + self.kind_mismatches.len()
    }
}

/// Reconciled tree and what happened to it
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// Copy of the fresh tree with reference flags applied
    pub tree: EntryTree,
    /// Per-entry outcome
    pub report: ReconcileReport,
}

/// Copy flags from `reference` onto a copy of `fresh`.
///
/// Entries are matched by path hash, and the two roots match each other.
/// Only flags change: names, hashes, kinds and payloads of `fresh` are kept,
/// and `reference` is only read.
pub fn reconcile(fresh: &EntryTree, reference: &EntryTree) -> Reconciled {
    let mut tree = fresh.clone();
    let mut report = ReconcileReport::default();
    let diff = fresh.diff_by_hash(reference);

    let roots = (
        EntryRef::Directory(fresh.root_id()),
        EntryRef::Directory(reference.root_id()),
    );
    for (ours, theirs) in std::iter::once(roots).chain(diff.matched.into_values()) {
        let path = fresh.path_of(ours);
        if ours.kind() != theirs.kind() {
            warn!(
                "Skipping {}: {} here but {} in the reference",
                path,
                ours.kind(),
                theirs.kind()
            );
            report.kind_mismatches.push(path);
            continue;
        }

        let Some(new) = reference.entry(theirs).map(|entry| entry.flags()) else {
            continue;
        };
        match tree.set_flags(ours, new) {
            Some(old) if old != new => {
                debug!("Flags of {} {}: {} -> {}", ours.kind(), path, old, new);
                report.updated.push(FlagChange {
                    path,
                    kind: ours.kind(),
                    old,
                    new,
                });
            }
            Some(_) => report.unchanged += 1,
            None => {}
        }
    }

    report.unmatched = diff
        .only_in_self
        .into_iter()
        .filter_map(|hash| fresh.hash_index().get(hash))
        .map(|entry| fresh.path_of(entry))
        .collect();
    report.unmatched.sort();

    debug!(
        "Reconciled {} entries: {} updated, {} unchanged, {} unmatched, {} kind mismatches",
        fresh.len(),
        report.updated.len(),
        report.unchanged,
        report.unmatched.len(),
        report.kind_mismatches.len()
    );
    Reconciled { tree, report }
}
