//! Lookup, insertion and refresh operations on the in-memory entry list
//! (§4.2 Refresh, §4.3 Add/Remove, §4.4 File/Directory Conflicts).
//!
//! Grounded on `index_name_pos`, `has_file_name`, `has_dir_name`,
//! `check_file_directory_conflict` and `add_index_entry_with_check` in
//! read-cache.c, and on `BitIndex::add_entry`/`remove_file_dir_collisions` in
//! `libbit` (`andyyu2004-bit`) for how the same rules read in Rust.

use crate::config::Config;
use crate::error::IndexError;
use crate::index::entry::{compare_names, IndexEntry, Stage};
use crate::path::verify_path;
use bitflags::bitflags;

bitflags! {
    /// Options accepted by `insert`, mirroring `ADD_CACHE_*` in read-cache.c.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InsertOptions: u8 {
        /// Allow replacing an existing entry at the same `(name, stage)`,
        /// and allow the file/directory conflict checks (§4.3 steps 4-5) to
        /// remove colliding entries rather than reject the insert.
        const OK_TO_REPLACE = 1 << 0;
        /// Skip the file/directory conflict scan entirely (bulk-load paths
        /// that are already known to be conflict-free, e.g. a fresh read).
        const SKIP_DFCHECK = 1 << 2;
    }
}

impl Default for InsertOptions {
    fn default() -> Self {
        InsertOptions::empty()
    }
}

/// Binary search for the first entry whose `(name, stage)` is `>= (name, stage)`.
/// Entries are kept sorted by `compare_names`, so this doubles as an
/// insertion point when no exact match exists.
pub fn name_pos(entries: &[IndexEntry], name: &[u8], stage: Stage) -> Result<usize, usize> {
    entries.binary_search_by(|e| compare_names(&e.name, e.stage, name, stage))
}

/// All stage entries (1..=3) present for `name`, in stage order. Used by
/// merge-conflict resolution and by `has_file_name`'s unmerged-stage check.
pub fn stages_for<'a>(entries: &'a [IndexEntry], name: &[u8]) -> Vec<&'a IndexEntry> {
    let start = match name_pos(entries, name, Stage::Merged) {
        Ok(i) | Err(i) => i,
    };
    entries[start..]
        .iter()
        .take_while(|e| e.name == name)
        .collect()
}

/// Byte-slice equality, ASCII-case-folded when `ignorecase` is set
/// (`core.ignorecase`, §6): the F/D-conflict checks need to treat `A` and
/// `a` as the same path component on case-insensitive filesystems.
fn bytes_eq_fold(a: &[u8], b: &[u8], ignorecase: bool) -> bool {
    if ignorecase {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

fn starts_with_fold(name: &[u8], prefix: &[u8], ignorecase: bool) -> bool {
    name.len() >= prefix.len() && bytes_eq_fold(&name[..prefix.len()], prefix, ignorecase)
}

/// `has_file_name` (§4.3 step 4, "file-has-directory"): scan forward from
/// `name`'s insertion point while entries' names are a strict prefix of
/// `name` followed by `/`. Under `OK_TO_REPLACE` those entries are removed
/// in place and this returns `false` (no remaining conflict); otherwise
/// returns `true` on the first such entry found, removing nothing.
///
/// The index itself is always sorted case-sensitively, so under
/// `core.ignorecase` the set of colliding entries is no longer guaranteed
/// contiguous around the binary-search insertion point; fall back to a
/// full scan in that case.
fn has_file_name(entries: &mut Vec<IndexEntry>, name: &[u8], ok_to_replace: bool, ignorecase: bool) -> bool {
    let mut prefix = name.to_vec();
    prefix.push(b'/');

    if !ignorecase {
        loop {
            let start = match name_pos(entries, &prefix, Stage::Merged) {
                Ok(i) | Err(i) => i,
            };
            if start >= entries.len() || !entries[start].name.starts_with(&prefix[..]) {
                return false;
            }
            if !ok_to_replace {
                return true;
            }
            entries.remove(start);
        }
    }

    loop {
        match entries.iter().position(|e| starts_with_fold(&e.name, &prefix, true)) {
            Some(i) => {
                if !ok_to_replace {
                    return true;
                }
                entries.remove(i);
            }
            None => return false,
        }
    }
}

/// `has_dir_name` (§4.3 step 5, "directory-has-file"): for each ancestor
/// directory of `name`, check whether an entry for that exact ancestor path
/// is tracked as a file at stage 0. Under `OK_TO_REPLACE` any such ancestor
/// entry is removed and this returns `false`; otherwise returns `true` on
/// the first clash, removing nothing.
fn has_dir_name(entries: &mut Vec<IndexEntry>, name: &[u8], ok_to_replace: bool, ignorecase: bool) -> bool {
    let mut end = 0;
    while let Some(rel) = name[end..].iter().position(|&b| b == b'/') {
        let boundary = end + rel;
        let ancestor = &name[..boundary];
        let found = if ignorecase {
            entries
                .iter()
                .position(|e| e.stage == Stage::Merged && bytes_eq_fold(&e.name, ancestor, true))
        } else {
            name_pos(entries, ancestor, Stage::Merged).ok()
        };
        if let Some(i) = found {
            if !entries[i].mode.is_zero() {
                if !ok_to_replace {
                    return true;
                }
                entries.remove(i);
                continue;
            }
        }
        end = boundary + 1;
    }
    false
}

/// `check_file_directory_conflict`: combine the file-name and dir-name
/// checks (§4.3 steps 4-5), honouring `OK_TO_REPLACE`/`SKIP_DFCHECK` and
/// `core.ignorecase`. On success, any colliding entries permitted to be
/// replaced have already been removed from `entries`.
fn check_file_directory_conflict(
    entries: &mut Vec<IndexEntry>,
    entry: &IndexEntry,
    options: InsertOptions,
    config: &Config,
) -> Result<(), IndexError> {
    if options.contains(InsertOptions::SKIP_DFCHECK) {
        return Ok(());
    }
    let ok_to_replace = options.contains(InsertOptions::OK_TO_REPLACE);
    let ignorecase = config.core_ignorecase;
    if has_file_name(entries, &entry.name, ok_to_replace, ignorecase) {
        return Err(IndexError::Conflict {
            path: String::from_utf8_lossy(&entry.name).into_owned(),
        });
    }
    if has_dir_name(entries, &entry.name, ok_to_replace, ignorecase) {
        return Err(IndexError::Conflict {
            path: String::from_utf8_lossy(&entry.name).into_owned(),
        });
    }
    Ok(())
}

/// Insert (or replace) an entry, keeping the list sorted by `(name, stage)`
/// and enforcing the file/directory conflict rule. A stage-0 entry always
/// supersedes any stage 1-3 entries for the same path (merge resolved); a
/// stage 1-3 insertion removes any existing stage-0 entry for the same path
/// (merge just became conflicted).
pub fn insert(
    entries: &mut Vec<IndexEntry>,
    entry: IndexEntry,
    options: InsertOptions,
    config: &Config,
) -> Result<(), IndexError> {
    if !verify_path(&entry.name) {
        return Err(IndexError::InvalidPath {
            path: String::from_utf8_lossy(&entry.name).into_owned(),
        });
    }

    check_file_directory_conflict(entries, &entry, options, config)?;

    if entry.stage == Stage::Merged {
        remove_all_stages(entries, &entry.name);
    } else {
        remove_stage(entries, &entry.name, Stage::Merged);
    }

    match name_pos(entries, &entry.name, entry.stage) {
        Ok(i) => {
            if !options.contains(InsertOptions::OK_TO_REPLACE) {
                return Err(IndexError::Conflict {
                    path: String::from_utf8_lossy(&entry.name).into_owned(),
                });
            }
            entries[i] = entry;
        }
        Err(i) => entries.insert(i, entry),
    }
    Ok(())
}

/// Remove every stage of `name` from the index (used when a stage-0 entry
/// for the same path is being inserted, resolving any prior conflict).
pub fn remove_all_stages(entries: &mut Vec<IndexEntry>, name: &[u8]) {
    entries.retain(|e| e.name != name);
}

fn remove_stage(entries: &mut Vec<IndexEntry>, name: &[u8], stage: Stage) {
    if let Ok(i) = name_pos(entries, name, stage) {
        entries.remove(i);
    }
}

/// Remove the entry at `(name, stage)`, if present. Returns whether anything
/// was removed.
pub fn remove(entries: &mut Vec<IndexEntry>, name: &[u8], stage: Stage) -> bool {
    match name_pos(entries, name, stage) {
        Ok(i) => {
            entries.remove(i);
            true
        }
        Err(_) => false,
    }
}

/// Refresh every entry against the working tree (§4.2): re-stat each path,
/// and for anything racily clean or stat-mismatched, re-hash content and
/// update the recorded stat info. Returns the paths that turned out to
/// actually differ in content (a refresh that only updates stale stat
/// fields for unchanged content is not itself a "modification").
pub fn refresh(
    entries: &mut [IndexEntry],
    config: &Config,
    index_timestamp: Option<crate::index::entry::Timespec>,
    read_file: impl Fn(&[u8]) -> std::io::Result<Vec<u8>>,
) -> Vec<Vec<u8>> {
    tracing::debug!(entries = entries.len(), "refreshing index entries");
    let mut modified = Vec::new();
    for entry in entries.iter_mut() {
        let meta = match std::fs::symlink_metadata(path_from_bytes(&entry.name)) {
            Ok(m) => m,
            Err(_) => {
                modified.push(entry.name.clone());
                continue;
            }
        };

        let changed = crate::index::stat::match_stat_basic(entry, &meta, config);
        let racy = crate::index::stat::is_racily_clean(entry, index_timestamp);

        if changed == 0 && !racy {
            continue;
        }

        match read_file(&entry.name) {
            Ok(data) => {
                let hash = crate::hash::hash_blob(&data);
                if hash != entry.hash {
                    tracing::trace!(name = %String::from_utf8_lossy(&entry.name), "entry content changed on refresh");
                    modified.push(entry.name.clone());
                }
                entry.hash = hash;
                refresh_stat_fields(entry, &meta, config);
            }
            Err(_) => modified.push(entry.name.clone()),
        }
    }
    tracing::debug!(modified = modified.len(), "index refresh complete");
    modified
}

fn refresh_stat_fields(
    entry: &mut IndexEntry,
    meta: &std::fs::Metadata,
    _config: &Config,
) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        entry.ctime = crate::index::entry::Timespec {
            sec: meta.ctime().max(0) as u32,
            nsec: meta.ctime_nsec().max(0) as u32,
        };
        entry.mtime = crate::index::entry::Timespec {
            sec: meta.mtime().max(0) as u32,
            nsec: meta.mtime_nsec().max(0) as u32,
        };
        entry.dev = meta.dev() as u32;
        entry.ino = meta.ino() as u32;
        entry.uid = meta.uid();
        entry.gid = meta.gid();
    }
    entry.size = meta.len() as u32;
}

fn path_from_bytes(name: &[u8]) -> &std::path::Path {
    std::path::Path::new(std::str::from_utf8(name).unwrap_or(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_blob;
    use crate::index::entry::EntryMode;

    fn entry(name: &str) -> IndexEntry {
        IndexEntry::new(name, EntryMode::Regular { executable: false }, hash_blob(name.as_bytes()))
    }

    #[test]
    fn insert_keeps_sorted_order() {
        let config = Config::default();
        let mut entries = Vec::new();
        insert(&mut entries, entry("b"), InsertOptions::empty(), &config).unwrap();
        insert(&mut entries, entry("a"), InsertOptions::empty(), &config).unwrap();
        insert(&mut entries, entry("c"), InsertOptions::empty(), &config).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn insert_rejects_invalid_path() {
        let config = Config::default();
        let mut entries = Vec::new();
        let err = insert(&mut entries, entry("../escape"), InsertOptions::empty(), &config).unwrap_err();
        assert!(matches!(err, IndexError::InvalidPath { .. }));
    }

    #[test]
    fn file_then_subpath_conflicts() {
        let config = Config::default();
        let mut entries = Vec::new();
        insert(&mut entries, entry("a"), InsertOptions::empty(), &config).unwrap();
        let err = insert(&mut entries, entry("a/b"), InsertOptions::empty(), &config).unwrap_err();
        assert!(matches!(err, IndexError::Conflict { .. }));
    }

    #[test]
    fn subpath_then_file_conflicts() {
        let config = Config::default();
        let mut entries = Vec::new();
        insert(&mut entries, entry("a/b"), InsertOptions::empty(), &config).unwrap();
        let err = insert(&mut entries, entry("a"), InsertOptions::empty(), &config).unwrap_err();
        assert!(matches!(err, IndexError::Conflict { .. }));
    }

    #[test]
    fn ok_to_replace_permits_exact_stage_collision() {
        let config = Config::default();
        let mut entries = Vec::new();
        insert(&mut entries, entry("a/b"), InsertOptions::empty(), &config).unwrap();
        insert(&mut entries, entry("a/b"), InsertOptions::OK_TO_REPLACE, &config).unwrap();
    }

    /// §8 concrete scenario 2: insert `"a/b"`, then `"a"` with
    /// `OK_TO_REPLACE`: `"a/b"` is removed; the array contains exactly `"a"`.
    #[test]
    fn ok_to_replace_removes_colliding_subpath() {
        let config = Config::default();
        let mut entries = Vec::new();
        insert(&mut entries, entry("a/b"), InsertOptions::empty(), &config).unwrap();
        insert(&mut entries, entry("a"), InsertOptions::OK_TO_REPLACE, &config).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, b"a".to_vec());
    }

    /// §8 concrete scenario 1: insert `"a"`, then `"a/b"`: the second insert
    /// fails with `Conflict` and the array still contains exactly `"a"`.
    #[test]
    fn file_then_subpath_rejected_without_replace() {
        let config = Config::default();
        let mut entries = Vec::new();
        insert(&mut entries, entry("a"), InsertOptions::empty(), &config).unwrap();
        let err = insert(&mut entries, entry("a/b"), InsertOptions::empty(), &config).unwrap_err();
        assert!(matches!(err, IndexError::Conflict { .. }));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, b"a".to_vec());
    }

    /// Symmetric replace direction: `"a"` tracked as a file, then `"a/b"`
    /// inserted with `OK_TO_REPLACE`, removes `"a"`.
    #[test]
    fn ok_to_replace_removes_colliding_file_for_subpath_insert() {
        let config = Config::default();
        let mut entries = Vec::new();
        insert(&mut entries, entry("a"), InsertOptions::empty(), &config).unwrap();
        insert(&mut entries, entry("a/b"), InsertOptions::OK_TO_REPLACE, &config).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, b"a/b".to_vec());
    }

    #[test]
    fn stage0_insert_clears_conflict_stages() {
        let config = Config::default();
        let mut entries = Vec::new();
        let mut base = entry("a");
        base.stage = Stage::Base;
        let mut ours = entry("a");
        ours.stage = Stage::Ours;
        insert(&mut entries, base, InsertOptions::empty(), &config).unwrap();
        insert(&mut entries, ours, InsertOptions::empty(), &config).unwrap();
        assert_eq!(entries.len(), 2);

        insert(&mut entries, entry("a"), InsertOptions::OK_TO_REPLACE, &config).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].stage, Stage::Merged);
    }

    #[test]
    fn ignorecase_file_then_subpath_conflicts_across_case() {
        let mut config = Config::default();
        config.core_ignorecase = true;
        let mut entries = Vec::new();
        insert(&mut entries, entry("A"), InsertOptions::empty(), &config).unwrap();
        let err = insert(&mut entries, entry("a/b"), InsertOptions::empty(), &config).unwrap_err();
        assert!(matches!(err, IndexError::Conflict { .. }));
    }

    /// `has_dir_name` must only treat a stage-0 ancestor as a file/directory
    /// clash, with or without `core.ignorecase`: an unresolved-merge entry at
    /// some other stage isn't a tracked file at this path yet.
    #[test]
    fn ignorecase_dir_name_check_ignores_non_merged_stage_ancestor() {
        let mut config = Config::default();
        config.core_ignorecase = true;
        let mut entries = Vec::new();
        let mut ours = entry("A");
        ours.stage = Stage::Ours;
        entries.push(ours);
        insert(&mut entries, entry("a/b"), InsertOptions::empty(), &config).unwrap();
        assert!(entries.iter().any(|e| e.name == b"a/b".to_vec()));
    }

    #[test]
    fn remove_deletes_matching_entry() {
        let config = Config::default();
        let mut entries = Vec::new();
        insert(&mut entries, entry("a"), InsertOptions::empty(), &config).unwrap();
        assert!(remove(&mut entries, b"a", Stage::Merged));
        assert!(entries.is_empty());
        assert!(!remove(&mut entries, b"a", Stage::Merged));
    }
}
