//! Stat-based dirty detection and the racy-clean problem (§4.1).
//!
//! Grounded on `ce_match_stat_basic`/`ie_match_stat`/`ie_modified` in
//! read-cache.c: before re-hashing a file's content, check whether its
//! recorded stat info still matches disk. A mismatch in any trusted field is
//! conclusive evidence of a change; a *match* is only conclusive if the
//! file's mtime is strictly before the index's own timestamp — otherwise the
//! file could have been rewritten in the same clock tick the index was
//! written in, and the match is "racily clean": trusted for now, but not
//! something a future read is allowed to rely on without a full re-read.

use crate::config::Config;
use crate::index::entry::{EntryMode, IndexEntry, Timespec};
use std::fs::Metadata;

// Bitset returned by `match_stat_basic`, named after the fields `ce_match_stat_basic` checks.
pub const MODE_CHANGED: u32 = 1 << 0;
pub const CTIME_CHANGED: u32 = 1 << 1;
pub const MTIME_CHANGED: u32 = 1 << 2;
pub const OWNER_CHANGED: u32 = 1 << 3;
pub const SIZE_CHANGED: u32 = 1 << 4;
pub const TYPE_CHANGED: u32 = 1 << 5;
pub const INODE_CHANGED: u32 = 1 << 6;

#[cfg(unix)]
fn stat_timespecs(meta: &Metadata) -> (Timespec, Timespec) {
    use std::os::unix::fs::MetadataExt;
    let ctime = Timespec {
        sec: meta.ctime().max(0) as u32,
        nsec: meta.ctime_nsec().max(0) as u32,
    };
    let mtime = Timespec {
        sec: meta.mtime().max(0) as u32,
        nsec: meta.mtime_nsec().max(0) as u32,
    };
    (ctime, mtime)
}

#[cfg(not(unix))]
fn stat_timespecs(meta: &Metadata) -> (Timespec, Timespec) {
    let to_ts = |t: std::io::Result<std::time::SystemTime>| -> Timespec {
        t.ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| Timespec {
                sec: d.as_secs() as u32,
                nsec: d.subsec_nanos(),
            })
            .unwrap_or_default()
    };
    (to_ts(meta.created()), to_ts(meta.modified()))
}

#[cfg(unix)]
fn stat_dev_ino(meta: &Metadata) -> (u32, u32) {
    use std::os::unix::fs::MetadataExt;
    (meta.dev() as u32, meta.ino() as u32)
}

#[cfg(not(unix))]
fn stat_dev_ino(_meta: &Metadata) -> (u32, u32) {
    (0, 0)
}

#[cfg(unix)]
fn stat_uid_gid(meta: &Metadata) -> (u32, u32) {
    use std::os::unix::fs::MetadataExt;
    (meta.uid(), meta.gid())
}

#[cfg(not(unix))]
fn stat_uid_gid(_meta: &Metadata) -> (u32, u32) {
    (0, 0)
}

fn entry_mode_matches(entry_mode: EntryMode, meta: &Metadata, trust_filemode: bool) -> bool {
    let on_disk = if meta.is_symlink() {
        EntryMode::Symlink
    } else if meta.is_dir() {
        EntryMode::Gitlink
    } else {
        #[cfg(unix)]
        let executable = {
            use std::os::unix::fs::PermissionsExt;
            meta.permissions().mode() & 0o111 != 0
        };
        #[cfg(not(unix))]
        let executable = false;
        EntryMode::Regular { executable }
    };

    match (entry_mode, on_disk) {
        (EntryMode::Regular { executable: a }, EntryMode::Regular { executable: b }) => {
            !trust_filemode || a == b
        }
        (a, b) => a == b,
    }
}

/// `ce_match_stat_basic`: compare an entry's recorded stat info against a
/// fresh `stat()`, without touching file content. Returns a bitset of
/// `*_CHANGED` flags; zero means "matches, modulo the racy-clean caveat".
pub fn match_stat_basic(entry: &IndexEntry, meta: &Metadata, config: &Config) -> u32 {
    let mut changed = 0u32;

    if !entry_mode_matches(entry.mode, meta, config.core_filemode) {
        changed |= MODE_CHANGED | TYPE_CHANGED;
    }

    let (ctime, mtime) = stat_timespecs(meta);
    if config.core_trust_ctime && entry.ctime != ctime {
        changed |= CTIME_CHANGED;
    }
    if entry.mtime != mtime {
        changed |= MTIME_CHANGED;
    }

    let (dev, ino) = stat_dev_ino(meta);
    if entry.ino != ino {
        changed |= INODE_CHANGED;
    }
    if config.core_trust_stat_dev && entry.dev != dev {
        changed |= INODE_CHANGED;
    }

    let (uid, gid) = stat_uid_gid(meta);
    if entry.uid != uid || entry.gid != gid {
        changed |= OWNER_CHANGED;
    }

    if matches!(entry.mode, EntryMode::Regular { .. }) && entry.size as u64 != meta.len() {
        changed |= SIZE_CHANGED;
    }

    changed
}

/// `ie_match_stat` / racy-clean handling: a file is trusted unmodified only
/// if `match_stat_basic` found nothing *and* its mtime could not coincide
/// with the index write. A file whose mtime equals (or is after) the index's
/// own timestamp is "racily clean": stat alone cannot tell us it's
/// unmodified, so the caller must fall back to re-hashing content.
pub fn is_racily_clean(entry: &IndexEntry, index_timestamp: Option<Timespec>) -> bool {
    match index_timestamp {
        Some(ts) => !(entry.mtime < ts),
        None => false,
    }
}

/// Full modification check: stat mismatch is conclusive; otherwise fall back
/// to content comparison (supplied by the caller, since content access needs
/// the working tree reader) only when the entry is racily clean.
pub fn is_modified_on_disk(entry: &IndexEntry, meta: &Metadata) -> bool {
    let config = Config::default();
    match_stat_basic(entry, meta, &config) != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::ObjectHash;
    use std::io::Write;

    fn entry_for(meta: &Metadata, name: &str) -> IndexEntry {
        let (ctime, mtime) = stat_timespecs(meta);
        let (dev, ino) = stat_dev_ino(meta);
        let (uid, gid) = stat_uid_gid(meta);
        IndexEntry {
            ctime,
            mtime,
            dev,
            ino,
            mode: EntryMode::Regular { executable: false },
            uid,
            gid,
            size: meta.len() as u32,
            hash: ObjectHash::ZERO,
            stage: crate::index::entry::Stage::Merged,
            assume_valid: false,
            name: name.as_bytes().to_vec(),
        }
    }

    #[test]
    fn matching_stat_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"hello").unwrap();
        drop(f);

        let meta = std::fs::symlink_metadata(&path).unwrap();
        let entry = entry_for(&meta, "f");
        let config = Config::default();
        assert_eq!(match_stat_basic(&entry, &meta, &config), 0);
    }

    #[test]
    fn size_change_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"hello").unwrap();
        let meta = std::fs::symlink_metadata(&path).unwrap();
        let mut entry = entry_for(&meta, "f");
        entry.size = 999;

        let config = Config::default();
        assert_ne!(match_stat_basic(&entry, &meta, &config) & SIZE_CHANGED, 0);
    }

    #[test]
    fn racily_clean_when_mtime_not_before_index_write() {
        let entry_ts = Timespec { sec: 100, nsec: 0 };
        let entry = IndexEntry {
            mtime: entry_ts,
            ..entry_for_zero()
        };
        assert!(is_racily_clean(&entry, Some(Timespec { sec: 100, nsec: 0 })));
        assert!(!is_racily_clean(&entry, Some(Timespec { sec: 101, nsec: 0 })));
        assert!(!is_racily_clean(&entry, None));
    }

    fn entry_for_zero() -> IndexEntry {
        IndexEntry::new("f", EntryMode::Regular { executable: false }, ObjectHash::ZERO)
    }
}
