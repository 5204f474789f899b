//! The index entry record (§3 Index Entry), the Rust-native in-memory shape
//! of the fixed-layout on-disk record. Grounded on the teacher's `IndexEntry`
//! (`index.rs`) but reworked: stage and name-length live in a single `Flags`
//! newtype instead of loose booleans, mode is a typed enum instead of two
//! raw `u16`s, and the hash is an `ObjectHash` instead of a hex `String`.

use crate::hash::ObjectHash;

/// The four merge stages an index entry can occupy for a given path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum Stage {
    /// Merged / normal entry.
    Merged = 0,
    Base = 1,
    Ours = 2,
    Theirs = 3,
}

impl Stage {
    pub fn from_u16(v: u16) -> Self {
        match v & 0b11 {
            0 => Stage::Merged,
            1 => Stage::Base,
            2 => Stage::Ours,
            _ => Stage::Theirs,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// The canonical entry modes named in §3: regular file (0644/0755), symlink
/// (0120000), gitlink (0160000), or tree (0040000, only ever seen transiently
/// while building a tree from the index — never stored on disk).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    Regular { executable: bool },
    Symlink,
    Gitlink,
    /// `mode == 0`: "this path is going away" — an unmerged placeholder used
    /// mid-insertion, never a legitimate resting state on disk.
    Unmerged,
}

impl EntryMode {
    pub const S_IFREG: u32 = 0o100000;
    pub const S_IFLNK: u32 = 0o120000;
    pub const S_IFGITLINK: u32 = 0o160000;

    pub fn from_raw(raw: u32) -> Self {
        if raw == 0 {
            return EntryMode::Unmerged;
        }
        match raw & 0o170000 {
            Self::S_IFLNK => EntryMode::Symlink,
            Self::S_IFGITLINK => EntryMode::Gitlink,
            _ => EntryMode::Regular {
                executable: raw & 0o100 != 0,
            },
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            EntryMode::Regular { executable } => {
                Self::S_IFREG | if executable { 0o755 } else { 0o644 }
            }
            EntryMode::Symlink => Self::S_IFLNK,
            EntryMode::Gitlink => Self::S_IFGITLINK,
            EntryMode::Unmerged => 0,
        }
    }

    pub fn is_zero(self) -> bool {
        matches!(self, EntryMode::Unmerged)
    }
}

/// ctime/mtime: seconds since the epoch plus a nanosecond offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timespec {
    pub sec: u32,
    pub nsec: u32,
}

/// One record in the staging index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub ctime: Timespec,
    pub mtime: Timespec,
    pub dev: u32,
    pub ino: u32,
    pub mode: EntryMode,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
    pub hash: ObjectHash,
    pub stage: Stage,
    pub assume_valid: bool,
    /// Repository-relative path, no leading/trailing slash, validated by
    /// `path::verify_path` on insertion.
    pub name: Vec<u8>,
}

impl IndexEntry {
    pub fn new(name: impl Into<Vec<u8>>, mode: EntryMode, hash: ObjectHash) -> Self {
        Self {
            ctime: Timespec::default(),
            mtime: Timespec::default(),
            dev: 0,
            ino: 0,
            mode,
            uid: 0,
            gid: 0,
            size: 0,
            hash,
            stage: Stage::Merged,
            assume_valid: false,
            name: name.into(),
        }
    }

    /// Key used for the index comparator: `(name, stage)`.
    pub fn key(&self) -> (&[u8], Stage) {
        (&self.name, self.stage)
    }
}

/// The index comparator named in §3: memcmp on the name up to the shorter
/// length, then shorter-name-first, then numerically by stage.
///
/// Grounded on `cache_name_compare`/`base_name_compare` in read-cache.c.
pub fn compare_names(a: &[u8], a_stage: Stage, b: &[u8], b_stage: Stage) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    let min_len = a.len().min(b.len());
    match a[..min_len].cmp(&b[..min_len]) {
        Ordering::Equal => match a.len().cmp(&b.len()) {
            Ordering::Equal => a_stage.as_u16().cmp(&b_stage.as_u16()),
            other => other,
        },
        other => other,
    }
}
