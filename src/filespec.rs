//! One side of a diff (§3 FileSpec).
//!
//! The ownership tri-state from §9's design note ("owned / mmap / borrowed")
//! is expressed as `FileData`, an enum with one variant per storage kind;
//! `Drop` is whatever each variant's own field does on drop (a `Vec` frees
//! itself, an `Mmap` unmaps itself, `Borrowed` owns nothing) — no custom
//! `Drop` impl is needed on `FileSpec` itself.

use crate::driver::UserDiffDriver;
use crate::error::DiffError;
use crate::hash::{hash_blob, ObjectHash};
use crate::index::EntryMode;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Content backing a `FileSpec`. `Borrowed` covers both "points at a
/// `'static` literal" and "points at data someone else owns" use sites (e.g.
/// a textconv result handed down from a caller) via `Arc` sharing.
#[derive(Clone)]
pub enum FileData {
    Owned(Vec<u8>),
    Mmapped(Arc<memmap2::Mmap>),
    Borrowed(Arc<[u8]>),
}

impl FileData {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileData::Owned(v) => v,
            FileData::Mmapped(m) => &m[..],
            FileData::Borrowed(b) => b,
        }
    }
}

/// Tri-state binary classification (§3): unknown until the content is
/// inspected, then pinned to text or binary for the life of the FileSpec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binary {
    Unknown,
    Text,
    Binary,
}

/// One side of a `FilePair`. Absent sides (the "other" side of an add or
/// delete) are represented by `FileSpec::invalid`, not by `Option<FileSpec>`,
/// matching §3's "either invalid with mode==0, or valid" invariant directly
/// in the type rather than pushing the absent case up a level.
#[derive(Clone)]
pub struct FileSpec {
    pub path: Vec<u8>,
    pub mode: Option<EntryMode>,
    pub hash: ObjectHash,
    hash_valid: bool,
    pub size: Option<u64>,
    data: Option<FileData>,
    binary: Binary,
    pub driver: UserDiffDriver,
}

impl FileSpec {
    pub fn invalid(path: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            mode: None,
            hash: ObjectHash::ZERO,
            hash_valid: false,
            size: None,
            data: None,
            binary: Binary::Unknown,
            driver: UserDiffDriver::none(),
        }
    }

    pub fn from_hash(path: impl Into<Vec<u8>>, mode: EntryMode, hash: ObjectHash) -> Self {
        Self {
            path: path.into(),
            mode: Some(mode),
            hash,
            hash_valid: true,
            size: None,
            data: None,
            binary: Binary::Unknown,
            driver: UserDiffDriver::none(),
        }
    }

    pub fn from_bytes(path: impl Into<Vec<u8>>, mode: EntryMode, data: Vec<u8>) -> Self {
        let hash = hash_blob(&data);
        let size = data.len() as u64;
        Self {
            path: path.into(),
            mode: Some(mode),
            hash,
            hash_valid: true,
            size: Some(size),
            data: Some(FileData::Owned(data)),
            binary: Binary::Unknown,
            driver: UserDiffDriver::none(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.mode.is_some()
    }

    pub fn hash_valid(&self) -> bool {
        self.hash_valid
    }

    /// Read the working-tree file at `root.join(self.path)` into an owned
    /// buffer (§6: path `-` reads stdin and clears the hash to null, handled
    /// by the caller before this is reached — this covers the regular case).
    pub fn load_from_disk(&mut self, root: &Path) -> Result<(), DiffError> {
        if self.data.is_some() {
            return Ok(());
        }
        let full = root.join(path_from_bytes(&self.path));
        let bytes = std::fs::read(&full).map_err(|source| DiffError::Io {
            path: full.clone(),
            source,
        })?;
        self.size = Some(bytes.len() as u64);
        if !self.hash_valid {
            self.hash = hash_blob(&bytes);
            self.hash_valid = true;
        }
        self.data = Some(FileData::Owned(bytes));
        Ok(())
    }

    pub fn set_mmapped(&mut self, mmap: Arc<memmap2::Mmap>) {
        self.size = Some(mmap.len() as u64);
        self.data = Some(FileData::Mmapped(mmap));
    }

    /// Replace the diffable bytes with a textconv filter's stdout. Hash and
    /// size stay exactly as they were — textconv is a presentation transform,
    /// not a change of object identity (§4.7).
    pub fn set_textconv_bytes(&mut self, data: Vec<u8>) {
        self.data = Some(FileData::Owned(data));
        self.binary = Binary::Unknown;
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.data.as_ref().map(FileData::as_bytes)
    }

    /// `fill_mmfile` (§4.5): materialise bytes if not already resident.
    pub fn fill(&mut self, root: &Path) -> Result<&[u8], DiffError> {
        self.load_from_disk(root)?;
        Ok(self.bytes().expect("just loaded"))
    }

    /// Tri-state binary classification, computed once: a forced driver
    /// override wins, otherwise scan for a NUL byte within the first 8000
    /// bytes the way a first-inspection content sniff conventionally does.
    pub fn is_binary(&mut self) -> Binary {
        if self.binary != Binary::Unknown {
            return self.binary;
        }
        if let Some(forced) = self.driver.is_binary_forced() {
            self.binary = if forced { Binary::Binary } else { Binary::Text };
            return self.binary;
        }
        let Some(data) = self.data.as_ref() else {
            return Binary::Unknown;
        };
        let sniff_len = data.as_bytes().len().min(8000);
        self.binary = if data.as_bytes()[..sniff_len].contains(&0) {
            Binary::Binary
        } else {
            Binary::Text
        };
        self.binary
    }
}

fn path_from_bytes(name: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(name).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_spec_has_no_mode() {
        let spec = FileSpec::invalid("a");
        assert!(!spec.is_valid());
    }

    #[test]
    fn from_bytes_computes_hash_and_size() {
        let spec = FileSpec::from_bytes("a", EntryMode::Regular { executable: false }, b"hello".to_vec());
        assert!(spec.hash_valid());
        assert_eq!(spec.size, Some(5));
        assert_eq!(spec.bytes(), Some(&b"hello"[..]));
    }

    #[test]
    fn binary_detection_scans_for_nul() {
        let mut text = FileSpec::from_bytes("a", EntryMode::Regular { executable: false }, b"hello\n".to_vec());
        assert_eq!(text.is_binary(), Binary::Text);

        let mut bin = FileSpec::from_bytes("b", EntryMode::Regular { executable: false }, vec![0u8, 1, 2]);
        assert_eq!(bin.is_binary(), Binary::Binary);
    }

    #[test]
    fn driver_override_wins_over_sniff() {
        let mut spec = FileSpec::from_bytes("a", EntryMode::Regular { executable: false }, b"plain text".to_vec());
        spec.driver.binary_override = Some(true);
        assert_eq!(spec.is_binary(), Binary::Binary);
    }

    #[test]
    fn load_from_disk_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, b"abc").unwrap();

        let mut spec = FileSpec::invalid("f.txt");
        spec.mode = Some(EntryMode::Regular { executable: false });
        spec.load_from_disk(dir.path()).unwrap();
        assert_eq!(spec.bytes(), Some(&b"abc"[..]));
        spec.load_from_disk(dir.path()).unwrap();
        assert_eq!(spec.bytes(), Some(&b"abc"[..]));
    }
}
