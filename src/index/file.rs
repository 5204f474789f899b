//! On-disk index format: header, sorted entries, extensions, trailing hash
//! (§3 Index File Layout, §4.1 Read/Write/Discard).
//!
//! The original keeps entries as pointers into an mmap of the whole file and
//! documents "discarding invalidates every entry pointer" as a caller
//! contract rather than something the type system enforces (§9). We mmap the
//! file read-only to avoid a double-buffered read of potentially large
//! indices, but copy each entry out into an owned `IndexEntry` as we parse —
//! the index's `Vec<IndexEntry>` then has no lifetime tied to the mapping at
//! all, which gets us the "invalidation is impossible, not just documented"
//! version of the same contract. `discard` still exists, and still drops the
//! mapping and the cache-tree, for API parity with the spec.

use crate::error::IndexError;
use crate::hash::{ObjectHash, RunningHash, HASH_LEN};
use crate::index::entry::{EntryMode, IndexEntry, Stage, Timespec};
use bytes::{Buf, BufMut, BytesMut};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const SIGNATURE: &[u8; 4] = b"DIRC";
const VERSION: u32 = 2;
const HEADER_LEN: usize = 12;
const ENTRY_FIXED_LEN: usize = 62; // everything up to (and including) the name-length flags

/// `TREE` cache-tree extension: payload kept opaque, as the spec requires.
pub const EXT_TAG_TREE: &[u8; 4] = b"TREE";

/// One `{tag, payload}` extension section, read back byte-exact.
#[derive(Debug, Clone)]
pub struct Extension {
    pub tag: [u8; 4],
    pub payload: Vec<u8>,
}

impl Extension {
    /// Uppercase first letter: optional, skip-with-warning if unrecognised.
    /// Lowercase first letter: mandatory, fatal if unrecognised.
    pub fn is_mandatory(&self) -> bool {
        self.tag[0].is_ascii_lowercase()
    }

    pub fn tag_str(&self) -> String {
        String::from_utf8_lossy(&self.tag).into_owned()
    }
}

/// The parsed on-disk index: entries plus whatever extensions we round-trip.
pub struct IndexFile {
    pub version: u32,
    pub entries: Vec<IndexEntry>,
    pub extensions: Vec<Extension>,
    /// The index file's own mtime at the time it was read, used by the
    /// racy-clean check (§4.1): an entry can only be racily clean if its
    /// mtime is not provably *after* this timestamp.
    pub timestamp: Option<Timespec>,
    path: Option<PathBuf>,
}

impl Default for IndexFile {
    fn default() -> Self {
        Self {
            version: VERSION,
            entries: Vec::new(),
            extensions: Vec::new(),
            timestamp: None,
            path: None,
        }
    }
}

impl IndexFile {
    /// Read and validate an index file. A missing file is not an error: it
    /// is an empty index (§7: "for reads, a missing index returns 'empty'
    /// rather than error").
    pub fn read(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "reading index");
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "index missing, treating as empty");
                return Ok(IndexFile {
                    path: Some(path.to_path_buf()),
                    ..Default::default()
                })
            }
            Err(source) => {
                return Err(IndexError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let meta = file.metadata().map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if meta.len() == 0 {
            return Ok(IndexFile {
                path: Some(path.to_path_buf()),
                ..Default::default()
            });
        }

        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let bytes = &mmap[..];

        let corrupt = |reason: &str| IndexError::Corrupt {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        if bytes.len() < HEADER_LEN + HASH_LEN {
            return Err(corrupt("file shorter than header + trailer"));
        }

        let (header, rest) = bytes.split_at(HEADER_LEN);
        if &header[0..4] != SIGNATURE {
            return Err(corrupt("bad signature"));
        }
        let version = u32::from_be_bytes(header[4..8].try_into().unwrap());
        if version != VERSION {
            return Err(corrupt("unsupported version"));
        }
        let entry_count = u32::from_be_bytes(header[8..12].try_into().unwrap());

        let (body, trailer) = bytes.split_at(bytes.len() - HASH_LEN);
        let expected_hash =
            ObjectHash::from_bytes(trailer).ok_or_else(|| corrupt("malformed trailer"))?;
        let mut hasher = RunningHash::new();
        hasher.update(body);
        let actual_hash = hasher.finalize();
        if actual_hash != expected_hash {
            return Err(corrupt("trailing checksum mismatch"));
        }

        // `rest` still carries the trailer at its tail; derive the entry/extension
        // region from `body` (header..end-of-checksum) instead so we never read past it.
        let _ = rest;
        let mut cursor = &body[HEADER_LEN..];

        let mut entries = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let (entry, consumed) = parse_entry(cursor).ok_or_else(|| corrupt("bad entry"))?;
            entries.push(entry);
            cursor = &cursor[consumed..];
        }

        let mut extensions = Vec::new();
        while !cursor.is_empty() {
            if cursor.len() < 8 {
                return Err(corrupt("truncated extension header"));
            }
            let tag: [u8; 4] = cursor[0..4].try_into().unwrap();
            let len = u32::from_be_bytes(cursor[4..8].try_into().unwrap()) as usize;
            if cursor.len() < 8 + len {
                return Err(corrupt("truncated extension payload"));
            }
            let payload = cursor[8..8 + len].to_vec();
            let ext = Extension { tag, payload };
            if ext.is_mandatory() && ext.tag != *EXT_TAG_TREE {
                return Err(IndexError::UnknownMandatoryExtension {
                    path: path.to_path_buf(),
                    tag: ext.tag_str(),
                });
            }
            extensions.push(ext);
            cursor = &cursor[8 + len..];
        }

        let timestamp = meta.modified().ok().map(system_time_to_timespec);

        tracing::debug!(path = %path.display(), entries = entries.len(), extensions = extensions.len(), "index read complete");
        Ok(IndexFile {
            version,
            entries,
            extensions,
            timestamp,
            path: Some(path.to_path_buf()),
        })
    }

    /// Write the index to a fresh temp file and rename it into place, so a
    /// crash mid-write never leaves a half-written index (§4.1 Write).
    pub fn write(&mut self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), entries = self.entries.len(), "writing index");
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let tmp_path = dir.join(format!(
            ".index.lock.{}",
            std::process::id()
        ));

        self.smudge_racy_entries();

        let live_entries: Vec<&IndexEntry> =
            self.entries.iter().filter(|e| !e.mode.is_zero()).collect();

        let mut buf = BytesMut::with_capacity(8192);
        let mut hasher = RunningHash::new();

        buf.put_slice(SIGNATURE);
        buf.put_u32(self.version);
        buf.put_u32(live_entries.len() as u32);

        let mut file = File::create(&tmp_path).map_err(|source| IndexError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        flush_chunk(&mut file, &mut hasher, &mut buf, &tmp_path)?;

        for entry in live_entries {
            serialize_entry(entry, &mut buf);
            if buf.len() >= 8192 {
                flush_chunk(&mut file, &mut hasher, &mut buf, &tmp_path)?;
            }
        }

        for ext in &self.extensions {
            buf.put_slice(&ext.tag);
            buf.put_u32(ext.payload.len() as u32);
            buf.put_slice(&ext.payload);
            if buf.len() >= 8192 {
                flush_chunk(&mut file, &mut hasher, &mut buf, &tmp_path)?;
            }
        }
        flush_chunk(&mut file, &mut hasher, &mut buf, &tmp_path)?;

        let trailer = hasher.finalize();
        file.write_all(&trailer.0).map_err(|source| IndexError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        file.sync_all().ok();
        drop(file);

        std::fs::rename(&tmp_path, path).map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.path = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "index write complete");
        Ok(())
    }

    /// Unmap and drop all in-memory state. Because entries are owned (not
    /// mmap-borrowed) in this implementation, nothing downstream is actually
    /// invalidated by this call; it exists for API parity with the spec and
    /// so callers that assume "discard invalidates views" remain correct
    /// even if a future revision goes back to zero-copy parsing.
    pub fn discard(&mut self) {
        self.entries.clear();
        self.extensions.clear();
        self.timestamp = None;
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write-time smudge (§4.1): any entry whose mtime equals this index's
    /// own timestamp and which a fresh stat+content check shows as modified
    /// has its recorded size zeroed, forcing the next read's basic check to
    /// mismatch and trigger a re-hash instead of trusting a stale "clean".
    fn smudge_racy_entries(&mut self) {
        let Some(ts) = self.timestamp else { return };
        for entry in &mut self.entries {
            if entry.mtime == ts {
                if let Ok(meta) = std::fs::symlink_metadata(path_as_os_str(&entry.name)) {
                    if super::stat::is_modified_on_disk(entry, &meta) {
                        entry.size = 0;
                    }
                }
            }
        }
    }
}

fn path_as_os_str(name: &[u8]) -> &Path {
    Path::new(std::str::from_utf8(name).unwrap_or(""))
}

fn system_time_to_timespec(t: SystemTime) -> Timespec {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => Timespec {
            sec: d.as_secs() as u32,
            nsec: d.subsec_nanos(),
        },
        Err(_) => Timespec::default(),
    }
}

fn flush_chunk(
    file: &mut File,
    hasher: &mut RunningHash,
    buf: &mut BytesMut,
    path: &Path,
) -> Result<(), IndexError> {
    hasher.update(buf);
    file.write_all(buf).map_err(|source| IndexError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    buf.clear();
    Ok(())
}

fn parse_entry(bytes: &[u8]) -> Option<(IndexEntry, usize)> {
    if bytes.len() < ENTRY_FIXED_LEN {
        return None;
    }
    let mut cur = bytes;
    let ctime_sec = cur.get_u32();
    let ctime_nsec = cur.get_u32();
    let mtime_sec = cur.get_u32();
    let mtime_nsec = cur.get_u32();
    let dev = cur.get_u32();
    let ino = cur.get_u32();
    let mode_raw = cur.get_u32();
    let uid = cur.get_u32();
    let gid = cur.get_u32();
    let size = cur.get_u32();
    if cur.remaining() < HASH_LEN + 2 {
        return None;
    }
    let mut hash_bytes = [0u8; HASH_LEN];
    cur.copy_to_slice(&mut hash_bytes);
    let hash = ObjectHash(hash_bytes);

    let flags = cur.get_u16();
    let stage = Stage::from_u16(flags >> 12);
    let assume_valid = flags & 0x8000 != 0;
    let name_len = (flags & 0x0fff) as usize;

    let remaining = cur;
    let name_end = if name_len < 0x0fff {
        if remaining.len() <= name_len || remaining[name_len] != 0 {
            return None;
        }
        name_len
    } else {
        remaining.iter().position(|&b| b == 0)?
    };
    let name = remaining[..name_end].to_vec();

    let consumed_before_pad = ENTRY_FIXED_LEN + name_end + 1;
    let padding = (8 - (consumed_before_pad % 8)) % 8;
    let total_consumed = consumed_before_pad + padding;
    if bytes.len() < total_consumed {
        return None;
    }

    let entry = IndexEntry {
        ctime: Timespec {
            sec: ctime_sec,
            nsec: ctime_nsec,
        },
        mtime: Timespec {
            sec: mtime_sec,
            nsec: mtime_nsec,
        },
        dev,
        ino,
        mode: EntryMode::from_raw(mode_raw),
        uid,
        gid,
        size,
        hash,
        stage,
        assume_valid,
        name,
    };
    Some((entry, total_consumed))
}

fn serialize_entry(entry: &IndexEntry, buf: &mut BytesMut) {
    buf.put_u32(entry.ctime.sec);
    buf.put_u32(entry.ctime.nsec);
    buf.put_u32(entry.mtime.sec);
    buf.put_u32(entry.mtime.nsec);
    buf.put_u32(entry.dev);
    buf.put_u32(entry.ino);
    buf.put_u32(entry.mode.to_raw());
    buf.put_u32(entry.uid);
    buf.put_u32(entry.gid);
    buf.put_u32(entry.size);
    buf.put_slice(&entry.hash.0);

    let name_len = entry.name.len().min(0x0fff) as u16;
    let mut flags = (entry.stage.as_u16()) << 12;
    if entry.assume_valid {
        flags |= 0x8000;
    }
    flags |= name_len;
    buf.put_u16(flags);

    buf.put_slice(&entry.name);
    buf.put_u8(0);

    let consumed_before_pad = ENTRY_FIXED_LEN + entry.name.len() + 1;
    let padding = (8 - (consumed_before_pad % 8)) % 8;
    buf.put_bytes(0, padding);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_blob;

    fn sample_entry(name: &str) -> IndexEntry {
        IndexEntry::new(
            name,
            EntryMode::Regular { executable: false },
            hash_blob(name.as_bytes()),
        )
    }

    #[test]
    fn empty_index_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        let mut index = IndexFile::default();
        index.write(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        // header(12) + trailer(20), no entries.
        assert_eq!(bytes.len(), 32);

        let read_back = IndexFile::read(&path).unwrap();
        assert_eq!(read_back.entries.len(), 0);
        assert_eq!(read_back.version, VERSION);
    }

    #[test]
    fn missing_index_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist");
        let index = IndexFile::read(&path).unwrap();
        assert!(index.entries.is_empty());
    }

    #[test]
    fn round_trip_preserves_entries_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");

        let mut index = IndexFile::default();
        index.entries.push(sample_entry("a"));
        index.entries.push(sample_entry("b/c"));
        index.entries.push(sample_entry("b/d"));
        index.write(&path).unwrap();

        let read_back = IndexFile::read(&path).unwrap();
        assert_eq!(read_back.entries.len(), 3);
        assert_eq!(read_back.entries[0].name, b"a");
        assert_eq!(read_back.entries[1].name, b"b/c");
        assert_eq!(read_back.entries[2].name, b"b/d");
        assert_eq!(read_back.entries[0].hash, index_entry_hash("a"));
    }

    fn index_entry_hash(name: &str) -> ObjectHash {
        hash_blob(name.as_bytes())
    }

    #[test]
    fn long_name_round_trips_via_nul_terminator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        let long_name = "d/".repeat(2048) + "file";
        assert!(long_name.len() >= 0x0fff);

        let mut index = IndexFile::default();
        index.entries.push(sample_entry(&long_name));
        index.write(&path).unwrap();

        let read_back = IndexFile::read(&path).unwrap();
        assert_eq!(read_back.entries.len(), 1);
        assert_eq!(read_back.entries[0].name, long_name.as_bytes());
    }

    #[test]
    fn corrupt_signature_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        let mut index = IndexFile::default();
        index.write(&path).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] = b'X';
        std::fs::write(&path, &bytes).unwrap();

        let err = IndexFile::read(&path).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt { .. }));
    }

    #[test]
    fn corrupt_checksum_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        let mut index = IndexFile::default();
        index.entries.push(sample_entry("a"));
        index.write(&path).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        std::fs::write(&path, &bytes).unwrap();

        let err = IndexFile::read(&path).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt { .. }));
    }

    #[test]
    fn unknown_mandatory_extension_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        let mut index = IndexFile::default();
        index.extensions.push(Extension {
            tag: *b"zzzz",
            payload: vec![1, 2, 3],
        });
        index.write(&path).unwrap();

        let err = IndexFile::read(&path).unwrap_err();
        assert!(matches!(err, IndexError::UnknownMandatoryExtension { .. }));
    }

    #[test]
    fn unknown_optional_extension_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        let mut index = IndexFile::default();
        index.extensions.push(Extension {
            tag: *b"Zzzz",
            payload: vec![1, 2, 3],
        });
        index.write(&path).unwrap();

        let read_back = IndexFile::read(&path).unwrap();
        assert_eq!(read_back.extensions.len(), 1);
    }
}
