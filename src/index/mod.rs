//! The staging index: sorted entry list, merge stages, refresh and
//! file/directory conflict enforcement, backed by the DIRC on-disk format
//! (§3, §4.1-§4.3).

pub mod entry;
pub mod file;
pub mod ops;
pub mod stat;

pub use entry::{compare_names, EntryMode, IndexEntry, Stage, Timespec};
pub use file::{Extension, IndexFile};
pub use ops::InsertOptions;

use crate::config::Config;
use crate::error::IndexError;
use crate::path::Pathspec;
use std::path::{Path, PathBuf};

/// The in-memory staging index. Thin wrapper over `Vec<IndexEntry>` that
/// keeps the list sorted and enforces the invariants from §3/§4.3 on every
/// mutation; (de)serialization is delegated to `IndexFile`.
pub struct Index {
    entries: Vec<IndexEntry>,
    extensions: Vec<Extension>,
    timestamp: Option<Timespec>,
    path: Option<PathBuf>,
    /// `core.*` flags that steer insertion (`core.ignorecase` for the
    /// F/D-conflict checks) and stat comparison. Defaults to `Config::default()`
    /// until a caller supplies the repository's actual config via `set_config`.
    config: Config,
}

impl Default for Index {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            extensions: Vec::new(),
            timestamp: None,
            path: None,
            config: Config::default(),
        }
    }
}

impl Index {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let file = IndexFile::read(&path)?;
        Ok(Self {
            entries: file.entries,
            extensions: file.extensions,
            timestamp: file.timestamp,
            path: Some(path.as_ref().to_path_buf()),
            config: Config::default(),
        })
    }

    /// Install the `core.*` config (typically a `Repository`'s) that should
    /// steer later inserts and refreshes on this index.
    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    pub fn save(&mut self) -> Result<(), IndexError> {
        let path = self
            .path
            .clone()
            .expect("index has no backing path; use save_as");
        self.save_as(path)
    }

    pub fn save_as(&mut self, path: impl AsRef<Path> + Into<PathBuf>) -> Result<(), IndexError> {
        let path: PathBuf = path.into();
        let mut file = IndexFile {
            version: 2,
            entries: std::mem::take(&mut self.entries),
            extensions: std::mem::take(&mut self.extensions),
            timestamp: self.timestamp,
            ..Default::default()
        };
        file.write(&path)?;
        self.entries = std::mem::take(&mut file.entries);
        self.extensions = std::mem::take(&mut file.extensions);
        self.timestamp = file.timestamp;
        self.path = Some(path);
        Ok(())
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &[u8], stage: Stage) -> Option<&IndexEntry> {
        ops::name_pos(&self.entries, name, stage)
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn stages_for(&self, name: &[u8]) -> Vec<&IndexEntry> {
        ops::stages_for(&self.entries, name)
    }

    pub fn insert(&mut self, entry: IndexEntry, options: InsertOptions) -> Result<(), IndexError> {
        ops::insert(&mut self.entries, entry, options, &self.config)
    }

    pub fn remove(&mut self, name: &[u8], stage: Stage) -> bool {
        ops::remove(&mut self.entries, name, stage)
    }

    pub fn remove_all_stages(&mut self, name: &[u8]) {
        ops::remove_all_stages(&mut self.entries, name)
    }

    /// Entries restricted to `pathspec`, in sorted order.
    pub fn iter_matching<'a>(
        &'a self,
        pathspec: &'a Pathspec,
    ) -> impl Iterator<Item = &'a IndexEntry> + 'a {
        self.entries.iter().filter(move |e| pathspec.matches(&e.name))
    }

    /// True while any path has more than one stage present (an unresolved
    /// merge conflict).
    pub fn has_conflicts(&self) -> bool {
        self.entries.iter().any(|e| e.stage != Stage::Merged)
    }

    pub fn refresh(
        &mut self,
        config: &Config,
        read_file: impl Fn(&[u8]) -> std::io::Result<Vec<u8>>,
    ) -> Vec<Vec<u8>> {
        ops::refresh(&mut self.entries, config, self.timestamp, read_file)
    }
}
