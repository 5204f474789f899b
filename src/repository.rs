//! Ambient-stack glue: locate the working tree root and the index file that
//! lives under it, and load the `diff.*`/`core.*` config that steers the
//! core (§6). The object store and reference storage the teacher's
//! `Repository` also managed are out of scope (§1); this is deliberately
//! thinner than `gitlet`'s version, grounded on the same "walk up looking
//! for the metadata directory" shape as `gitlet`'s `Repository::load`/`find`.

use crate::config::Config;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// The metadata directory name this crate looks for, analogous to `.git`.
pub const METADATA_DIR: &str = ".gitcore";

/// A located working tree: its root, its metadata directory, and the config
/// loaded from `<root>/.gitcore/config`, if present.
pub struct Repository {
    pub working_dir: PathBuf,
    pub metadata_dir: PathBuf,
    pub config: Config,
}

impl Repository {
    /// Walk up from `start` looking for a `.gitcore` directory.
    pub fn discover(start: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut path = start
            .as_ref()
            .canonicalize()
            .context("failed to canonicalize start path")?;
        loop {
            let candidate = path.join(METADATA_DIR);
            if candidate.is_dir() {
                return Self::at(path, candidate);
            }
            if !path.pop() {
                anyhow::bail!(
                    "not a gitcore working tree (or any parent): {}",
                    start.as_ref().display()
                );
            }
        }
    }

    /// Create a fresh `.gitcore` directory at `path` (enough structure to
    /// hold an index and a config file; no object store, no refs).
    pub fn init(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let working_dir = path.into();
        let metadata_dir = working_dir.join(METADATA_DIR);
        std::fs::create_dir_all(&metadata_dir).context("failed to create metadata directory")?;
        let config = Config::default();
        Ok(Self {
            working_dir,
            metadata_dir,
            config,
        })
    }

    fn at(working_dir: PathBuf, metadata_dir: PathBuf) -> anyhow::Result<Self> {
        let config_path = metadata_dir.join("config");
        let config = if config_path.exists() {
            let ini =
                ini::Ini::load_from_file(&config_path).context("failed to read config file")?;
            Config::from_ini(&ini)
        } else {
            Config::default()
        };
        Ok(Self {
            working_dir,
            metadata_dir,
            config,
        })
    }

    pub fn index_path(&self) -> PathBuf {
        self.metadata_dir.join("index")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_then_discover_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();

        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let repo = Repository::discover(&nested).unwrap();
        assert_eq!(
            repo.working_dir.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn discover_fails_outside_any_working_tree() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Repository::discover(dir.path()).is_err());
    }
}
