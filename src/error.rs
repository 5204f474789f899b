//! The error taxonomy named in the design: a typed variant per failure behaviour
//! rather than one grab-bag of strings. Glue code (the inspection binary,
//! `repository.rs`) still talks `anyhow::Result` the way the teacher's code
//! does; these are the errors library callers actually match on.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the staging index (read, write, insert, refresh).
#[derive(Debug, Error)]
pub enum IndexError {
    /// Header, version, entry framing, or trailing checksum did not check out.
    #[error("index file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// A mandatory (lowercase-tagged) extension this reader does not understand.
    #[error("index file {path} has unknown mandatory extension '{tag}'")]
    UnknownMandatoryExtension { path: PathBuf, tag: String },

    #[error("io error on index file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Insertion would create a file/directory conflict and replace was not permitted.
    #[error("'{path}' appears as both a file and as a directory")]
    Conflict { path: String },

    /// Path failed `verify_path`: contains `.`, `..`, `//`, or a `.git` component.
    #[error("invalid path '{path}'")]
    InvalidPath { path: String },
}

/// Errors raised by the diff engine (external differ, textconv, hashing).
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external diff command, or a textconv filter, exited non-zero or
    /// could not be spawned at all.
    #[error("external command '{command}' failed for {path}: {reason}")]
    ChildProcess {
        command: String,
        path: PathBuf,
        reason: String,
    },

    /// The tempfile pool (capacity 2) was exhausted; see the glue module.
    #[error("tempfile pool exhausted: {0} slots already live")]
    TempfilePoolExhausted(usize),

    #[error(transparent)]
    Index(#[from] IndexError),
}

pub type IndexResult<T> = Result<T, IndexError>;
pub type DiffResult<T> = Result<T, DiffError>;
