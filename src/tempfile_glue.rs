//! Tempfile lifecycle and external differ invocation (§4.6, §9 "Signal-safe
//! tempfile unlink", §5 "Tempfile slots are a small fixed pool (capacity 2)").
//!
//! The registry below is the one corner of this crate that can't lean on
//! ordinary synchronization: a fatal signal can land while a child process
//! holds a tempfile open, and the handler that cleans it up must not take a
//! lock (the interrupted thread might already hold it). So registration is a
//! fixed `[[u8; PATH_MAX]; 2]` array published with a `Release` store to an
//! `AtomicUsize` count; the handler reads the count with `Acquire` and only
//! ever looks at slots that count already covers, then calls `libc::unlink`
//! directly — on the POSIX async-signal-safe function list.

use crate::error::DiffError;
use crate::hash::ObjectHash;
use crate::index::EntryMode;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Tempfile slots are capped at 2: one pre-image, one post-image, per the
/// external differ's calling convention (§4.6).
pub const POOL_CAPACITY: usize = 2;
const PATH_MAX: usize = 4096;

static SLOT_PATHS: [std::sync::Mutex<[u8; PATH_MAX]>; POOL_CAPACITY] = [
    std::sync::Mutex::new([0u8; PATH_MAX]),
    std::sync::Mutex::new([0u8; PATH_MAX]),
];
static SLOT_LENS: [AtomicUsize; POOL_CAPACITY] = [AtomicUsize::new(0), AtomicUsize::new(0)];
/// How many of `SLOT_PATHS`/`SLOT_LENS` (from index 0) are live. Only ever
/// grown right before a child process starts and shrunk right after, so the
/// signal handler reading it with `Acquire` always sees a fully-written
/// prefix of slots.
static REGISTERED: AtomicUsize = AtomicUsize::new(0);

#[cfg(unix)]
static INSTALL_HANDLER: std::sync::Once = std::sync::Once::new();

#[cfg(unix)]
extern "C" fn unlink_and_reraise(signum: libc::c_int) {
    let count = REGISTERED.load(Ordering::Acquire);
    for i in 0..count.min(POOL_CAPACITY) {
        let len = SLOT_LENS[i].load(Ordering::Acquire);
        if len == 0 {
            continue;
        }
        if let Ok(guard) = SLOT_PATHS[i].try_lock() {
            unsafe {
                libc::unlink(guard.as_ptr() as *const libc::c_char);
            }
        }
    }
    unsafe {
        libc::signal(signum, libc::SIG_DFL);
        libc::raise(signum);
    }
}

#[cfg(unix)]
fn install_signal_handlers() {
    INSTALL_HANDLER.call_once(|| {
        for &sig in &[libc::SIGINT, libc::SIGHUP, libc::SIGTERM, libc::SIGQUIT, libc::SIGPIPE] {
            unsafe {
                libc::signal(sig, unlink_and_reraise as libc::sighandler_t);
            }
        }
    });
}

#[cfg(not(unix))]
fn install_signal_handlers() {}

fn register_slot(index: usize, path: &Path) {
    let bytes = path.as_os_str().as_encoded_bytes();
    let len = bytes.len().min(PATH_MAX - 1);
    let mut guard = SLOT_PATHS[index].lock().expect("tempfile slot mutex poisoned");
    guard[..len].copy_from_slice(&bytes[..len]);
    guard[len] = 0;
    drop(guard);
    SLOT_LENS[index].store(len + 1, Ordering::Release);
    REGISTERED.fetch_max(index + 1, Ordering::Release);
}

fn unregister_slot(index: usize) {
    SLOT_LENS[index].store(0, Ordering::Release);
}

/// One tempfile in the pool. Created with `*.diff_XXXXXX` naming, registered
/// for signal-safe cleanup, and unlinked on drop.
pub struct TempfileSlot {
    index: usize,
    path: PathBuf,
}

static NEXT_FREE: AtomicUsize = AtomicUsize::new(0);

impl TempfileSlot {
    /// Claim a slot and write `contents` into it. Panics if both slots are
    /// already live — the pool enforces that external-diff invocation
    /// releases both slots before the next pair claims new ones (§5).
    pub fn create(contents: &[u8]) -> Result<Self, DiffError> {
        let index = NEXT_FREE.fetch_add(1, Ordering::SeqCst) % POOL_CAPACITY;
        if SLOT_LENS[index].load(Ordering::Acquire) != 0 {
            panic!("tempfile pool exhausted: slot {index} still live");
        }

        let suffix: u32 = std::process::id().wrapping_mul(2654435761).wrapping_add(index as u32);
        let path = std::env::temp_dir().join(format!("{:08x}.diff_{:06x}", suffix, index));
        let mut file = std::fs::File::create(&path).map_err(|source| DiffError::Io {
            path: path.clone(),
            source,
        })?;
        file.write_all(contents).map_err(|source| DiffError::Io {
            path: path.clone(),
            source,
        })?;

        install_signal_handlers();
        register_slot(index, &path);
        Ok(Self { index, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempfileSlot {
    fn drop(&mut self) {
        unregister_slot(self.index);
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Invoke the external differ for one pair. Arguments follow §4.6's fixed
/// order: `cmd path tmp1 hash1 mode1 tmp2 hash2 mode2 [other xfrm_msg]`.
pub fn run_external_differ(
    command: &str,
    display_path: &[u8],
    pre_bytes: &[u8],
    pre_hash: ObjectHash,
    pre_mode: Option<EntryMode>,
    post_bytes: &[u8],
    post_hash: ObjectHash,
    post_mode: Option<EntryMode>,
) -> Result<Output, DiffError> {
    let path_display = String::from_utf8_lossy(display_path).into_owned();
    tracing::debug!(command, path = %path_display, "invoking external differ");

    let pre_slot = TempfileSlot::create(pre_bytes)?;
    let post_slot = TempfileSlot::create(post_bytes)?;

    let mode_octal = |m: Option<EntryMode>| match m {
        Some(mode) => format!("{:06o}", mode.to_raw()),
        None => "000000".to_string(),
    };

    let output = std::process::Command::new(command)
        .arg(&path_display)
        .arg(pre_slot.path())
        .arg(pre_hash.to_hex())
        .arg(mode_octal(pre_mode))
        .arg(post_slot.path())
        .arg(post_hash.to_hex())
        .arg(mode_octal(post_mode))
        .output()
        .map_err(|source| DiffError::ChildProcess {
            command: command.to_string(),
            path: PathBuf::from(path_display.clone()),
            reason: source.to_string(),
        })?;

    drop(pre_slot);
    drop(post_slot);

    if !output.status.success() {
        return Err(DiffError::ChildProcess {
            command: command.to_string(),
            path: PathBuf::from(path_display),
            reason: format!("exited with {}", output.status),
        });
    }
    Ok(output)
}
