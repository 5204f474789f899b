//! Formatters (§4.5): consumers that walk the queue after the pipeline has
//! run and render it one way or another. Each formatter is a free function
//! taking `&mut DiffContext` (some need `fill`, which requires `&mut`) plus
//! whatever knobs it needs, and a `Write` sink — mirroring the teacher's
//! preference for plain functions over a formatter trait object, since each
//! one has a genuinely different signature (a patch writer wants a
//! `Write`, patch-id wants to return a hash, stat wants a width).

pub mod binary;
pub mod check;
pub mod dirstat;
pub mod patch;
pub mod patch_id;
pub mod stat;
pub mod word_diff;

use crate::filepair::FilePair;
use crate::filespec::FileSpec;
use std::path::Path;

/// `fill_mmfile` (§4.5): materialise a FileSpec's bytes into a view, or an
/// empty slice for an invalid (absent) side.
pub(crate) fn fill_mmfile<'a>(spec: &'a mut FileSpec, root: &Path) -> &'a [u8] {
    if !spec.is_valid() {
        return &[];
    }
    spec.fill(root).unwrap_or(&[])
}

/// Public entry point for callers outside this crate's own formatters (the
/// inspection binary's word-diff branch) that need the same lazy-fill.
pub fn fill_mmfile_pub<'a>(spec: &'a mut FileSpec, root: &Path) -> &'a [u8] {
    fill_mmfile(spec, root)
}

/// The `a/`/`b/` display path pair a header line uses, quoted per §6.
pub(crate) fn header_paths(pair: &FilePair) -> (String, String) {
    let src = if pair.pre.is_valid() {
        &pair.pre.path
    } else {
        &pair.post.path
    };
    let dst = if pair.post.is_valid() {
        &pair.post.path
    } else {
        &pair.pre.path
    };
    (
        crate::path::quote_c_style(src),
        crate::path::quote_c_style(dst),
    )
}

pub(crate) fn mode_octal(mode: Option<crate::index::EntryMode>) -> String {
    match mode {
        Some(m) => format!("{:06o}", m.to_raw()),
        None => "000000".to_string(),
    }
}
