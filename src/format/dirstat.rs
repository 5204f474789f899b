//! Dirstat formatter (§4.5 "Dirstat"), grounded on `gather_dirstat`/
//! `show_dirstat`/`dirstat_compare` in `diff.c`: a recursive directory-damage
//! aggregation. Ported from the C's in-place array-walk shape to a Rust
//! slice-consuming recursion (`gather` shrinks the shared `&[DirstatFile]`
//! view from the front instead of advancing a pointer and a counter).

use crate::differ::LineDiffer;
use crate::filepair::FilePair;
use crate::format::{fill_mmfile, header_paths};
use crate::queue::DiffContext;
use std::path::Path;

#[derive(Debug, Clone)]
struct DirstatFile {
    name: String,
    changed: u64,
}

/// Per-file damage: `pre.size - copied + added`, byte-weighted (`diff.c`'s
/// default, non-`DIRSTAT_BY_FILE` mode, which this crate doesn't expose). For
/// an add/delete there's no diff to run; the damage is simply the size of
/// whichever side is valid (all of it counts as `added`, or all of it is lost
/// with nothing `copied`).
fn damage(pair: &mut FilePair, root: &Path) -> u64 {
    match (pair.pre.is_valid(), pair.post.is_valid()) {
        (true, true) => {
            let pre = fill_mmfile(&mut pair.pre, root).to_vec();
            let post = fill_mmfile(&mut pair.post, root).to_vec();
            let mut copied = 0usize;
            let mut added = 0usize;
            crate::differ::BuiltinDiffer.diff(
                &pre,
                &post,
                &crate::differ::DiffConfig::default(),
                &mut |line| match line {
                    crate::differ::DiffLine::Context(b) => copied += b.len(),
                    crate::differ::DiffLine::Added(b) => added += b.len(),
                    _ => {}
                },
            );
            (pre.len().saturating_sub(copied) + added) as u64
        }
        _ => {
            let pre_len = fill_mmfile(&mut pair.pre, root).len();
            let post_len = fill_mmfile(&mut pair.post, root).len();
            (pre_len + post_len) as u64
        }
    }
}

fn gather(lines: &mut Vec<String>, files: &mut &[DirstatFile], total: u64, base: &str, percent: u32, cumulative: bool) -> u64 {
    let mut this_dir = 0u64;
    let mut sources = 0u32;

    while let Some(f) = files.first() {
        if f.name.len() < base.len() || &f.name[..base.len()] != base {
            break;
        }
        let rest = &f.name[base.len()..];
        if let Some(slash_offset) = rest.find('/') {
            let new_base_len = base.len() + slash_offset + 1;
            let new_base = f.name[..new_base_len].to_string();
            let this = gather(lines, files, total, &new_base, percent, cumulative);
            sources += 1;
            this_dir += this;
        } else {
            this_dir += f.changed;
            *files = &files[1..];
            sources += 2;
        }
    }

    if !base.is_empty() && sources != 1 && total > 0 {
        let permille = this_dir * 1000 / total;
        if permille > 0 {
            let pct = permille / 10;
            if pct as u32 >= percent {
                lines.push(format!("{:4}.{}% {}", pct, permille % 10, base));
                if !cumulative {
                    return 0;
                }
            }
        }
    }
    this_dir
}

/// Render the dirstat lines for the whole queue. `percent` is the minimum
/// share (0-100) a directory must account for to be listed; `cumulative`
/// disables the early-return pruning that stops double-reporting a parent
/// once a child already cleared the threshold.
pub fn write_dirstat(ctx: &mut DiffContext, root: &Path, percent: u32, cumulative: bool) -> Vec<String> {
    let mut files: Vec<DirstatFile> = ctx
        .pairs
        .iter_mut()
        .map(|pair| {
            let (_, dst) = header_paths(pair);
            let changed = damage(pair, root);
            DirstatFile { name: dst, changed }
        })
        .collect();
    files.sort_by(|a, b| a.name.cmp(&b.name));

    let total: u64 = files.iter().map(|f| f.changed).sum();
    let mut lines = Vec::new();
    if total == 0 {
        return lines;
    }
    let slice: &[DirstatFile] = &files;
    let mut cursor = slice;
    gather(&mut lines, &mut cursor, total, "", percent, cumulative);
    lines
}
