//! Unified patch formatter (§4.5 "Unified patch", §6 "Diff output — unified
//! patch"). No terminal colouring: the retrieval pack carries no color crate,
//! so this emits the plain-text half of the spec's "coloured or plain text"
//! choice — a caller wanting colour wraps the `Write` sink itself.

use crate::differ::{BuiltinDiffer, DiffConfig, DiffLine, LineDiffer};
use crate::filepair::{score_to_percent, FilePair, Status};
use crate::format::{fill_mmfile, header_paths, mode_octal};
use crate::queue::DiffContext;
use std::io::{self, Write};
use std::path::Path;

const ABBREV_LEN: usize = 7;

fn write_header<W: Write>(out: &mut W, pair: &FilePair) -> io::Result<()> {
    let (src, dst) = header_paths(pair);
    writeln!(out, "diff --git a/{src} b/{dst}")?;

    match pair.status {
        Status::Renamed | Status::Copied => {
            if pair.score > 0 {
                writeln!(out, "similarity index {}%", score_to_percent(pair.score))?;
            }
            let verb = if pair.status == Status::Renamed { "rename" } else { "copy" };
            writeln!(out, "{verb} from {src}")?;
            writeln!(out, "{verb} to {dst}")?;
        }
        _ => {}
    }

    let pre_mode = pair.pre.mode;
    let post_mode = pair.post.mode;
    match (pair.pre.is_valid(), pair.post.is_valid()) {
        (false, true) => writeln!(out, "new file mode {}", mode_octal(post_mode))?,
        (true, false) => writeln!(out, "deleted file mode {}", mode_octal(pre_mode))?,
        (true, true) if pre_mode.map(crate::index::EntryMode::to_raw) != post_mode.map(crate::index::EntryMode::to_raw) => {
            writeln!(out, "old mode {}", mode_octal(pre_mode))?;
            writeln!(out, "new mode {}", mode_octal(post_mode))?;
        }
        _ => {}
    }

    let pre_abbrev = pair.pre.hash.abbrev(ABBREV_LEN);
    let post_abbrev = pair.post.hash.abbrev(ABBREV_LEN);
    if pair.pre.is_valid() && pair.post.is_valid() {
        let mode_suffix = if pre_mode.map(crate::index::EntryMode::to_raw)
            == post_mode.map(crate::index::EntryMode::to_raw)
        {
            format!(" {}", mode_octal(post_mode))
        } else {
            String::new()
        };
        writeln!(out, "index {pre_abbrev}..{post_abbrev}{mode_suffix}")?;
    } else {
        writeln!(out, "index {pre_abbrev}..{post_abbrev}")?;
    }
    Ok(())
}

fn count_newlines(data: &[u8]) -> usize {
    data.iter().filter(|&&b| b == b'\n').count()
}

/// Complete-rewrite variant (§4.5): bypass the line-differ entirely and emit
/// the whole pre-image as removed, the whole post-image as added, inside one
/// hunk whose counts come straight from a newline count (with a trailing
/// no-newline correction).
fn write_complete_rewrite<W: Write>(out: &mut W, pre: &[u8], post: &[u8]) -> io::Result<()> {
    let pre_count = count_newlines(pre) + usize::from(!pre.is_empty() && !pre.ends_with(b"\n"));
    let post_count = count_newlines(post) + usize::from(!post.is_empty() && !post.ends_with(b"\n"));
    writeln!(out, "@@ -1,{pre_count} +1,{post_count} @@")?;
    for line in pre.split(|&b| b == b'\n') {
        if line.is_empty() && pre.ends_with(b"\n") {
            continue;
        }
        write!(out, "-")?;
        out.write_all(line)?;
        writeln!(out)?;
    }
    if !pre.is_empty() && !pre.ends_with(b"\n") {
        writeln!(out, "\\ No newline at end of file")?;
    }
    for line in post.split(|&b| b == b'\n') {
        if line.is_empty() && post.ends_with(b"\n") {
            continue;
        }
        write!(out, "+")?;
        out.write_all(line)?;
        writeln!(out)?;
    }
    if !post.is_empty() && !post.ends_with(b"\n") {
        writeln!(out, "\\ No newline at end of file")?;
    }
    Ok(())
}

fn write_hunks<W: Write>(out: &mut W, pre: &[u8], post: &[u8], cfg: &DiffConfig) -> io::Result<()> {
    let mut result: io::Result<()> = Ok(());
    BuiltinDiffer.diff(pre, post, cfg, &mut |line| {
        if result.is_err() {
            return;
        }
        result = (|| match line {
            DiffLine::Hunk {
                old_start,
                old_count,
                new_start,
                new_count,
            } => writeln!(out, "@@ -{old_start},{old_count} +{new_start},{new_count} @@"),
            DiffLine::Context(bytes) => {
                write!(out, " ")?;
                out.write_all(&bytes)
            }
            DiffLine::Removed(bytes) => {
                write!(out, "-")?;
                out.write_all(&bytes)
            }
            DiffLine::Added(bytes) => {
                write!(out, "+")?;
                out.write_all(&bytes)
            }
        })();
    });
    result
}

/// Emit one pair's unified patch to `out`. Binary pairs get the short `Binary
/// files a/<p> and b/<p> differ` stand-in; use `format::binary` for the real
/// `GIT binary patch` body.
pub fn write_pair<W: Write>(
    out: &mut W,
    pair: &mut FilePair,
    root: &Path,
    cfg: &DiffConfig,
) -> io::Result<()> {
    if pair.unmerged {
        let (src, _) = header_paths(pair);
        return writeln!(out, "* Unmerged path {src}");
    }

    write_header(out, pair)?;

    let pre_bin = pair.pre.is_valid() && pair.pre.is_binary() == crate::filespec::Binary::Binary;
    let post_bin = pair.post.is_valid() && pair.post.is_binary() == crate::filespec::Binary::Binary;
    if pre_bin || post_bin {
        let (src, dst) = header_paths(pair);
        writeln!(out, "Binary files a/{src} and b/{dst} differ")?;
        return Ok(());
    }

    let (src, dst) = header_paths(pair);
    let pre_marker = if pair.pre.is_valid() {
        format!("a/{src}")
    } else {
        "/dev/null".to_string()
    };
    let post_marker = if pair.post.is_valid() {
        format!("b/{dst}")
    } else {
        "/dev/null".to_string()
    };
    writeln!(out, "--- {pre_marker}")?;
    writeln!(out, "+++ {post_marker}")?;

    let pre_bytes = fill_mmfile(&mut pair.pre, root).to_vec();
    let post_bytes = fill_mmfile(&mut pair.post, root).to_vec();

    if pair.status == Status::Modified && pair.score > 0 {
        write_complete_rewrite(out, &pre_bytes, &post_bytes)
    } else {
        write_hunks(out, &pre_bytes, &post_bytes, cfg)
    }
}

/// Emit every pair in the queue, in its current order, to `out`.
pub fn write_all<W: Write>(out: &mut W, ctx: &mut DiffContext, root: &Path, cfg: &DiffConfig) -> io::Result<()> {
    for pair in ctx.pairs.iter_mut() {
        write_pair(out, pair, root, cfg)?;
    }
    Ok(())
}
