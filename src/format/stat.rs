//! Stat / numstat / shortstat formatters (§4.5 "Stat / numstat / shortstat").

use crate::differ::{BuiltinDiffer, DiffConfig, DiffLine, LineDiffer};
use crate::format::{fill_mmfile, header_paths};
use crate::queue::DiffContext;
use std::io::{self, Write};
use std::path::Path;

/// `scale_linear(it, w, max)` from §4.5: scale an item count `it` into a
/// column width `w`, against a maximum count `max` across the whole run.
/// `max < 2` returns `it` unchanged (nothing to scale against).
pub fn scale_linear(it: usize, w: usize, max: usize) -> usize {
    if max < 2 {
        return it;
    }
    ((it.saturating_sub(1)) * (w.saturating_sub(1)) + (max - 1)) / (max - 1)
}

#[derive(Debug, Clone, Copy, Default)]
struct LineCounts {
    added: usize,
    deleted: usize,
}

enum PerFile {
    Text { path: String, counts: LineCounts },
    Binary { path: String, pre_size: u64, post_size: u64 },
    Unmerged { path: String },
}

fn count_lines(pre: &[u8], post: &[u8], cfg: &DiffConfig) -> LineCounts {
    let mut counts = LineCounts::default();
    BuiltinDiffer.diff(pre, post, cfg, &mut |line| match line {
        DiffLine::Added(_) => counts.added += 1,
        DiffLine::Removed(_) => counts.deleted += 1,
        _ => {}
    });
    counts
}

fn gather(ctx: &mut DiffContext, root: &Path, cfg: &DiffConfig) -> Vec<PerFile> {
    ctx.pairs
        .iter_mut()
        .map(|pair| {
            let (_, dst) = header_paths(pair);
            if pair.unmerged {
                return PerFile::Unmerged { path: dst };
            }
            let pre_bin = pair.pre.is_valid() && pair.pre.is_binary() == crate::filespec::Binary::Binary;
            let post_bin = pair.post.is_valid() && pair.post.is_binary() == crate::filespec::Binary::Binary;
            if pre_bin || post_bin {
                let pre_size = pair.pre.size.unwrap_or(0);
                let post_size = pair.post.size.unwrap_or(0);
                return PerFile::Binary { path: dst, pre_size, post_size };
            }
            let pre = fill_mmfile(&mut pair.pre, root).to_vec();
            let post = fill_mmfile(&mut pair.post, root).to_vec();
            PerFile::Text {
                path: dst,
                counts: count_lines(&pre, &post, cfg),
            }
        })
        .collect()
}

/// Full `--stat` table: one line per file with a name column, a `+N -N`
/// count, and a scaled `+`/`-` graph; default width 80, minimum 5 columns
/// for the graph and 10 for the name.
pub fn write_stat<W: Write>(
    out: &mut W,
    ctx: &mut DiffContext,
    root: &Path,
    cfg: &DiffConfig,
    width: usize,
) -> io::Result<()> {
    let files = gather(ctx, root, cfg);
    let max_changes = files
        .iter()
        .map(|f| match f {
            PerFile::Text { counts, .. } => counts.added + counts.deleted,
            _ => 0,
        })
        .max()
        .unwrap_or(0);

    let name_width = files
        .iter()
        .map(|f| match f {
            PerFile::Text { path, .. } | PerFile::Binary { path, .. } | PerFile::Unmerged { path } => {
                path.chars().count()
            }
        })
        .max()
        .unwrap_or(0)
        .max(10);
    let graph_width = width.saturating_sub(name_width + 8).max(5);

    for file in &files {
        match file {
            PerFile::Unmerged { path } => writeln!(out, " {path:<name_width$} | Unmerged")?,
            PerFile::Binary { path, pre_size, post_size } => {
                writeln!(out, " {path:<name_width$} | Bin {pre_size} -> {post_size} bytes")?
            }
            PerFile::Text { path, counts } => {
                let total = counts.added + counts.deleted;
                let plus = scale_linear(counts.added, graph_width, max_changes);
                let minus = scale_linear(counts.deleted, graph_width, max_changes);
                writeln!(
                    out,
                    " {path:<name_width$} | {total:>4} {}{}",
                    "+".repeat(plus),
                    "-".repeat(minus)
                )?;
            }
        }
    }

    let (files_changed, insertions, deletions) = totals(&files);
    writeln!(out, "{}", summary_line(files_changed, insertions, deletions))?;
    Ok(())
}

/// `--numstat`: raw tab-separated counts, `-\t-` for binary files, NUL
/// path-separator under `nul_separated` (the `-z` mode).
pub fn write_numstat<W: Write>(
    out: &mut W,
    ctx: &mut DiffContext,
    root: &Path,
    cfg: &DiffConfig,
    nul_separated: bool,
) -> io::Result<()> {
    let files = gather(ctx, root, cfg);
    let terminator: &[u8] = if nul_separated { b"\0" } else { b"\n" };
    for file in &files {
        match file {
            PerFile::Text { path, counts } => {
                write!(out, "{}\t{}\t", counts.added, counts.deleted)?;
                out.write_all(path.as_bytes())?;
            }
            PerFile::Binary { path, .. } => {
                write!(out, "-\t-\t")?;
                out.write_all(path.as_bytes())?;
            }
            PerFile::Unmerged { path } => {
                write!(out, "-\t-\t")?;
                out.write_all(path.as_bytes())?;
            }
        }
        out.write_all(terminator)?;
    }
    Ok(())
}

fn totals(files: &[PerFile]) -> (usize, usize, usize) {
    let mut insertions = 0;
    let mut deletions = 0;
    for f in files {
        if let PerFile::Text { counts, .. } = f {
            insertions += counts.added;
            deletions += counts.deleted;
        }
    }
    (files.len(), insertions, deletions)
}

fn summary_line(files_changed: usize, insertions: usize, deletions: usize) -> String {
    let file_word = if files_changed == 1 { "file" } else { "files" };
    let mut parts = vec![format!("{files_changed} {file_word} changed")];
    if insertions > 0 {
        let word = if insertions == 1 { "insertion(+)" } else { "insertions(+)" };
        parts.push(format!("{insertions} {word}"));
    }
    if deletions > 0 {
        let word = if deletions == 1 { "deletion(-)" } else { "deletions(-)" };
        parts.push(format!("{deletions} {word}"));
    }
    parts.join(", ")
}

/// `--shortstat`: the totals line alone.
pub fn write_shortstat<W: Write>(
    out: &mut W,
    ctx: &mut DiffContext,
    root: &Path,
    cfg: &DiffConfig,
) -> io::Result<()> {
    let files = gather(ctx, root, cfg);
    let (files_changed, insertions, deletions) = totals(&files);
    writeln!(out, " {}", summary_line(files_changed, insertions, deletions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::filepair::FilePair;
    use crate::filespec::FileSpec;
    use crate::index::EntryMode;

    fn mode() -> EntryMode {
        EntryMode::Regular { executable: false }
    }

    #[test]
    fn scale_linear_passes_through_below_two() {
        assert_eq!(scale_linear(5, 40, 1), 5);
        assert_eq!(scale_linear(5, 40, 0), 5);
    }

    #[test]
    fn scale_linear_scales_to_width() {
        assert_eq!(scale_linear(1, 40, 1), 1);
        assert_eq!(scale_linear(10, 41, 10), 41);
    }

    #[test]
    fn shortstat_reports_totals_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = DiffContext::new(Config::default());
        ctx.push(FilePair::new(
            FileSpec::from_bytes("a", mode(), b"one\ntwo\n".to_vec()),
            FileSpec::from_bytes("a", mode(), b"one\nTWO\nTHREE\n".to_vec()),
        ));

        let mut out = Vec::new();
        write_shortstat(&mut out, &mut ctx, dir.path(), &DiffConfig::default()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("1 file changed"));
        assert!(text.contains("2 insertions(+)"));
        assert!(text.contains("1 deletion(-)"));
    }

    #[test]
    fn numstat_reports_dash_for_binary() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = DiffContext::new(Config::default());
        ctx.push(FilePair::new(
            FileSpec::from_bytes("b.bin", mode(), vec![0, 1]),
            FileSpec::from_bytes("b.bin", mode(), vec![0, 1, 2]),
        ));

        let mut out = Vec::new();
        write_numstat(&mut out, &mut ctx, dir.path(), &DiffConfig::default(), false).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "-\t-\tb.bin\n");
    }
}
