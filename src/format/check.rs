//! Check formatter (§4.5 "Check"), grounded on `checkdiff_consume`/
//! `is_conflict_marker` in `diff.c`: scan the `+` side of each hunk for
//! whitespace errors and leftover conflict markers.

use crate::differ::{BuiltinDiffer, DiffConfig, DiffLine, LineDiffer};
use crate::format::{fill_mmfile, header_paths};
use crate::queue::DiffContext;
use std::path::Path;

/// One reported violation: `<file>:<line>: <category>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub line: usize,
    pub category: &'static str,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.path, self.line, self.category)
    }
}

/// `is_conflict_marker`: a line of 7 identical characters drawn from
/// `{'<','>','='}` followed by a space (or, for `=`, exactly `========\n`
/// with nothing else on the line).
fn is_conflict_marker(line: &[u8]) -> bool {
    if line.len() < 8 {
        return false;
    }
    let first = line[0];
    if !matches!(first, b'=' | b'>' | b'<') {
        return false;
    }
    if line[1..7].iter().any(|&b| b != first) {
        return false;
    }
    if first == b'=' {
        line.len() == 8 && line[7] == b'\n'
    } else {
        line.len() >= 8 && line[7].is_ascii_whitespace()
    }
}

fn strip_eol(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// `ws_check`: the line's whitespace-error categories, in report order.
/// Each category corresponds to one of the default `whitespace` rule set
/// (`trailing-space`, `tab-in-indent`).
fn ws_categories(body: &[u8]) -> Vec<&'static str> {
    let mut cats = Vec::new();
    let content = strip_eol(body);
    if content.iter().rev().take_while(|&&b| b == b' ' || b == b'\t').count() > 0 {
        cats.push("trailing whitespace");
    }
    let indent_end = content.iter().position(|&b| b != b' ' && b != b'\t').unwrap_or(content.len());
    let indent = &content[..indent_end];
    if indent.contains(&b'\t') {
        cats.push("tab in indent.");
    }
    cats
}

fn is_blank(body: &[u8]) -> bool {
    strip_eol(body).iter().all(|&b| b == b' ' || b == b'\t')
}

/// Check one pair's post-image `+` lines. Returns the violations found and
/// whether a trailing blank run was detected at end of file.
fn check_one(path: &str, pre: &[u8], post: &[u8]) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut lineno = 0usize;
    let mut trailing_blanks_start = 0usize;
    let mut last_added_line = 0usize;

    BuiltinDiffer.diff(pre, post, &DiffConfig::default(), &mut |line| match line {
        DiffLine::Hunk { new_start, .. } => {
            lineno = new_start.saturating_sub(1);
            trailing_blanks_start = 0;
        }
        DiffLine::Context(_) => {
            lineno += 1;
            trailing_blanks_start = 0;
        }
        DiffLine::Removed(_) => {}
        DiffLine::Added(body) => {
            lineno += 1;
            last_added_line = lineno;
            if is_blank(&body) {
                if trailing_blanks_start == 0 {
                    trailing_blanks_start = lineno;
                }
            } else {
                trailing_blanks_start = 0;
            }
            if is_conflict_marker(&body) {
                violations.push(Violation {
                    path: path.to_string(),
                    line: lineno,
                    category: "leftover conflict marker",
                });
            }
            for cat in ws_categories(&body) {
                violations.push(Violation {
                    path: path.to_string(),
                    line: lineno,
                    category: cat,
                });
            }
        }
    });

    if trailing_blanks_start != 0 && trailing_blanks_start <= last_added_line {
        violations.push(Violation {
            path: path.to_string(),
            line: trailing_blanks_start,
            category: "new blank line at end of file",
        });
    }
    violations
}

/// Run the check formatter over the whole queue. The bool is the
/// `CHECK_FAILED` flag: true if any violation was found, for the caller to
/// turn into a non-zero exit code.
pub fn check(ctx: &mut DiffContext, root: &Path) -> (Vec<Violation>, bool) {
    let mut all = Vec::new();
    for pair in ctx.pairs.iter_mut() {
        if pair.unmerged || !pair.post.is_valid() {
            continue;
        }
        let pre_bin = pair.pre.is_valid() && pair.pre.is_binary() == crate::filespec::Binary::Binary;
        let post_bin = pair.post.is_binary() == crate::filespec::Binary::Binary;
        if pre_bin || post_bin {
            continue;
        }
        let (_, dst) = header_paths(pair);
        let pre = fill_mmfile(&mut pair.pre, root).to_vec();
        let post = fill_mmfile(&mut pair.post, root).to_vec();
        all.extend(check_one(&dst, &pre, &post));
    }
    let failed = !all.is_empty();
    (all, failed)
}
