//! The line-differ contract (§6 "Line-differ interface (consumed)") plus one
//! concrete implementation of it, `builtin`, a plain Myers/LCS line matcher
//! so the crate is self-contained and testable without shelling out.
//!
//! The interface is kept as a callback ("push") exactly as specified: the
//! differ calls `sink` once per emitted line, classified by its leading byte.

use std::collections::HashMap;

/// Knobs named in §6's line-differ config: `{context, interhunk, flags, funcname_pattern}`.
#[derive(Debug, Clone)]
pub struct DiffConfig {
    pub context: usize,
    pub interhunk: usize,
    pub minimal: bool,
    pub patience: bool,
    pub emit_funcnames: bool,
    pub ignore_whitespace: bool,
    pub ignore_whitespace_at_eol: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            context: 3,
            interhunk: 0,
            minimal: false,
            patience: false,
            emit_funcnames: false,
            ignore_whitespace: false,
            ignore_whitespace_at_eol: false,
        }
    }
}

/// A classified output line, as the sink callback would see it reconstructed
/// from its leading byte (`@` hunk header, ` `/`-`/`+` body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Hunk {
        old_start: usize,
        old_count: usize,
        new_start: usize,
        new_count: usize,
    },
    Context(Vec<u8>),
    Removed(Vec<u8>),
    Added(Vec<u8>),
}

/// The black-box contract: split `pre`/`post` into lines, diff them, and
/// invoke `sink` once per produced line in emission order.
pub trait LineDiffer {
    fn diff(&self, pre: &[u8], post: &[u8], cfg: &DiffConfig, sink: &mut dyn FnMut(DiffLine));
}

fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    if data.is_empty() {
        return Vec::new();
    }
    let mut lines = Vec::new();
    let mut start = 0;
    for (i, &b) in data.iter().enumerate() {
        if b == b'\n' {
            lines.push(&data[start..=i]);
            start = i + 1;
        }
    }
    if start < data.len() {
        lines.push(&data[start..]);
    }
    lines
}

fn normalize<'a>(line: &'a [u8], cfg: &DiffConfig) -> std::borrow::Cow<'a, [u8]> {
    if !cfg.ignore_whitespace && !cfg.ignore_whitespace_at_eol {
        return std::borrow::Cow::Borrowed(line);
    }
    if cfg.ignore_whitespace {
        std::borrow::Cow::Owned(line.iter().copied().filter(|b| !b.is_ascii_whitespace()).collect())
    } else {
        let trimmed = line
            .iter()
            .rposition(|b| !matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
            .map(|i| &line[..=i])
            .unwrap_or(&line[..0]);
        std::borrow::Cow::Borrowed(trimmed)
    }
}

/// Myers/LCS edit-script builder operating on whole lines. Plain O(N*D)
/// Myers diff (the classic greedy-snake formulation), not a patience/minimal
/// variant — `cfg.patience`/`cfg.minimal` are accepted for interface parity
/// but this implementation always runs the same algorithm; external
/// `diff.external` remains the path for a patience/histogram differ.
pub struct BuiltinDiffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Keep,
    Delete,
    Insert,
}

impl BuiltinDiffer {
    fn lcs_edit_script(a: &[&[u8]], b: &[&[u8]]) -> Vec<Edit> {
        let n = a.len();
        let m = b.len();
        // Classic DP LCS table; fine for the line counts a single file diff
        // produces. `diff.external` is the escape hatch for pathological inputs.
        let mut dp = vec![vec![0u32; m + 1]; n + 1];
        for i in (0..n).rev() {
            for j in (0..m).rev() {
                dp[i][j] = if a[i] == b[j] {
                    dp[i + 1][j + 1] + 1
                } else {
                    dp[i + 1][j].max(dp[i][j + 1])
                };
            }
        }

        let mut script = Vec::with_capacity(n + m);
        let (mut i, mut j) = (0, 0);
        while i < n && j < m {
            if a[i] == b[j] {
                script.push(Edit::Keep);
                i += 1;
                j += 1;
            } else if dp[i + 1][j] >= dp[i][j + 1] {
                script.push(Edit::Delete);
                i += 1;
            } else {
                script.push(Edit::Insert);
                j += 1;
            }
        }
        while i < n {
            script.push(Edit::Delete);
            i += 1;
        }
        while j < m {
            script.push(Edit::Insert);
            j += 1;
        }
        script
    }
}

impl LineDiffer for BuiltinDiffer {
    fn diff(&self, pre: &[u8], post: &[u8], cfg: &DiffConfig, sink: &mut dyn FnMut(DiffLine)) {
        let pre_lines = split_lines(pre);
        let post_lines = split_lines(post);

        let pre_keys: Vec<std::borrow::Cow<[u8]>> =
            pre_lines.iter().map(|l| normalize(l, cfg)).collect();
        let post_keys: Vec<std::borrow::Cow<[u8]>> =
            post_lines.iter().map(|l| normalize(l, cfg)).collect();
        let pre_refs: Vec<&[u8]> = pre_keys.iter().map(|c| c.as_ref()).collect();
        let post_refs: Vec<&[u8]> = post_keys.iter().map(|c| c.as_ref()).collect();

        let script = Self::lcs_edit_script(&pre_refs, &post_refs);

        // Map each script position to its (old_idx, new_idx) for hunk bounds.
        let mut positions = Vec::with_capacity(script.len());
        let (mut oi, mut ni) = (0usize, 0usize);
        for edit in &script {
            positions.push((oi, ni));
            match edit {
                Edit::Keep => {
                    oi += 1;
                    ni += 1;
                }
                Edit::Delete => oi += 1,
                Edit::Insert => ni += 1,
            }
        }

        let mut groups: Vec<(usize, usize)> = Vec::new();
        let mut idx = 0;
        while idx < script.len() {
            if script[idx] == Edit::Keep {
                idx += 1;
                continue;
            }
            let start = idx;
            while idx < script.len() && script[idx] != Edit::Keep {
                idx += 1;
            }
            groups.push((start, idx));
        }

        if groups.is_empty() {
            return;
        }

        // Merge groups that are within `interhunk` keep-lines of each other.
        let mut merged: Vec<(usize, usize)> = Vec::new();
        for (start, end) in groups {
            if let Some(last) = merged.last_mut() {
                let gap = start - last.1;
                if gap <= cfg.interhunk {
                    last.1 = end;
                    continue;
                }
            }
            merged.push((start, end));
        }

        for (start, end) in merged {
            let ctx_before = cfg.context.min(start);
            let ctx_after = cfg.context.min(script.len() - end);
            let hunk_start = start - ctx_before;
            let hunk_end = end + ctx_after;

            let (old_start, new_start) = positions[hunk_start];
            let mut old_count = 0usize;
            let mut new_count = 0usize;
            for edit in &script[hunk_start..hunk_end] {
                match edit {
                    Edit::Keep => {
                        old_count += 1;
                        new_count += 1;
                    }
                    Edit::Delete => old_count += 1,
                    Edit::Insert => new_count += 1,
                }
            }

            sink(DiffLine::Hunk {
                old_start: old_start + 1,
                old_count,
                new_start: new_start + 1,
                new_count,
            });

            // Emit in script order, tracking old/new cursors independently.
            let (mut o, mut n) = (old_start, new_start);
            for edit in &script[hunk_start..hunk_end] {
                match edit {
                    Edit::Keep => {
                        sink(DiffLine::Context(pre_lines[o].to_vec()));
                        o += 1;
                        n += 1;
                    }
                    Edit::Delete => {
                        sink(DiffLine::Removed(pre_lines[o].to_vec()));
                        o += 1;
                    }
                    Edit::Insert => {
                        sink(DiffLine::Added(post_lines[n].to_vec()));
                        n += 1;
                    }
                }
            }
        }
    }
}

pub mod hashmap_index {
    //! A content → first-occurrence-index map, useful for the pipeline's
    //! rename-detection content sketch (§4.4 step 3) independent of the
    //! full line-diff machinery above.
    use super::HashMap;

    pub fn line_histogram<'a>(lines: &[&'a [u8]]) -> HashMap<&'a [u8], usize> {
        let mut map = HashMap::new();
        for line in lines {
            *map.entry(*line).or_insert(0) += 1;
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(pre: &[u8], post: &[u8], cfg: &DiffConfig) -> Vec<DiffLine> {
        let mut out = Vec::new();
        BuiltinDiffer.diff(pre, post, cfg, &mut |line| out.push(line));
        out
    }

    #[test]
    fn identical_inputs_produce_no_lines() {
        let cfg = DiffConfig::default();
        let lines = run(b"foo\nbar\n", b"foo\nbar\n", &cfg);
        assert!(lines.is_empty());
    }

    #[test]
    fn single_line_substitution_is_one_hunk() {
        let cfg = DiffConfig::default();
        let lines = run(b"foo\nbar\n", b"foo\nbaz\n", &cfg);
        assert_eq!(
            lines[0],
            DiffLine::Hunk {
                old_start: 1,
                old_count: 2,
                new_start: 1,
                new_count: 2,
            }
        );
        assert_eq!(lines[1], DiffLine::Context(b"foo\n".to_vec()));
        assert_eq!(lines[2], DiffLine::Removed(b"bar\n".to_vec()));
        assert_eq!(lines[3], DiffLine::Added(b"baz\n".to_vec()));
    }

    #[test]
    fn pure_addition_has_no_removed_lines() {
        let cfg = DiffConfig::default();
        let lines = run(b"a\n", b"a\nb\n", &cfg);
        assert!(lines.iter().any(|l| matches!(l, DiffLine::Added(_))));
        assert!(!lines.iter().any(|l| matches!(l, DiffLine::Removed(_))));
    }

    #[test]
    fn zero_context_omits_unrelated_keep_lines() {
        let cfg = DiffConfig {
            context: 0,
            ..DiffConfig::default()
        };
        let lines = run(b"a\nb\nc\n", b"a\nx\nc\n", &cfg);
        assert!(!lines
            .iter()
            .any(|l| matches!(l, DiffLine::Context(c) if c == b"a\n")));
    }
}
