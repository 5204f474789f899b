//! Stage 5: the pickaxe filter (§4.4 step 5, GLOSSARY "Pickaxe") — retain
//! only pairs whose diff changes the occurrence count of a literal string
//! (`-S`) or whose added/removed lines match a regex at all (`-G`).

use crate::differ::{BuiltinDiffer, DiffConfig, DiffLine, LineDiffer};
use crate::queue::DiffContext;
use regex::bytes::Regex;
use std::path::Path;

#[derive(Clone)]
pub enum PickaxeMode {
    /// `-S<string>`: keep a pair iff the number of times `needle` occurs
    /// differs between the pre- and post-image.
    CountString(Vec<u8>),
    /// `-G<regex>`: keep a pair iff any added or removed line matches.
    Regex(Regex),
}

impl std::fmt::Debug for PickaxeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PickaxeMode::CountString(s) => {
                write!(f, "CountString({})", String::from_utf8_lossy(s))
            }
            PickaxeMode::Regex(r) => write!(f, "Regex({})", r.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pickaxe {
    pub mode: PickaxeMode,
}

impl Pickaxe {
    pub fn count_string(needle: Vec<u8>) -> Self {
        Self {
            mode: PickaxeMode::CountString(needle),
        }
    }

    pub fn regex(re: Regex) -> Self {
        Self {
            mode: PickaxeMode::Regex(re),
        }
    }
}

fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    if needle.is_empty() || haystack.len() < needle.len() {
        return 0;
    }
    let mut count = 0;
    let mut start = 0;
    while let Some(pos) = find(&haystack[start..], needle) {
        count += 1;
        start += pos + 1;
        if start >= haystack.len() {
            break;
        }
    }
    count
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn diff_touches_regex(pre: &[u8], post: &[u8], re: &Regex) -> bool {
    let mut matched = false;
    BuiltinDiffer.diff(pre, post, &DiffConfig::default(), &mut |line| {
        if matched {
            return;
        }
        let bytes = match &line {
            DiffLine::Added(b) | DiffLine::Removed(b) => Some(b.as_slice()),
            _ => None,
        };
        if let Some(bytes) = bytes {
            if re.is_match(bytes) {
                matched = true;
            }
        }
    });
    matched
}

pub fn run(ctx: &mut DiffContext, root: &Path, pickaxe: &Pickaxe) {
    ctx.pairs.retain_mut(|pair| {
        if pair.unmerged {
            return true;
        }
        let pre = pair.pre.fill(root).ok().map(<[u8]>::to_vec).unwrap_or_default();
        let post = pair.post.fill(root).ok().map(<[u8]>::to_vec).unwrap_or_default();

        match &pickaxe.mode {
            PickaxeMode::CountString(needle) => {
                count_occurrences(&pre, needle) != count_occurrences(&post, needle)
            }
            PickaxeMode::Regex(re) => diff_touches_regex(&pre, &post, re),
        }
    });
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
    fn count_string_keeps_pairs_whose_occurrence_count_changed() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = DiffContext::new(Config::default());
        ctx.push(FilePair::new(
            FileSpec::from_bytes("a", mode(), b"foo bar\n".to_vec()),
            FileSpec::from_bytes("a", mode(), b"foo foo bar\n".to_vec()),
        ));
        ctx.push(FilePair::new(
            FileSpec::from_bytes("b", mode(), b"foo bar\n".to_vec()),
            FileSpec::from_bytes("b", mode(), b"baz bar\n".to_vec()),
        ));

        run(
            &mut ctx,
            dir.path(),
            &Pickaxe {
                mode: PickaxeMode::CountString(b"foo".to_vec()),
            },
        );
        assert_eq!(ctx.pairs.len(), 1);
        assert_eq!(ctx.pairs[0].post.path, b"a");
    }

    #[test]
    fn regex_mode_keeps_pairs_whose_diff_lines_match() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = DiffContext::new(Config::default());
        ctx.push(FilePair::new(
            FileSpec::from_bytes("a", mode(), b"one\n".to_vec()),
            FileSpec::from_bytes("a", mode(), b"one\nTODO: fix\n".to_vec()),
        ));
        ctx.push(FilePair::new(
            FileSpec::from_bytes("b", mode(), b"one\n".to_vec()),
            FileSpec::from_bytes("b", mode(), b"two\n".to_vec()),
        ));

        run(
            &mut ctx,
            dir.path(),
            &Pickaxe {
                mode: PickaxeMode::Regex(Regex::new("TODO").unwrap()),
            },
        );
        assert_eq!(ctx.pairs.len(), 1);
        assert_eq!(ctx.pairs[0].post.path, b"a");
    }
}
