//! Stage 2: pre-split large-content-replacement modifications into add+delete
//! halves so rename detection can re-pair them across files (§4.4 step 2).
//!
//! A pair qualifies for breaking when both sides are valid regular files and
//! the fraction of content carried over from pre to post (measured by shared
//! line count) falls below a threshold — i.e. it looks more like "this file
//! was replaced by unrelated content" than "this file was edited".

use crate::filepair::FilePair;
use crate::filespec::FileSpec;
use crate::queue::DiffContext;

/// Below this fraction of shared lines, treat a modification as a full
/// replacement rather than an edit.
const BREAK_SCORE_THRESHOLD: f64 = 0.25;

fn shared_line_fraction(pre: &[u8], post: &[u8]) -> f64 {
    let pre_lines: std::collections::HashSet<&[u8]> = pre.split(|&b| b == b'\n').collect();
    let post_lines: std::collections::HashSet<&[u8]> = post.split(|&b| b == b'\n').collect();
    if pre_lines.is_empty() || post_lines.is_empty() {
        return 1.0;
    }
    let shared = pre_lines.intersection(&post_lines).count();
    let total = pre_lines.len().max(post_lines.len());
    shared as f64 / total as f64
}

pub fn run(ctx: &mut DiffContext) {
    let mut broken = Vec::new();
    ctx.pairs.retain_mut(|pair| {
        if pair.unmerged || !pair.pre.is_valid() || !pair.post.is_valid() {
            return true;
        }
        let (Some(pre_bytes), Some(post_bytes)) = (pair.pre.bytes(), pair.post.bytes()) else {
            return true;
        };
        if shared_line_fraction(pre_bytes, post_bytes) >= BREAK_SCORE_THRESHOLD {
            return true;
        }

        let deleted = FilePair {
            pre: std::mem::replace(&mut pair.pre, FileSpec::invalid(Vec::new())),
            post: FileSpec::invalid(pair.post.path.clone()),
            status: crate::filepair::Status::Deleted,
            score: 0,
            rename_used: false,
            broken_pair: true,
            unmerged: false,
        };
        let added = FilePair {
            pre: FileSpec::invalid(deleted.pre.path.clone()),
            post: std::mem::replace(&mut pair.post, FileSpec::invalid(Vec::new())),
            status: crate::filepair::Status::Added,
            score: 0,
            rename_used: false,
            broken_pair: true,
            unmerged: false,
        };
        broken.push(deleted);
        broken.push(added);
        false
    });
    let broken_count = broken.len() / 2;
    ctx.pairs.extend(broken);
    ctx.stats.broken += broken_count;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::index::EntryMode;

    #[test]
    fn wholesale_replacement_is_broken_into_add_and_delete() {
        let mode = EntryMode::Regular { executable: false };
        let mut ctx = DiffContext::new(Config::default());
        ctx.push(FilePair::new(
            FileSpec::from_bytes("x", mode, b"one\ntwo\nthree\n".to_vec()),
            FileSpec::from_bytes("x", mode, b"completely\nunrelated\ncontent\nhere\n".to_vec()),
        ));
        run(&mut ctx);
        assert_eq!(ctx.pairs.len(), 2);
        assert!(ctx.pairs.iter().any(|p| p.status == crate::filepair::Status::Deleted));
        assert!(ctx.pairs.iter().any(|p| p.status == crate::filepair::Status::Added));
        assert_eq!(ctx.stats.broken, 1);
    }

    #[test]
    fn ordinary_edit_is_left_alone() {
        let mode = EntryMode::Regular { executable: false };
        let mut ctx = DiffContext::new(Config::default());
        ctx.push(FilePair::new(
            FileSpec::from_bytes("x", mode, b"one\ntwo\nthree\n".to_vec()),
            FileSpec::from_bytes("x", mode, b"one\ntwo\nfour\n".to_vec()),
        ));
        run(&mut ctx);
        assert_eq!(ctx.pairs.len(), 1);
    }
}
