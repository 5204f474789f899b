//! Patch-id formatter (§4.5 "Patch-id"): a hash of a pair's diff that's
//! stable across context-line drift — re-run the line-differ with full
//! context and function names, strip whitespace from every emitted line and
//! skip hunk headers, and feed a whitespace-free synthetic preamble ahead of
//! each pair's body into one running hash over the whole queue.

use crate::differ::{BuiltinDiffer, DiffConfig, DiffLine, LineDiffer};
use crate::filepair::{FilePair, Status};
use crate::format::{fill_mmfile, header_paths};
use crate::hash::{ObjectHash, RunningHash};
use crate::queue::DiffContext;
use std::path::Path;

fn strip_whitespace(data: &[u8]) -> Vec<u8> {
    data.iter().copied().filter(|b| !b.is_ascii_whitespace()).collect()
}

/// The per-pair preamble: a whitespace-stripped synthetic header describing
/// the pair's shape, so two patches that touch the same paths the same way
/// hash identically regardless of exact header formatting elsewhere.
fn preamble(pair: &FilePair) -> String {
    let (src, dst) = header_paths(pair);
    match pair.status {
        Status::Added => format!("newfilemode{}{}", crate::format::mode_octal(pair.post.mode), dst),
        Status::Deleted => format!("deletedfilemode{}{}", crate::format::mode_octal(pair.pre.mode), src),
        _ => format!("{src}{dst}"),
    }
}

/// Feed one pair's patch-id contribution into `running`.
fn feed_pair(running: &mut RunningHash, pair: &mut FilePair, root: &Path) {
    running.update(strip_whitespace(preamble(pair).as_bytes()).as_slice());

    if pair.unmerged {
        return;
    }
    let pre = fill_mmfile(&mut pair.pre, root).to_vec();
    let post = fill_mmfile(&mut pair.post, root).to_vec();
    let cfg = DiffConfig {
        context: 3,
        emit_funcnames: true,
        ..DiffConfig::default()
    };
    BuiltinDiffer.diff(&pre, &post, &cfg, &mut |line| match line {
        DiffLine::Hunk { .. } => {}
        DiffLine::Context(b) | DiffLine::Removed(b) | DiffLine::Added(b) => {
            running.update(&strip_whitespace(&b));
        }
    });
}

/// The patch-id: one digest over every pair in the queue, in order.
pub fn patch_id(ctx: &mut DiffContext, root: &Path) -> ObjectHash {
    let mut running = RunningHash::new();
    for pair in ctx.pairs.iter_mut() {
        feed_pair(&mut running, pair, root);
    }
    running.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::filespec::FileSpec;
    use crate::index::EntryMode;

    fn mode() -> EntryMode {
        EntryMode::Regular { executable: false }
    }

    #[test]
    fn identical_pairs_produce_identical_patch_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx1 = DiffContext::new(Config::default());
        ctx1.push(FilePair::new(
            FileSpec::from_bytes("a", mode(), b"one\ntwo\n".to_vec()),
            FileSpec::from_bytes("a", mode(), b"one\nTWO\n".to_vec()),
        ));
        let mut ctx2 = DiffContext::new(Config::default());
        ctx2.push(FilePair::new(
            FileSpec::from_bytes("a", mode(), b"one\ntwo\n".to_vec()),
            FileSpec::from_bytes("a", mode(), b"one\nTWO\n".to_vec()),
        ));

        assert_eq!(patch_id(&mut ctx1, dir.path()), patch_id(&mut ctx2, dir.path()));
    }

    #[test]
    fn different_content_produces_different_patch_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx1 = DiffContext::new(Config::default());
        ctx1.push(FilePair::new(
            FileSpec::from_bytes("a", mode(), b"one\n".to_vec()),
            FileSpec::from_bytes("a", mode(), b"two\n".to_vec()),
        ));
        let mut ctx2 = DiffContext::new(Config::default());
        ctx2.push(FilePair::new(
            FileSpec::from_bytes("a", mode(), b"one\n".to_vec()),
            FileSpec::from_bytes("a", mode(), b"three\n".to_vec()),
        ));

        assert_ne!(patch_id(&mut ctx1, dir.path()), patch_id(&mut ctx2, dir.path()));
    }
}
