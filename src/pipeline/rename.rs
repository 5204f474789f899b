//! Stage 3: rename/copy detection (§4.4 step 3).
//!
//! Heuristic matching of delete candidates (pre valid, post invalid) against
//! add candidates (pre invalid, post valid): basename match first, then a
//! content-sketch similarity score. Surviving pairs are marked `renamed` or
//! `copied` with a score; `rename_used` is recorded so the merge-broken step
//! (step 4) knows which halves of a broken pair were actually consumed.
//!
//! Grounded on `diffcore-rename.c`'s shape as described in the spec (basename
//! match, then content similarity, bounded by `diff.renamelimit`); we don't
//! have that file in the retrieval pack, so the scoring function itself is a
//! from-scratch line-multiset similarity rather than a port of its exact
//! delta-based heuristic.

use crate::filepair::{FilePair, Status, MAX_SCORE};
use crate::filespec::FileSpec;
use crate::queue::DiffContext;
use std::collections::HashMap;
use std::path::Path;

/// Below this similarity, two files are not considered a rename/copy of one
/// another (git's default `-M50%`/`-C50%`).
const RENAME_SCORE_THRESHOLD: u32 = MAX_SCORE / 2;

fn basename(path: &[u8]) -> &[u8] {
    match path.iter().rposition(|&b| b == b'/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Similarity of two byte buffers as a fraction of shared lines, scaled to
/// `0..=MAX_SCORE`. Byte-identical content always scores exactly `MAX_SCORE`
/// (§8 property 7: rename symmetry).
pub(crate) fn similarity(pre: &[u8], post: &[u8]) -> u32 {
    if pre == post {
        return MAX_SCORE;
    }
    if pre.is_empty() && post.is_empty() {
        return MAX_SCORE;
    }
    if pre.is_empty() || post.is_empty() {
        return 0;
    }

    let pre_lines: Vec<&[u8]> = pre.split(|&b| b == b'\n').collect();
    let post_lines: Vec<&[u8]> = post.split(|&b| b == b'\n').collect();

    let mut pre_hist: HashMap<&[u8], usize> = HashMap::new();
    for l in &pre_lines {
        *pre_hist.entry(l).or_insert(0) += 1;
    }
    let mut shared = 0usize;
    for l in &post_lines {
        if let Some(count) = pre_hist.get_mut(l) {
            if *count > 0 {
                *count -= 1;
                shared += 1;
            }
        }
    }

    let total = pre_lines.len() + post_lines.len();
    if total == 0 {
        return MAX_SCORE;
    }
    ((2 * shared) as u64 * MAX_SCORE as u64 / total as u64) as u32
}

fn is_delete_candidate(pair: &FilePair) -> bool {
    !pair.unmerged && pair.pre.is_valid() && !pair.post.is_valid()
}

fn is_add_candidate(pair: &FilePair) -> bool {
    !pair.unmerged && !pair.pre.is_valid() && pair.post.is_valid()
}

struct Candidate {
    idx: usize,
    bytes: Vec<u8>,
}

fn materialize(spec: &mut FileSpec, root: &Path) -> Option<Vec<u8>> {
    spec.fill(root).ok().map(|b| b.to_vec())
}

pub fn run(ctx: &mut DiffContext, root: &Path) {
    let limit = ctx.config.diff_rename_limit;
    let detect_copies = ctx.config.detect_copies();

    let delete_idxs: Vec<usize> = ctx
        .pairs
        .iter()
        .enumerate()
        .filter(|(_, p)| is_delete_candidate(p))
        .map(|(i, _)| i)
        .collect();
    let add_idxs: Vec<usize> = ctx
        .pairs
        .iter()
        .enumerate()
        .filter(|(_, p)| is_add_candidate(p))
        .map(|(i, _)| i)
        .collect();

    if delete_idxs.len() > limit || add_idxs.len() > limit {
        tracing::warn!(
            deletes = delete_idxs.len(),
            adds = add_idxs.len(),
            limit,
            "too many rename candidates, skipping rename detection"
        );
        return;
    }

    let deletes: Vec<Candidate> = delete_idxs
        .iter()
        .filter_map(|&i| materialize(&mut ctx.pairs[i].pre, root).map(|bytes| Candidate { idx: i, bytes }))
        .collect();
    let adds: Vec<Candidate> = add_idxs
        .iter()
        .filter_map(|&i| materialize(&mut ctx.pairs[i].post, root).map(|bytes| Candidate { idx: i, bytes }))
        .collect();

    // (add_idx, delete_idx, score, is_copy)
    let mut matches: Vec<(usize, usize, u32, bool)> = Vec::new();
    let mut claimed_deletes: Vec<bool> = vec![false; deletes.len()];

    for add in &adds {
        let add_name = ctx.pairs[add.idx].post.path.clone();
        let mut best: Option<(usize, u32, bool)> = None;
        for (di, del) in deletes.iter().enumerate() {
            if claimed_deletes[di] {
                continue;
            }
            let score = similarity(&del.bytes, &add.bytes);
            if score < RENAME_SCORE_THRESHOLD {
                continue;
            }
            let del_name = ctx.pairs[del.idx].pre.path.clone();
            let same_basename = basename(&del_name) == basename(&add_name);
            // Rank by score first; a matching basename only breaks ties,
            // per the "basename match, then content sketches" ordering.
            let better = match best {
                None => true,
                Some((_, best_score, best_basename)) => {
                    score > best_score || (score == best_score && same_basename && !best_basename)
                }
            };
            if better {
                best = Some((di, score, same_basename));
            }
        }
        if let Some((di, score, _)) = best {
            claimed_deletes[di] = true;
            matches.push((add.idx, deletes[di].idx, score, false));
        }
    }

    if detect_copies {
        // Copy sources can be any valid pre-image still in the queue,
        // including ones already used as a rename source or left untouched.
        let mut source_bytes: Vec<(usize, Vec<u8>)> = Vec::new();
        for (i, pair) in ctx.pairs.iter_mut().enumerate() {
            if pair.pre.is_valid() {
                if let Some(bytes) = materialize(&mut pair.pre, root) {
                    source_bytes.push((i, bytes));
                }
            }
        }
        let matched_add_idxs: std::collections::HashSet<usize> =
            matches.iter().map(|(a, _, _, _)| *a).collect();
        for add in &adds {
            if matched_add_idxs.contains(&add.idx) {
                continue;
            }
            let mut best: Option<(usize, u32)> = None;
            for (src_idx, (pi, bytes)) in source_bytes.iter().enumerate() {
                if *pi == add.idx {
                    continue;
                }
                let score = similarity(bytes, &add.bytes);
                if score < RENAME_SCORE_THRESHOLD {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((_, best_score)) => score > best_score,
                };
                if better {
                    best = Some((src_idx, score));
                }
            }
            if let Some((src_idx, score)) = best {
                matches.push((add.idx, source_bytes[src_idx].0, score, true));
            }
        }
    }

    if matches.is_empty() {
        return;
    }

    let mut consumed: std::collections::HashSet<usize> = std::collections::HashSet::new();
    let mut new_pairs = Vec::new();
    for (add_idx, source_idx, score, is_copy) in &matches {
        let post = std::mem::replace(&mut ctx.pairs[*add_idx].post, FileSpec::invalid(Vec::new()));
        let pre = ctx.pairs[*source_idx].pre.clone();
        let mut pair = FilePair::new(pre, post);
        pair.score = *score;
        pair.rename_used = true;
        if *is_copy {
            pair.status = Status::Copied;
            ctx.stats.copied += 1;
        } else {
            pair.status = Status::Renamed;
            ctx.stats.renamed += 1;
            // The delete side is fully consumed by a rename (unlike a copy,
            // which leaves its source pair in place).
            consumed.insert(*source_idx);
            ctx.pairs[*source_idx].rename_used = true;
        }
        consumed.insert(*add_idx);
        new_pairs.push(pair);
    }

    let mut i = 0;
    ctx.pairs.retain(|_| {
        let keep = !consumed.contains(&i);
        i += 1;
        keep
    });
    ctx.pairs.extend(new_pairs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, RenameMode};
    use crate::index::EntryMode;

    fn mode() -> EntryMode {
        EntryMode::Regular { executable: false }
    }

    #[test]
    fn identical_content_under_new_path_is_a_full_score_rename() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.diff_renames = RenameMode::Renames;
        let mut ctx = DiffContext::new(cfg);

        ctx.push(FilePair::new(
            FileSpec::from_bytes("old.rs", mode(), b"hello\nworld\n".to_vec()),
            FileSpec::invalid("old.rs"),
        ));
        ctx.push(FilePair::new(
            FileSpec::invalid("new.rs"),
            FileSpec::from_bytes("new.rs", mode(), b"hello\nworld\n".to_vec()),
        ));

        run(&mut ctx, dir.path());

        assert_eq!(ctx.pairs.len(), 1);
        assert_eq!(ctx.pairs[0].status, Status::Renamed);
        assert_eq!(ctx.pairs[0].score, MAX_SCORE);
    }

    #[test]
    fn unrelated_add_and_delete_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.diff_renames = RenameMode::Renames;
        let mut ctx = DiffContext::new(cfg);

        ctx.push(FilePair::new(
            FileSpec::from_bytes("a.rs", mode(), b"completely different one\n".to_vec()),
            FileSpec::invalid("a.rs"),
        ));
        ctx.push(FilePair::new(
            FileSpec::invalid("b.rs"),
            FileSpec::from_bytes("b.rs", mode(), b"totally unrelated two\n".to_vec()),
        ));

        run(&mut ctx, dir.path());
        assert_eq!(ctx.pairs.len(), 2);
        assert!(ctx.pairs.iter().all(|p| p.status != Status::Renamed));
    }

    #[test]
    fn copy_detection_keeps_source_pair_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.diff_renames = RenameMode::Copies;
        let mut ctx = DiffContext::new(cfg);

        ctx.push(FilePair::new(
            FileSpec::from_bytes("src.rs", mode(), b"shared content\nhere\n".to_vec()),
            FileSpec::from_bytes("src.rs", mode(), b"shared content\nhere\nplus one line\n".to_vec()),
        ));
        ctx.push(FilePair::new(
            FileSpec::invalid("copy.rs"),
            FileSpec::from_bytes("copy.rs", mode(), b"shared content\nhere\n".to_vec()),
        ));

        run(&mut ctx, dir.path());
        assert_eq!(ctx.pairs.len(), 2);
        assert!(ctx.pairs.iter().any(|p| p.status == Status::Copied));
    }
}
