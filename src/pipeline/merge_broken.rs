//! Stage 4: re-join broken pairs whose halves did not participate in any
//! rename, restoring them as a single heavy-rewrite modification (§4.4 step
//! 4). A broken pair that *did* get consumed by rename detection (its
//! `rename_used` flag set, or it was removed outright as a rename target)
//! stays however the rename stage left it; only orphaned halves come back
//! together here.

use crate::filepair::Status;
use crate::pipeline::rename::similarity;
use crate::queue::DiffContext;

pub fn run(ctx: &mut DiffContext) {
    let mut deleted_half: Vec<usize> = Vec::new();
    let mut added_half: Vec<usize> = Vec::new();
    for (i, pair) in ctx.pairs.iter().enumerate() {
        if !pair.broken_pair || pair.rename_used {
            continue;
        }
        if pair.status == Status::Deleted {
            deleted_half.push(i);
        } else if pair.status == Status::Added {
            added_half.push(i);
        }
    }

    let mut to_remove: Vec<usize> = Vec::new();
    let mut rejoined = Vec::new();

    for &di in &deleted_half {
        let path = ctx.pairs[di].pre.path.clone();
        let Some(pos) = added_half
            .iter()
            .position(|&ai| ctx.pairs[ai].post.path == path)
        else {
            continue;
        };
        let ai = added_half.remove(pos);

        let pre_bytes = ctx.pairs[di].pre.bytes().map(<[u8]>::to_vec);
        let post_bytes = ctx.pairs[ai].post.bytes().map(<[u8]>::to_vec);
        let score = match (pre_bytes, post_bytes) {
            (Some(pre), Some(post)) => similarity(&pre, &post),
            _ => 1,
        };

        let pre = std::mem::replace(&mut ctx.pairs[di].pre, crate::filespec::FileSpec::invalid(Vec::new()));
        let post = std::mem::replace(&mut ctx.pairs[ai].post, crate::filespec::FileSpec::invalid(Vec::new()));

        let mut merged = crate::filepair::FilePair::new(pre, post);
        merged.status = Status::Modified;
        // A rewrite is only ever merged back when the content sketch fell
        // below the rename threshold in the first place; that non-zero
        // score is what tells formatters "this looks unrelated enough to
        // call a severe rewrite" even though it resolves as `Modified`.
        merged.score = score.max(1);
        rejoined.push(merged);

        to_remove.push(di);
        to_remove.push(ai);
    }

    if rejoined.is_empty() {
        return;
    }

    ctx.stats.merged_back += rejoined.len();
    let remove_set: std::collections::HashSet<usize> = to_remove.into_iter().collect();
    let mut i = 0;
    ctx.pairs.retain(|_| {
        let keep = !remove_set.contains(&i);
        i += 1;
        keep
    });
    ctx.pairs.extend(rejoined);
}
