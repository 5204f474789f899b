//! Stage 7: resolve each pair's final `Status` from its shape (§4.4 step 7).
//! Rename/copy/unmerged pairs were already classified by earlier stages and
//! are left untouched; everything else is decided here from validity and
//! mode alone, mirroring `diff_unmerge`/`run_diff`'s final dispatch.

use crate::filepair::Status;
use crate::index::EntryMode;
use crate::queue::DiffContext;

/// Coarse mode family, ignoring the executable bit, for type-change detection.
fn mode_kind(mode: EntryMode) -> u8 {
    match mode {
        EntryMode::Regular { .. } => 0,
        EntryMode::Symlink => 1,
        EntryMode::Gitlink => 2,
        EntryMode::Unmerged => 3,
    }
}

fn resolve_one(pair: &crate::filepair::FilePair) -> Status {
    if pair.unmerged {
        return Status::Unmerged;
    }
    match (pair.pre.is_valid(), pair.post.is_valid()) {
        (false, false) => Status::Unknown,
        (false, true) => Status::Added,
        (true, false) => Status::Deleted,
        (true, true) => {
            let pre_mode = pair.pre.mode;
            let post_mode = pair.post.mode;
            if pre_mode.map(mode_kind) != post_mode.map(mode_kind) {
                Status::TypeChanged
            } else {
                // Identical content and mode still resolves as `Modified`;
                // producers are expected to skip unchanged pairs upstream
                // (skip-stat-unmatch), so this stage stays total rather than
                // special-casing a shape that shouldn't reach it.
                Status::Modified
            }
        }
    }
}

pub fn run(ctx: &mut DiffContext) {
    for pair in ctx.pairs.iter_mut() {
        if matches!(pair.status, Status::Renamed | Status::Copied | Status::Unmerged) {
            continue;
        }
        pair.status = resolve_one(pair);
    }
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
    fn add_delete_modify_are_resolved_from_shape() {
        let mut ctx = DiffContext::new(Config::default());
        ctx.push(FilePair::new(
            FileSpec::invalid("new"),
            FileSpec::from_bytes("new", mode(), b"x".to_vec()),
        ));
        ctx.push(FilePair::new(
            FileSpec::from_bytes("old", mode(), b"x".to_vec()),
            FileSpec::invalid("old"),
        ));
        ctx.push(FilePair::new(
            FileSpec::from_bytes("mod", mode(), b"x".to_vec()),
            FileSpec::from_bytes("mod", mode(), b"y".to_vec()),
        ));

        run(&mut ctx);
        assert_eq!(ctx.pairs[0].status, Status::Added);
        assert_eq!(ctx.pairs[1].status, Status::Deleted);
        assert_eq!(ctx.pairs[2].status, Status::Modified);
    }

    #[test]
    fn mode_kind_change_is_a_type_change() {
        let mut ctx = DiffContext::new(Config::default());
        ctx.push(FilePair::new(
            FileSpec::from_bytes("p", EntryMode::Regular { executable: false }, b"x".to_vec()),
            FileSpec::from_bytes("p", EntryMode::Symlink, b"target".to_vec()),
        ));
        run(&mut ctx);
        assert_eq!(ctx.pairs[0].status, Status::TypeChanged);
    }

    #[test]
    fn already_renamed_pairs_are_left_alone() {
        let mut ctx = DiffContext::new(Config::default());
        let mut pair = FilePair::new(
            FileSpec::from_bytes("old", mode(), b"x".to_vec()),
            FileSpec::from_bytes("new", mode(), b"x".to_vec()),
        );
        pair.status = Status::Renamed;
        ctx.push(pair);
        run(&mut ctx);
        assert_eq!(ctx.pairs[0].status, Status::Renamed);
    }
}
