//! Stage 1: drop pairs that stat flagged dirty but whose content is actually
//! identical (§4.4 step 1). Only applies to pairs where both sides are
//! valid, same mode, same size — anything else is left for later stages.

use crate::filepair::Status;
use crate::queue::DiffContext;
use std::path::Path;

pub fn run(ctx: &mut DiffContext, root: &Path) {
    let mut dropped = 0;
    ctx.pairs.retain_mut(|pair| {
        if pair.unmerged || !pair.pre.is_valid() || !pair.post.is_valid() {
            return true;
        }
        if pair.pre.mode != pair.post.mode {
            return true;
        }
        if pair.pre.size.is_some() && pair.post.size.is_some() && pair.pre.size != pair.post.size {
            return true;
        }

        let pre_bytes = match pair.pre.fill(root) {
            Ok(b) => b.to_vec(),
            Err(_) => return true,
        };
        let post_bytes = match pair.post.fill(root) {
            Ok(b) => b.to_vec(),
            Err(_) => return true,
        };

        if pre_bytes == post_bytes {
            dropped += 1;
            pair.status = Status::Undecided;
            false
        } else {
            true
        }
    });
    ctx.stats.skip_stat_unmatch_dropped += dropped;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::filepair::FilePair;
    use crate::filespec::FileSpec;
    use crate::index::EntryMode;

    #[test]
    fn identical_content_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x"), b"hello\n").unwrap();

        let mode = EntryMode::Regular { executable: false };
        let mut pre = FileSpec::invalid("x");
        pre.mode = Some(mode);
        let mut post = FileSpec::invalid("x");
        post.mode = Some(mode);

        let mut ctx = DiffContext::new(Config::default());
        ctx.push(FilePair::new(pre, post));

        run(&mut ctx, dir.path());
        assert!(ctx.pairs.is_empty());
        assert_eq!(ctx.stats.skip_stat_unmatch_dropped, 1);
    }

    #[test]
    fn different_size_is_left_for_later_stages() {
        let dir = tempfile::tempdir().unwrap();
        let mode = EntryMode::Regular { executable: false };
        let mut ctx = DiffContext::new(Config::default());
        ctx.push(FilePair::new(
            FileSpec::from_bytes("x", mode, b"a".to_vec()),
            FileSpec::from_bytes("x", mode, b"ab".to_vec()),
        ));
        run(&mut ctx, dir.path());
        assert_eq!(ctx.pairs.len(), 1);
    }
}
