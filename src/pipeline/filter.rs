//! Stage 8: `--diff-filter`-style status filtering (§4.4 step 8) — drop any
//! pair whose resolved `Status` code isn't in the allowed set.

use crate::filepair::Status;
use crate::queue::DiffContext;

/// The set of single-character status codes to keep (`A`, `D`, `M`, `R`,
/// `C`, `T`, `U`, `X`), built from `Status::code`.
#[derive(Debug, Clone)]
pub struct StatusFilter {
    allowed: Vec<char>,
}

impl StatusFilter {
    pub fn parse(spec: &str) -> Self {
        Self {
            allowed: spec.chars().filter(|c| !c.is_whitespace()).collect(),
        }
    }

    pub fn allows(&self, status: Status) -> bool {
        self.allowed.contains(&status.code())
    }
}

pub fn run(ctx: &mut DiffContext, filter: &StatusFilter) {
    ctx.pairs.retain(|pair| filter.allows(pair.status));
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
    fn only_allowed_statuses_survive() {
        let mut ctx = DiffContext::new(Config::default());
        let mut added = FilePair::new(
            FileSpec::invalid("a"),
            FileSpec::from_bytes("a", mode(), b"x".to_vec()),
        );
        added.status = Status::Added;
        let mut deleted = FilePair::new(
            FileSpec::from_bytes("b", mode(), b"x".to_vec()),
            FileSpec::invalid("b"),
        );
        deleted.status = Status::Deleted;
        ctx.push(added);
        ctx.push(deleted);

        run(&mut ctx, &StatusFilter::parse("A"));
        assert_eq!(ctx.pairs.len(), 1);
        assert_eq!(ctx.pairs[0].status, Status::Added);
    }

    #[test]
    fn empty_filter_drops_everything() {
        let mut ctx = DiffContext::new(Config::default());
        let mut pair = FilePair::new(
            FileSpec::from_bytes("a", mode(), b"x".to_vec()),
            FileSpec::from_bytes("a", mode(), b"y".to_vec()),
        );
        pair.status = Status::Modified;
        ctx.push(pair);

        run(&mut ctx, &StatusFilter::parse(""));
        assert!(ctx.pairs.is_empty());
    }
}
