//! The diff queue (§3 Queue, §9 "Global diff queue" design note).
//!
//! The original keeps one process-wide queue; we surface it as an explicit
//! `DiffContext` owning a `Vec<FilePair>` instead, so nothing here is truly
//! global — callers thread the context through producers, the pipeline, and
//! the formatters, and two diff invocations in the same process never share
//! state by accident.

use crate::config::Config;
use crate::filepair::FilePair;

/// Counters the pipeline accumulates as it runs (skip-stat-unmatch drops,
/// pickaxe rejections, etc.) — surfaced for tests and for formatters that
/// report them (e.g. shortstat's summary line doesn't need these, but a
/// `--stat`-adjacent tool inspecting the context does).
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub skip_stat_unmatch_dropped: usize,
    pub broken: usize,
    pub merged_back: usize,
    pub renamed: usize,
    pub copied: usize,
}

/// The queue plus the configuration and stats that travel with one diff
/// invocation. Producers append; the pipeline mutates `pairs` in place;
/// formatters iterate it read-only once the pipeline has run.
pub struct DiffContext {
    pub pairs: Vec<FilePair>,
    pub config: Config,
    pub stats: PipelineStats,
}

impl DiffContext {
    pub fn new(config: Config) -> Self {
        Self {
            pairs: Vec::new(),
            config,
            stats: PipelineStats::default(),
        }
    }

    pub fn push(&mut self, pair: FilePair) {
        self.pairs.push(pair);
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filespec::FileSpec;
    use crate::index::EntryMode;

    #[test]
    fn push_appends_in_order() {
        let mut ctx = DiffContext::new(Config::default());
        ctx.push(FilePair::new(
            FileSpec::invalid("a"),
            FileSpec::from_bytes("a", EntryMode::Regular { executable: false }, b"x".to_vec()),
        ));
        ctx.push(FilePair::new(
            FileSpec::invalid("b"),
            FileSpec::from_bytes("b", EntryMode::Regular { executable: false }, b"y".to_vec()),
        ));
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.pairs[0].post.path, b"a");
        assert_eq!(ctx.pairs[1].post.path, b"b");
    }
}
