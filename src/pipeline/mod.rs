//! The fixed eight-step pipeline that rewrites a `DiffContext`'s queue in
//! place (§4.4). Each stage lives in its own module, grounded the way the
//! teacher keeps one file per concern; `run` wires them in spec order.

pub mod r#break;
pub mod filter;
pub mod merge_broken;
pub mod order;
pub mod pickaxe;
pub mod rename;
pub mod resolve_status;
pub mod skip_stat_unmatch;

use crate::config::OrderFile;
use crate::queue::DiffContext;
use std::path::Path;

/// Flags toggling individual stages, mirroring the CLI switches that
/// disable each one (`--no-renames`, `-S`/`-G`, `--diff-filter`, ...).
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub skip_stat_unmatch: bool,
    pub detect_breaks: bool,
    pub pickaxe: Option<pickaxe::Pickaxe>,
    pub order: Option<OrderFile>,
    pub filter: Option<filter::StatusFilter>,
}

/// Run all eight stages, in the fixed order the spec names, over `ctx`.
/// `root` is the working-tree root used by stages that must materialise
/// file contents (skip-stat-unmatch, rename content sketches).
pub fn run(ctx: &mut DiffContext, root: &Path, options: &PipelineOptions) {
    tracing::debug!(pairs = ctx.pairs.len(), "pipeline starting");
    if options.skip_stat_unmatch {
        skip_stat_unmatch::run(ctx, root);
        tracing::trace!(pairs = ctx.pairs.len(), "skip_stat_unmatch stage done");
    }
    if options.detect_breaks {
        r#break::run(ctx);
        tracing::trace!(pairs = ctx.pairs.len(), "break stage done");
    }
    if ctx.config.detect_renames() || ctx.config.detect_copies() {
        rename::run(ctx, root);
        tracing::trace!(pairs = ctx.pairs.len(), "rename stage done");
    }
    merge_broken::run(ctx);
    tracing::trace!(pairs = ctx.pairs.len(), "merge_broken stage done");
    if let Some(pickaxe) = &options.pickaxe {
        pickaxe::run(ctx, root, pickaxe);
        tracing::trace!(pairs = ctx.pairs.len(), "pickaxe stage done");
    }
    if let Some(order) = &options.order {
        order::run(ctx, order);
        tracing::trace!("order stage done");
    }
    resolve_status::run(ctx);
    tracing::trace!("resolve_status stage done");
    if let Some(filter) = &options.filter {
        filter::run(ctx, filter);
        tracing::trace!(pairs = ctx.pairs.len(), "filter stage done");
    }
    tracing::debug!(pairs = ctx.pairs.len(), stats = ?ctx.stats, "pipeline complete");
}
