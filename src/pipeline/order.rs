//! Stage 6: reorder the queue by an orderfile (§4.4 step 6). A stable sort
//! keyed on each pair's display path — the post path, or the pre path when
//! the pair has no post (a pure delete) — so pairs matching no pattern keep
//! their relative order at the tail, per `OrderFile::rank`'s contract.

use crate::config::OrderFile;
use crate::queue::DiffContext;

fn display_path(pair: &crate::filepair::FilePair) -> &[u8] {
    if pair.post.is_valid() {
        &pair.post.path
    } else {
        &pair.pre.path
    }
}

pub fn run(ctx: &mut DiffContext, order: &OrderFile) {
    ctx.pairs
        .sort_by_key(|pair| order.rank(display_path(pair)));
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
    fn matching_patterns_sort_before_unmatched_paths() {
        let mut ctx = DiffContext::new(Config::default());
        ctx.push(FilePair::new(
            FileSpec::invalid("src/main.rs"),
            FileSpec::from_bytes("src/main.rs", mode(), b"x".to_vec()),
        ));
        ctx.push(FilePair::new(
            FileSpec::invalid("README.md"),
            FileSpec::from_bytes("README.md", mode(), b"x".to_vec()),
        ));
        ctx.push(FilePair::new(
            FileSpec::invalid("Cargo.toml"),
            FileSpec::from_bytes("Cargo.toml", mode(), b"x".to_vec()),
        ));

        let order = OrderFile::parse("Cargo.toml\n*.md\n");
        run(&mut ctx, &order);

        let paths: Vec<String> = ctx
            .pairs
            .iter()
            .map(|p| String::from_utf8_lossy(&p.post.path).into_owned())
            .collect();
        assert_eq!(paths, vec!["Cargo.toml", "README.md", "src/main.rs"]);
    }

    #[test]
    fn unmatched_paths_keep_their_relative_order() {
        let mut ctx = DiffContext::new(Config::default());
        ctx.push(FilePair::new(
            FileSpec::invalid("b.txt"),
            FileSpec::from_bytes("b.txt", mode(), b"x".to_vec()),
        ));
        ctx.push(FilePair::new(
            FileSpec::invalid("a.txt"),
            FileSpec::from_bytes("a.txt", mode(), b"x".to_vec()),
        ));

        let order = OrderFile::parse("*.md\n");
        run(&mut ctx, &order);

        let paths: Vec<String> = ctx
            .pairs
            .iter()
            .map(|p| String::from_utf8_lossy(&p.post.path).into_owned())
            .collect();
        assert_eq!(paths, vec!["b.txt", "a.txt"]);
    }
}
