//! A thin inspection binary over `gitcore`: print an on-disk index, or diff
//! two on-disk trees and run the result through one of the format module's
//! formatters. There is no object store or ref storage behind this (§1
//! Non-goals) — `diff` walks two plain directories, not two commits.

use anyhow::Context;
use clap::{Parser, Subcommand};
use gitcore::config::{Config, OrderFile};
use gitcore::differ::DiffConfig;
use gitcore::filepair::FilePair;
use gitcore::filespec::FileSpec;
use gitcore::format;
use gitcore::index::{EntryMode, Stage};
use gitcore::pipeline::{self, filter::StatusFilter, pickaxe::Pickaxe, PipelineOptions};
use gitcore::queue::DiffContext;
use gitcore::repository::Repository;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new, empty working tree metadata directory.
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// List the entries of a repository's staging index.
    LsFiles {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Show stage numbers, mode, and hash alongside each path.
        #[arg(long)]
        stage: bool,
    },
    /// Diff two on-disk directory trees.
    Diff {
        old: PathBuf,
        new: PathBuf,

        #[arg(long)]
        stat: bool,
        #[arg(long)]
        numstat: bool,
        #[arg(long)]
        shortstat: bool,
        #[arg(long)]
        dirstat: bool,
        #[arg(long)]
        check: bool,
        #[arg(long = "word-diff")]
        word_diff: bool,
        #[arg(long = "patch-id")]
        patch_id: bool,

        #[arg(long = "find-renames")]
        find_renames: bool,
        #[arg(long = "find-copies")]
        find_copies: bool,
        #[arg(long = "break-rewrites")]
        break_rewrites: bool,
        #[arg(long = "diff-filter")]
        diff_filter: Option<String>,
        #[arg(short = 'S')]
        pickaxe_string: Option<String>,
        #[arg(short = 'G')]
        pickaxe_regex: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { path } => {
            let repo = Repository::init(&path)?;
            println!("initialized empty gitcore metadata at {}", repo.metadata_dir.display());
        }
        Commands::LsFiles { repo, stage } => ls_files(&repo, stage)?,
        Commands::Diff {
            old,
            new,
            stat,
            numstat,
            shortstat,
            dirstat,
            check,
            word_diff,
            patch_id,
            find_renames,
            find_copies,
            break_rewrites,
            diff_filter,
            pickaxe_string,
            pickaxe_regex,
        } => diff_dirs(DiffArgs {
            old,
            new,
            stat,
            numstat,
            shortstat,
            dirstat,
            check,
            word_diff,
            patch_id,
            find_renames,
            find_copies,
            break_rewrites,
            diff_filter,
            pickaxe_string,
            pickaxe_regex,
        })?,
    }
    Ok(())
}

fn ls_files(repo_path: &Path, stage: bool) -> anyhow::Result<()> {
    let repo = Repository::discover(repo_path)?;
    let index = gitcore::index::Index::open(repo.index_path())
        .with_context(|| format!("failed to open index at {}", repo.index_path().display()))?;

    for entry in index.entries() {
        let name = String::from_utf8_lossy(&entry.name);
        if stage {
            println!(
                "{:06o} {} {}\t{}",
                entry.mode.to_raw(),
                entry.hash,
                stage_number(entry.stage),
                name
            );
        } else {
            println!("{name}");
        }
    }
    Ok(())
}

fn stage_number(stage: Stage) -> u16 {
    match stage {
        Stage::Merged => 0,
        Stage::Base => 1,
        Stage::Ours => 2,
        Stage::Theirs => 3,
    }
}

struct DiffArgs {
    old: PathBuf,
    new: PathBuf,
    stat: bool,
    numstat: bool,
    shortstat: bool,
    dirstat: bool,
    check: bool,
    word_diff: bool,
    patch_id: bool,
    find_renames: bool,
    find_copies: bool,
    break_rewrites: bool,
    diff_filter: Option<String>,
    pickaxe_string: Option<String>,
    pickaxe_regex: Option<String>,
}

fn diff_dirs(args: DiffArgs) -> anyhow::Result<()> {
    let mut config = Config::default();
    if args.find_copies {
        config.diff_renames = gitcore::config::RenameMode::Copies;
    } else if args.find_renames {
        config.diff_renames = gitcore::config::RenameMode::Renames;
    }

    let mut ctx = DiffContext::new(config);
    for pair in build_pairs(&args.old, &args.new)? {
        ctx.push(pair);
    }

    let pickaxe = match (&args.pickaxe_string, &args.pickaxe_regex) {
        (Some(s), _) => Some(Pickaxe::count_string(s.as_bytes().to_vec())),
        (None, Some(pattern)) => {
            Some(Pickaxe::regex(regex::bytes::Regex::new(pattern).context("invalid -G pattern")?))
        }
        (None, None) => None,
    };

    let options = PipelineOptions {
        skip_stat_unmatch: false,
        detect_breaks: args.break_rewrites,
        pickaxe,
        order: None::<OrderFile>,
        filter: args.diff_filter.as_deref().map(StatusFilter::parse),
    };
    // `diff_dirs` never touches the working tree again once bytes are
    // loaded, so any root will do for fill_mmfile's already-resident data.
    let root = args.new.clone();
    pipeline::run(&mut ctx, &root, &options);

    let cfg = DiffConfig::default();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if args.stat {
        format::stat::write_stat(&mut out, &mut ctx, &root, &cfg, 80)?;
    } else if args.numstat {
        format::stat::write_numstat(&mut out, &mut ctx, &root, &cfg, false)?;
    } else if args.shortstat {
        format::stat::write_shortstat(&mut out, &mut ctx, &root, &cfg)?;
    } else if args.dirstat {
        for line in format::dirstat::write_dirstat(&mut ctx, &root, 3, false) {
            println!("{line}");
        }
    } else if args.check {
        let (violations, any_errors) = format::check::check(&mut ctx, &root);
        for v in &violations {
            println!("{v}");
        }
        if any_errors {
            std::process::exit(2);
        }
    } else if args.word_diff {
        for pair in ctx.pairs.iter_mut() {
            let pre = format::fill_mmfile_pub(&mut pair.pre, &root).to_vec();
            let post = format::fill_mmfile_pub(&mut pair.post, &root).to_vec();
            let segments = format::word_diff::word_diff(&pre, &post, None);
            println!("{}", format::word_diff::render(&segments));
        }
    } else if args.patch_id {
        println!("{}", format::patch_id::patch_id(&mut ctx, &root));
    } else {
        format::patch::write_all(&mut out, &mut ctx, &root, &cfg)?;
    }

    Ok(())
}

/// Walk both trees and build one `FilePair` per path in their union, with
/// the side missing from one tree represented by `FileSpec::invalid`.
fn build_pairs(old_root: &Path, new_root: &Path) -> anyhow::Result<Vec<FilePair>> {
    let old_paths = walk_relative(old_root)?;
    let new_paths = walk_relative(new_root)?;

    let mut all_paths: BTreeSet<String> = BTreeSet::new();
    all_paths.extend(old_paths.iter().cloned());
    all_paths.extend(new_paths.iter().cloned());

    let mut pairs = Vec::new();
    for path in all_paths {
        let pre = if old_paths.contains(&path) {
            read_spec(old_root, &path)?
        } else {
            FileSpec::invalid(path.clone())
        };
        let post = if new_paths.contains(&path) {
            read_spec(new_root, &path)?
        } else {
            FileSpec::invalid(path.clone())
        };
        pairs.push(FilePair::new(pre, post));
    }
    Ok(pairs)
}

fn walk_relative(root: &Path) -> anyhow::Result<BTreeSet<String>> {
    if !root.exists() {
        return Ok(BTreeSet::new());
    }
    let mut paths = BTreeSet::new();
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() && !entry.file_type().is_symlink() {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        paths.insert(rel.to_string_lossy().replace('\\', "/"));
    }
    Ok(paths)
}

fn read_spec(root: &Path, rel_path: &str) -> anyhow::Result<FileSpec> {
    let full = root.join(rel_path);
    let metadata = std::fs::symlink_metadata(&full)
        .with_context(|| format!("failed to stat {}", full.display()))?;

    if metadata.file_type().is_symlink() {
        let target = std::fs::read_link(&full)?;
        let bytes = target.to_string_lossy().into_owned().into_bytes();
        return Ok(FileSpec::from_bytes(rel_path, EntryMode::Symlink, bytes));
    }

    let bytes = std::fs::read(&full).with_context(|| format!("failed to read {}", full.display()))?;
    let executable = is_executable(&metadata);
    Ok(FileSpec::from_bytes(rel_path, EntryMode::Regular { executable }, bytes))
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    false
}
