//! `dirfind` - print the directory matching a short query.
//!
//! Intended to be wrapped by a shell function that `cd`s into the printed
//! path. Exit status is 0 when something was printed, 1 when nothing matched
//! or the lookup failed, 2 on usage errors.

mod output;
mod root;
mod vendor;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dirfind::{DepthLimit, Finder, FinderConfig, DEFAULT_MAX_RESULTS};

use crate::output::{render_list, select, Selection};
use crate::vendor::{vendor_parent, VENDOR_TOKEN};

/// Jump to a directory in a large source tree
#[derive(Parser, Debug)]
#[command(name = "dirfind")]
#[command(version)]
struct Args {
    /// Directory to find: a name, a trailing path such as `user/repo`, or a
    /// path. `^` jumps to the parent of the enclosing vendor directory.
    query: Option<String>,

    /// Pick a candidate from the numbered list printed by a previous run
    index: Option<usize>,

    /// Maximum search depth below the root; -1 for unlimited
    #[arg(short, long, default_value_t = 3, allow_negative_numbers = true)]
    depth: i64,

    /// Workspace root to search
    #[arg(long, env = "DIRFIND_ROOT")]
    root: Option<PathBuf>,

    /// Cache file location
    #[arg(long, env = "DIRFIND_CACHE")]
    cache: Option<PathBuf>,

    /// Maximum number of fuzzy candidates
    #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: usize,

    /// Log lookup decisions to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_target(false),
        )
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("dirfind: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let root = root::resolve_root(args.root)?;
    tracing::debug!(root = %root.display(), "resolved workspace root");

    let Some(query) = args.query else {
        println!("{}", root.display());
        return Ok(ExitCode::SUCCESS);
    };

    if query == VENDOR_TOKEN {
        let cwd = std::env::current_dir().context("cannot read current directory")?;
        if let Some(parent) = vendor_parent(&cwd) {
            println!("{}", parent.display());
            return Ok(ExitCode::SUCCESS);
        }
        tracing::debug!(cwd = %cwd.display(), "not inside a vendor directory");
    }

    let depth_limit = DepthLimit::try_from(args.depth).context("invalid --depth")?;
    let mut config = FinderConfig::new(root)
        .with_depth_limit(depth_limit)
        .with_max_results(args.max_results);
    if let Some(cache) = args.cache {
        config = config.with_cache_path(cache);
    }
    config.validate().context("invalid workspace root")?;

    let mut finder = Finder::new(config);
    let max_results = finder.config().max_results;
    let outcome = finder.find(&query, max_results);
    if let Some(error) = &outcome.persist_error {
        eprintln!("dirfind: warning: cache not saved: {error}");
    }
    tracing::debug!(
        stage = outcome.stage.as_str(),
        results = outcome.ranks.len(),
        persisted = outcome.persisted,
        "lookup finished"
    );

    let paths = outcome.ranks.iter().map(|rank| finder.resolve(rank)).collect();
    match select(paths, args.index)? {
        Selection::None => {
            eprintln!("no match found");
            Ok(ExitCode::FAILURE)
        }
        Selection::One(path) => {
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Selection::Many(paths) => {
            println!("{}", render_list(&paths));
            Ok(ExitCode::SUCCESS)
        }
    }
}
