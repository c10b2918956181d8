use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cli::render;
use filetrack_core::config;
use filetrack_core::Tracker;
use std::path::Path;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut cfg = config::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        cfg.store.path = db;
    }
    debug!(store = %cfg.store.path, "opening store");
    let tracker = Tracker::from_config(&cfg)
        .with_context(|| format!("failed to open store {}", cfg.store.path))?;

    match cli.command {
        Commands::Add { path, recursive, json } => run_add(&tracker, &path, recursive, json),
        Commands::List { json } => {
            render::print_records(&tracker.list_files(), "All tracked files", json)
        }
        Commands::Search {
            query,
            filename_only,
            json,
        } => {
            let results = if filename_only {
                tracker.find_by_filename(&query)
            } else {
                tracker.search_by_name(&query)
            };
            render::print_records(&results, &format!("Search results for: {query}"), json)
        }
        Commands::Tagged { tag, json } => render::print_records(
            &tracker.search_by_tag(&tag),
            &format!("Files tagged with: {tag}"),
            json,
        ),
        Commands::Tag { path, tag } => run_tag(&tracker, &path, &tag),
        Commands::Untag { path, tag } => {
            if tracker.remove_tag(&path, &tag)? {
                println!("Removed tag '{tag}' from {path}");
            } else {
                println!("{path} has no tag '{tag}'");
            }
            Ok(())
        }
        Commands::Rm { path, recursive } => {
            let removed = tracker.untrack(&path, recursive)?;
            if removed == 0 {
                bail!("not tracked: {path}");
            }
            println!("Stopped tracking {removed} path(s)");
            Ok(())
        }
        Commands::Meta { path, json } => {
            let Some(item) = tracker.file_meta(&path) else {
                bail!("file not found in tracking database: {path}");
            };
            if json {
                return render::print_json(&item);
            }
            for line in render::meta_lines(&item) {
                println!("{line}");
            }
            Ok(())
        }
        Commands::Update { json } => {
            let summary = tracker.refresh_database()?;
            if json {
                return render::print_json(&summary);
            }
            println!("Database update results:");
            println!("Updated: {} files", summary.updated);
            println!("Failed: {} files", summary.failed);
            println!("Total: {} files", summary.total);
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(name = "filetrack")]
#[command(about = "Track metadata and tags for files and directories", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<String>,

    /// Store file path (overrides config)
    #[arg(long)]
    db: Option<String>,

    /// Debug logging for filetrack crates
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track a file or directory
    Add {
        path: String,
        /// Track every file under a directory instead of the directory itself
        #[arg(short, long, default_value_t = false)]
        recursive: bool,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// List all tracked files
    List {
        #[arg(long)]
        json: bool,
    },
    /// Search tracked paths and filenames (case-insensitive)
    Search {
        query: String,
        /// Match the filename only, not the full path
        #[arg(long, default_value_t = false)]
        filename_only: bool,
        #[arg(long)]
        json: bool,
    },
    /// List files carrying a tag
    Tagged {
        tag: String,
        #[arg(long)]
        json: bool,
    },
    /// Add a tag to a file, tracking it first if needed
    Tag { path: String, tag: String },
    /// Remove a tag from a tracked file
    Untag { path: String, tag: String },
    /// Stop tracking a path
    Rm {
        path: String,
        /// Also stop tracking everything beneath the path
        #[arg(short, long, default_value_t = false)]
        recursive: bool,
    },
    /// Show stored metadata for a tracked path
    Meta {
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// Re-probe every tracked path, dropping ones that are gone
    Update {
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "warn,filetrack=debug,filetrack_core=debug,storage=debug,cli=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_add(tracker: &Tracker, path: &str, recursive: bool, json: bool) -> Result<()> {
    let summary = tracker
        .add_path(path, recursive)
        .with_context(|| format!("failed to add {path}"))?;
    if json {
        return render::print_json(&summary);
    }
    if recursive && Path::new(path).is_dir() {
        println!("Successfully added {} files", summary.added);
        if summary.failed > 0 {
            println!("Failed to add {} files", summary.failed);
        }
    } else {
        println!("Successfully added: {path}");
    }
    Ok(())
}

fn run_tag(tracker: &Tracker, path: &str, tag: &str) -> Result<()> {
    if !Path::new(path).exists() {
        bail!("file not found: {path}");
    }
    if tracker
        .ensure_tracked(path)
        .context("could not add file to tracking system")?
    {
        println!("Now tracking {path}");
    }
    if tracker.add_tag(path, tag)? {
        println!("Added tag '{tag}' to {path}");
    } else {
        println!("{path} already has tag '{tag}'");
    }
    Ok(())
}
