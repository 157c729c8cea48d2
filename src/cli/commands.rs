use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::logging::init_logging;
use crate::repository::{Repository, StorePaths};
use crate::search::{MIN_QUERY_LEN, MatchSource, SearchEngine};
use crate::utils::{format_path_with_tilde, get_data_dir, resolve_directory};

#[derive(Parser)]
#[command(name = "imgseek")]
#[command(version = "0.1.0")]
#[command(about = "Search your image directories by file name", long_about = None)]
pub struct Cli {
    /// Directory holding the data files [default: $IMGSEEK_DATA_DIR or the platform data dir]
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reference a directory and index the images it contains
    Add { path: PathBuf },
    /// Stop referencing a directory and forget its images
    Remove { id: i32 },
    /// Re-index the images of a referenced directory
    Rescan {
        #[arg(required_unless_present = "all")]
        id: Option<i32>,
        /// Rescan every referenced directory
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
    /// List referenced directories
    List {
        #[arg(long)]
        json: bool,
    },
    /// Search images by file name
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Record that an image was picked and print its path
    Use { id: i32 },
    /// Show statistics about the database
    Stats,
}

/// One search result as printed by `search --json`
#[derive(Debug, Serialize)]
struct SearchHit<'a> {
    id: i32,
    dir_id: i32,
    usage: i32,
    file_name: &'a str,
    title: String,
    path: Option<PathBuf>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let Some(command) = &cli.command else {
        println!("Use --help for usage information");
        return Ok(());
    };

    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => get_data_dir()?,
    };
    let mut repo = open_repository(&data_dir)?;

    match command {
        Commands::Add { path } => add_directory(&mut repo, path),
        Commands::Remove { id } => remove_directory(&mut repo, *id),
        Commands::Rescan { id, all } => rescan(&mut repo, *id, *all),
        Commands::List { json } => list_directories(&repo, *json),
        Commands::Search { query, json } => search(&repo, query, *json),
        Commands::Use { id } => use_image(&mut repo, *id),
        Commands::Stats => show_stats(&repo, &data_dir),
    }
}

fn open_repository(data_dir: &Path) -> Result<Repository> {
    Repository::open(&StorePaths::in_dir(data_dir))
        .with_context(|| format!("Failed to open image database in {}", data_dir.display()))
}

fn add_directory(repo: &mut Repository, path: &Path) -> Result<()> {
    let path = resolve_directory(path)?;

    match repo.add_directory(&path)? {
        Some(dir) => {
            println!("Added directory {}: {} ({} images)", dir.id, dir.full_path, dir.image_count)
        }
        None => println!("Already referenced: {}", path.display()),
    }
    Ok(())
}

fn remove_directory(repo: &mut Repository, id: i32) -> Result<()> {
    let Some(dir) = repo.remove_directory(id)? else {
        bail!("No referenced directory with ID {}", id);
    };

    println!("Removed directory {}: {} ({} images)", dir.id, dir.full_path, dir.image_count);
    Ok(())
}

fn rescan(repo: &mut Repository, id: Option<i32>, all: bool) -> Result<()> {
    let ids: Vec<i32> = match id {
        Some(id) if !all => vec![id],
        _ => repo.directories().iter().map(|dir| dir.id).collect(),
    };

    for id in ids {
        let Some(dir) = repo
            .rescan_directory(id)
            .with_context(|| format!("Failed to rescan directory {}", id))?
        else {
            bail!("No referenced directory with ID {}", id);
        };
        println!("Rescanned directory {}: {} ({} images)", dir.id, dir.full_path, dir.image_count);
    }
    Ok(())
}

fn list_directories(repo: &Repository, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(repo.directories())
            .context("Failed to serialize directories")?;
        println!("{}", out);
        return Ok(());
    }

    if repo.directories().is_empty() {
        println!("No directories referenced. Add one with `imgseek add <PATH>`.");
        return Ok(());
    }

    for dir in repo.directories() {
        println!(
            "{:>4}  {:>6} images  {}",
            dir.id,
            dir.image_count,
            format_path_with_tilde(&dir.path())
        );
    }
    Ok(())
}

fn search(repo: &Repository, query: &str, json: bool) -> Result<()> {
    let mut engine = SearchEngine::new();
    let outcome = engine.search(repo, query);

    let hits: Vec<SearchHit> = engine
        .result_images(repo)
        .into_iter()
        .map(|img| SearchHit {
            id: img.id,
            dir_id: img.dir_id,
            usage: img.usage,
            file_name: &img.file_name,
            title: img.display_title(),
            path: engine.resolve_full_path(repo, img),
        })
        .collect();

    if json {
        let out = serde_json::to_string_pretty(&hits).context("Failed to serialize results")?;
        println!("{}", out);
        return Ok(());
    }

    if outcome.source == MatchSource::TooShort {
        println!("Query must contain at least {} letters or digits", MIN_QUERY_LEN);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No matches");
        return Ok(());
    }

    for hit in &hits {
        let path = hit
            .path
            .as_deref()
            .map(format_path_with_tilde)
            .unwrap_or_else(|| "<directory removed>".to_string());
        println!("{:>6}  {:>4}  {}  {}", hit.id, hit.usage, hit.title, path);
    }
    if engine.match_count() > hits.len() {
        println!("({} of {} matches shown)", hits.len(), engine.match_count());
    }
    Ok(())
}

fn use_image(repo: &mut Repository, id: i32) -> Result<()> {
    let Some(path) = repo.lookup_image(id).and_then(|img| repo.image_full_path(img)) else {
        bail!("No usable image with ID {}", id);
    };

    repo.record_image_usage(id)?;
    println!("{}", path.display());
    Ok(())
}

fn show_stats(repo: &Repository, data_dir: &Path) -> Result<()> {
    let total_usage: i64 = repo.images().iter().map(|img| i64::from(img.usage)).sum();
    let used_images = repo.images().iter().filter(|img| img.usage > 0).count();

    println!("Image Database Statistics");
    println!("=========================");
    println!("Directories: {}", repo.directories().len());
    println!("Images: {}", repo.images().len());
    println!("  Used at least once: {}", used_images);
    println!("Total uses: {}", total_usage);
    println!();
    println!("Data directory: {}", format_path_with_tilde(data_dir));

    if let Some(top) = repo.images().iter().filter(|img| img.usage > 0).max_by_key(|img| img.usage) {
        println!("Most used: {} ({} uses)", top.file_name, top.usage);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_rescan_requires_id_or_all() {
        assert!(Cli::try_parse_from(["imgseek", "rescan"]).is_err());
        assert!(Cli::try_parse_from(["imgseek", "rescan", "3"]).is_ok());
        assert!(Cli::try_parse_from(["imgseek", "rescan", "--all"]).is_ok());
        assert!(Cli::try_parse_from(["imgseek", "rescan", "3", "--all"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["imgseek", "stats", "--data-dir", "/tmp/x", "-v"]).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Stats)));
    }
}
