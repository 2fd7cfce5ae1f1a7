//! Command line entry point.

pub mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::app::directives::DirectiveFile;
use crate::app::evaluator::{EvaluatorOptions, ItemEvaluator};
use crate::domain::model::ProjectItem;
use crate::infra::config::Config;
use crate::infra::fs::{CachingFileSystem, FileSystem, ManagedFileSystem};
use render::{OutputFormat, render};

#[derive(Parser)]
#[command(author, version, about = "Evaluate item include/remove directives", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a TOML directive file and print the resulting items
    Eval {
        directives: PathBuf,
        /// Directory item paths are relative to (defaults to the file's `project_directory`)
        #[arg(long)]
        project_dir: Option<PathBuf>,
        /// Only print this item type
        #[arg(long)]
        item_type: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Eval {
            directives,
            project_dir,
            item_type,
            format,
        } => eval(&directives, project_dir, item_type, format),
    }
}

fn eval(
    directives: &Path,
    project_dir: Option<PathBuf>,
    item_type: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let file = DirectiveFile::load(directives)?;
    let project_dir = project_dir.unwrap_or_else(|| file.project_directory_for(directives));
    let project_dir = std::path::absolute(&project_dir)
        .with_context(|| format!("invalid project directory: {}", project_dir.display()))?;

    let config = Config::load_for(&project_dir)?;
    crate::init(&config);
    tracing::debug!(project = %project_dir.display(), directives = file.items.len(), "evaluating");

    let mut evaluator = ItemEvaluator::<ProjectItem>::new(
        &project_dir,
        file_system(&config),
        EvaluatorOptions::from(&config),
    );
    evaluator.add_elements(&file.items)?;

    let evaluated = match item_type {
        Some(requested) => {
            let name = evaluator
                .item_types()
                .find(|known| known.eq_ignore_ascii_case(&requested))
                .map(str::to_owned)
                .unwrap_or(requested);
            let items = evaluator.items(&name)?;
            vec![(name, items)]
        }
        None => evaluator.evaluate()?,
    };

    println!("{}", render(&evaluated, format)?);
    Ok(())
}

fn file_system(config: &Config) -> Arc<dyn FileSystem> {
    let managed: Arc<dyn FileSystem> =
        Arc::new(ManagedFileSystem::new().with_follow_links(config.file_system.follow_links()));
    if config.file_system.cache_enumerations() {
        Arc::new(CachingFileSystem::new(managed))
    } else {
        managed
    }
}
