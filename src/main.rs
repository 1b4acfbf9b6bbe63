//! Tag tree viewer
//!
//! Prints the tag forest stored in a SQLite database.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use tag_store::{init_db, CachedTagStore, SqliteTagRepository};
use tag_tree::{SyncBus, TagManager, TagPanel, TagTreeConfig};

#[derive(Parser, Debug)]
#[command(name = "tag-tree", version, about = "Print the tag tree stored in a database", long_about = None)]
struct Cli {
    /// SQLite database holding the tags (created if missing)
    db_path: PathBuf,

    /// Only show tags matching this term, with their parents and children
    search: Option<String>,

    /// TOML config file
    #[arg(short, long, env = "TAG_TREE_CONFIG")]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<TagTreeConfig> {
    match path {
        Some(path) => TagTreeConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(TagTreeConfig::default()),
    }
}

fn render(panel: &TagPanel) -> String {
    let mut out = String::new();
    for row in panel.visible() {
        let marker = match (row.has_children, row.expanded) {
            (true, true) => "v",
            (true, false) => ">",
            _ => "-",
        };
        let tag = &row.record;
        let mut flags = Vec::new();
        if tag.is_pinned {
            flags.push("pinned");
        }
        if panel.favorites().contains(&tag.name) {
            flags.push("fav");
        }
        out.push_str(&format!(
            "{}{} {} ({})",
            "  ".repeat(row.level),
            marker,
            tag.name,
            panel.resolved_color(tag)
        ));
        if !flags.is_empty() {
            out.push_str(&format!(" [{}]", flags.join(", ")));
        }
        out.push('\n');
    }
    out
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let log_dir = cli
        .db_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    if let Err(e) = rolling_logger::init_logger(&log_dir, "tag-tree") {
        eprintln!("logging disabled: {}", e);
    }

    let config = load_config(cli.config.as_deref())?;
    let db = init_db(&cli.db_path)
        .await
        .with_context(|| format!("opening {}", cli.db_path.display()))?;
    let store = Arc::new(CachedTagStore::new(SqliteTagRepository::new(db.connection())));
    let manager = TagManager::new(store, SyncBus::new(config.bus_capacity), config);
    manager.refresh().await.context("loading tags")?;

    let mut panel = manager.new_panel();
    panel.refresh(manager.store().as_ref()).await?;
    panel.expand_all();
    if let Some(term) = &cli.search {
        panel.set_search(term);
    }
    while panel.load_more() {}

    tracing::info!(rows = panel.visible().len(), "rendered tag tree");
    print!("{}", render(&panel));
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
