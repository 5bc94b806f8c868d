//! Pagecraft operator CLI. Drives the page lifecycle over a local RocksDB store.
//!
//! ```text
//! pagecraft [--data DIR] [--tenant T] [--locale L] <command> [args]
//! ```
//!
//! Acts as a full-access local operator. Results are printed as JSON.
//! `PAGECRAFT_DATA`, `PAGECRAFT_TENANT` and `PAGECRAFT_LOCALE` select the
//! store directory and the tenant/locale partition; `RUST_LOG` controls
//! logging.

use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use pagecraft_core::PageUpdate;
use pagecraft_pages::{
    Identity, MemorySearchIndex, PageError, PageService, RocksStore, StaticSecurity, StoreConfig,
};

#[derive(Debug, Parser)]
#[command(name = "pagecraft")]
#[command(about = "Pagecraft page lifecycle operator", long_about = None)]
struct Cli {
    /// Store directory
    #[arg(long, global = true, env = "PAGECRAFT_DATA", default_value = "pagecraft_data")]
    data: PathBuf,

    #[arg(long, global = true, env = "PAGECRAFT_TENANT", default_value = "root")]
    tenant: String,

    #[arg(long, global = true, env = "PAGECRAFT_LOCALE", default_value = "en-US")]
    locale: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
enum Command {
    /// Create a draft page in a category
    Create { category: String },
    /// Show a revision (pid#0001) or the latest revision (pid)
    Get { id: String },
    /// Change the title of a revision
    Title { id: String, title: String },
    /// Change the path of a revision
    Path { id: String, path: String },
    /// Publish a revision
    Publish { id: String },
    /// Unpublish a revision
    Unpublish { id: String },
    /// Request review of a revision
    Review { id: String },
    /// Create a new revision from an existing one
    From { id: String },
    /// Delete a revision (version 1 deletes the page)
    Delete { id: String },
    /// List every revision of a page
    Revisions { id: String },
    /// Show the page published at a path
    ByPath { path: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn execute(pages: &PageService, command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Create { category } => print_json(&pages.create(&category).await?),
        Command::Get { id } => print_json(&pages.get(&id).await?),
        Command::Title { id, title } => {
            print_json(&pages.update(&id, &PageUpdate::title(title)).await?)
        }
        Command::Path { id, path } => {
            print_json(&pages.update(&id, &PageUpdate::path(path)).await?)
        }
        Command::Publish { id } => print_json(&pages.publish(&id).await?),
        Command::Unpublish { id } => print_json(&pages.unpublish(&id).await?),
        Command::Review { id } => print_json(&pages.request_review(&id).await?),
        Command::From { id } => print_json(&pages.create_from(&id).await?),
        Command::Delete { id } => print_json(&pages.delete(&id).await?),
        Command::Revisions { id } => print_json(&pages.list_page_revisions(&id).await?),
        Command::ByPath { path } => print_json(&pages.get_published_by_path(&path).await?),
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let store = RocksStore::open(StoreConfig {
        path: cli.data,
        ..StoreConfig::default()
    })?;
    let operator = Identity::new("operator", "Local operator", "admin");
    let security = StaticSecurity::full_access(operator, cli.tenant.as_str(), cli.locale.as_str());
    let pages = PageService::builder(
        Arc::new(store),
        Arc::new(MemorySearchIndex::new()),
        Arc::new(security),
    )
    .build();

    info!(
        "Running {:?} for tenant {} ({})",
        cli.command, cli.tenant, cli.locale
    );
    execute(&pages, cli.command).await
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<PageError>() {
                Some(page_error) => eprintln!("error [{}]: {page_error}", page_error.code()),
                None => eprintln!("error: {e}"),
            }
            ExitCode::FAILURE
        }
    }
}
