#![forbid(unsafe_code)]

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

mod cli;
mod config;
mod db;
mod utils;

use cli::{Cli, Command};
use config::Config;
use db::Bootstrap;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply_to(&mut config);
    config.validate()?;

    utils::logging::init_tracing(&config.logging);
    debug!(?config, "configuration loaded");

    match cli.command() {
        Command::Init => init(&config).await,
        Command::Status { limit, offset } => status(&config, limit, offset).await,
    }
}

async fn init(config: &Config) -> Result<ExitCode> {
    let bootstrap = Bootstrap::from_config(&config.database, &config.engine)?;
    let mut stdout = std::io::stdout();

    match bootstrap.run(&mut stdout).await {
        Ok(outcome) => {
            debug!(?outcome, "bootstrap finished");
            Ok(ExitCode::SUCCESS)
        }
        // The engine has already reported its own diagnostics.
        Err(e) => {
            debug!("bootstrap of {} failed: {e}", bootstrap.db_path().display());
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}

#[cfg(feature = "sqlite")]
async fn status(config: &Config, limit: i64, offset: i64) -> Result<ExitCode> {
    use db::{DemoStore, SqliteDemoStore};

    let store = SqliteDemoStore::new(&config.database.filename);
    let users = store.count_users().await?;
    let posts = store.count_posts().await?;

    let journal = store.journal_mode().await?;

    println!("{} (journal: {journal})", config.database.filename.display());
    println!("users: {users}");
    for user in store.list_users(limit, offset).await? {
        println!("  #{} {}", user.id, user.name);
    }
    println!("posts: {posts}");
    for post in store.list_posts(limit, offset).await? {
        println!("  #{} {}", post.id, post.title);
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(not(feature = "sqlite"))]
async fn status(_config: &Config, _limit: i64, _offset: i64) -> Result<ExitCode> {
    anyhow::bail!("status requires the sqlite feature")
}
