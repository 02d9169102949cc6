//! flickr-curate: keep an album of your most interesting Flickr photos.
//!
//! Photos are ranked by Flickr's interestingness score. The top N go into a
//! new album, or replace the contents of an existing one. Every remote call
//! is retried with exponential backoff, and when the bulk membership update
//! is refused, photos are added one at a time.

#![warn(clippy::all)]

mod auth;
mod cli;
mod config;
mod flickr;
mod report;
pub mod retry;
mod shutdown;
mod sync;
mod types;
mod web;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use auth::store::TokenStore;
use cli::{Command, RunArgs, ServeArgs};
use config::{Config, RunConfig, Settings};
use report::ConsoleReporter;
use sync::{SyncOptions, SyncOutcome};

async fn require_token(config: &Config) -> anyhow::Result<auth::AccessToken> {
    let store = TokenStore::new(&config.config_dir);
    let (token, source) = auth::resolve_access_token(&store)
        .await
        .context("Not authenticated. Run `flickr-curate auth` first.")?;
    tracing::debug!(?source, user_nsid = %token.user_nsid, "Using access token");
    Ok(token)
}

/// Run the album sync once, or repeatedly with `--watch-with-interval`.
async fn run_sync(config: &Config, args: RunArgs) -> anyhow::Result<()> {
    let consumer = config.require_consumer()?;
    let token = require_token(config).await?;
    let client = auth::client_for(consumer, &token)?;

    let settings_path = config.settings_path();
    let settings = Settings::load(&settings_path).await;
    let run = RunConfig::resolve(&args, &settings);
    if args.save_settings {
        run.to_settings(&settings).save(&settings_path).await?;
        println!("Settings saved to {}", settings_path.display());
    }

    let request = run.request(&token.user_nsid);
    let options = SyncOptions {
        retry: run.retry.clone(),
        ..Default::default()
    };
    let reporter = ConsoleReporter;

    let Some(interval) = run.watch_with_interval else {
        let outcome = sync::run_album_sync(&client, &request, &options, &reporter).await?;
        warn_on_partial_failure(&outcome);
        return Ok(());
    };

    let shutdown_token = shutdown::install_signal_handler();
    loop {
        if shutdown_token.is_cancelled() {
            tracing::info!("Shutdown requested, exiting...");
            break;
        }

        match sync::run_album_sync(&client, &request, &options, &reporter).await {
            Ok(outcome) => warn_on_partial_failure(&outcome),
            Err(e) => tracing::error!("Run failed, will retry next cycle: {}", e),
        }

        if !wait_for_next_cycle(interval, &shutdown_token).await {
            break;
        }
    }
    Ok(())
}

/// Sleep until the next cycle. Returns `false` when shutdown interrupted the
/// wait.
async fn wait_for_next_cycle(interval: u64, shutdown_token: &CancellationToken) -> bool {
    if shutdown_token.is_cancelled() {
        tracing::info!("Shutdown requested, exiting...");
        return false;
    }
    tracing::info!("Waiting {} seconds...", interval);
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(interval)) => true,
        _ = shutdown_token.cancelled() => {
            tracing::info!("Shutdown during wait, exiting...");
            false
        }
    }
}

fn warn_on_partial_failure(outcome: &SyncOutcome) {
    if let SyncOutcome::Written {
        fallback: Some(result),
        ..
    } = outcome
    {
        if result.failed > 0 {
            tracing::warn!(
                added = result.added,
                failed = result.failed,
                "Some photos could not be added"
            );
        }
    }
}

async fn run_albums(config: &Config) -> anyhow::Result<()> {
    let consumer = config.require_consumer()?;
    let token = require_token(config).await?;
    let client = auth::client_for(consumer, &token)?;

    let albums = sync::resolver::list_all_albums(
        &client,
        &token.user_nsid,
        &retry::RetryConfig::default(),
        &ConsoleReporter,
    )
    .await?;

    if albums.is_empty() {
        println!("No albums found.");
        return Ok(());
    }
    println!("Albums:");
    for album in &albums {
        println!("  {:<20} {}", album.id, album.title);
    }
    println!();
    println!("{} album(s)", albums.len());
    Ok(())
}

async fn run_auth(config: &Config) -> anyhow::Result<()> {
    let consumer = config.require_consumer()?;
    let store = TokenStore::new(&config.config_dir);
    let token = auth::authenticate_interactive(consumer, &store).await?;
    println!();
    println!("Authenticated as: {}", token.user_nsid);
    println!("Token saved to {}", store.path().display());
    Ok(())
}

async fn run_export_token(config: &Config) -> anyhow::Result<()> {
    let store = TokenStore::new(&config.config_dir);
    let token = store.load().await.with_context(|| {
        format!(
            "No cached token at {}. Run `flickr-curate auth` first.",
            store.path().display()
        )
    })?;
    println!("{}", token.env_lines());
    Ok(())
}

async fn run_serve(config: &Config, args: ServeArgs) -> anyhow::Result<()> {
    let shutdown_token = shutdown::install_signal_handler();
    web::serve(config, &args.bind, shutdown_token).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env must be loaded before clap reads env fallbacks
    dotenv::dotenv().ok();
    let cli = cli::Cli::parse();

    let filter = cli.global.log_level.as_filter();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let config = Config::from_cli(&cli.global);
    tracing::debug!(?config, "Starting flickr-curate");

    match cli.command {
        Command::Run(args) => run_sync(&config, args).await,
        Command::Albums => run_albums(&config).await,
        Command::Auth => run_auth(&config).await,
        Command::ExportToken => run_export_token(&config).await,
        Command::Serve(args) => run_serve(&config, args).await,
    }
}
