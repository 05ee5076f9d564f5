//! Manager tracker command line.
//!
//! `serve` runs the tracker API. `sync` replays a saved offline queue
//! against a running server and `pending` lists what is still queued.

mod settings;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use settings::AppSettings;
use sheet_sync::{Connectivity, EditQueueStore, FilePersistence, SyncClient, SyncOutcome};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tracker")]
#[command(about = "Manager tracker API and offline edit queue tools", long_about = None)]
struct Cli {
    /// Settings file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tracker API
    Serve {
        /// Port to listen on, overriding the settings
        #[arg(long)]
        port: Option<u16>,
    },

    /// Replay a queue file against the server once
    Sync {
        /// Queue file, defaults to the configured queue path
        queue: Option<PathBuf>,
    },

    /// List edits waiting in a queue file
    Pending {
        /// Queue file, defaults to the configured queue path
        queue: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut settings = AppSettings::load(cli.config.as_deref()).context("loading settings")?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            serve(settings).await
        }
        Commands::Sync { queue } => {
            if let Some(queue) = queue {
                settings.sync.queue_path = Some(queue);
            }
            sync_once(settings).await
        }
        Commands::Pending { queue } => {
            let path = queue.or(settings.sync.queue_path).context("no queue file given")?;
            list_pending(path)
        }
    }
}

async fn serve(settings: AppSettings) -> Result<()> {
    tracing::info!("Starting tracker API on {}", settings.server.socket_addr());
    tracker_api::serve(settings.server, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
    })
    .await
    .context("tracker API failed")
}

async fn sync_once(settings: AppSettings) -> Result<()> {
    if settings.sync.queue_path.is_none() {
        bail!("no queue file given");
    }

    let client = SyncClient::open(&settings.sync, Connectivity::Online)?;
    let pending = client.executor().pending_count().await;
    tracing::info!("Replaying {} queued edits to {}", pending, settings.sync.base_url);

    match client.sync_now().await {
        SyncOutcome::Idle => println!("Nothing to sync"),
        SyncOutcome::Completed { synced } => println!("Synced {} edits", synced),
        SyncOutcome::AlreadyRunning => bail!("another sync is already running"),
        SyncOutcome::Interrupted {
            synced,
            remaining,
            error,
        } => bail!(
            "sync stopped after {} edits, {} still pending: {}",
            synced,
            remaining,
            error
        ),
    }
    Ok(())
}

fn list_pending(path: PathBuf) -> Result<()> {
    let store = EditQueueStore::open(FilePersistence::new(&path));
    if store.is_empty() {
        println!("No pending edits in {}", path.display());
        return Ok(());
    }

    for entry in store.entries() {
        println!(
            "{}  manager {}  {}  {:?}  ({}, {})",
            entry.queued_at.format("%Y-%m-%d %H:%M:%S"),
            entry.manager_id(),
            entry.edit.cell_ref(),
            entry.edit.value,
            entry.edit.role,
            entry.id
        );
    }
    println!("{} pending edits", store.len());
    Ok(())
}
