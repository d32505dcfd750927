#![forbid(unsafe_code)]

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use clap_verbosity_flag::Verbosity;
use std::path::PathBuf;
use td_storage::SqliteStore;
use td_web::config::{ServeArgs, StorageArgs};
use td_web::loader;
use td_web::server::Server;
use tracing::info;
use tracing_log::AsTrace as _;
use tracing_subscriber::EnvFilter;

/// Builds UCSC genome browser track hubs from a catalog of transcription factor tracks.
#[derive(Parser, Debug)]
#[command(name = "topdata", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    verbose: Verbosity,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the track selection wizard and hub files over HTTP.
    Serve(ServeArgs),

    /// Load track definitions from a YAML catalog into the track database.
    LoadTracks {
        /// YAML file listing genomes and their tracks.
        file: PathBuf,

        #[command(flatten)]
        storage: StorageArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(cli.verbose.log_level_filter().as_trace())
            .init(),
    };

    match cli.command {
        Command::Serve(args) => serve(args),
        Command::LoadTracks { file, storage } => {
            let mut store = open_store(&storage)?;
            let loaded = loader::load_tracks(&mut store, &file)?;
            println!("Loaded {loaded} tracks.");
            Ok(())
        }
    }
}

fn open_store(storage: &StorageArgs) -> Result<SqliteStore> {
    SqliteStore::open(&storage.storage_dir).with_context(|| {
        format!(
            "failed to open track database in {}",
            storage.storage_dir.display()
        )
    })
}

fn serve(args: ServeArgs) -> Result<()> {
    let store = open_store(&args.storage)?;
    let settings = args.into_settings();
    info!(
        storage_dir = %settings.storage_dir.display(),
        tracks = store.track_count()?,
        limit = settings.track_selection_limit,
        "opened track database"
    );
    let server = Server::bind(store, settings.clone())
        .with_context(|| format!("failed to bind {}", settings.bind))?;
    server.run()?;
    Ok(())
}
