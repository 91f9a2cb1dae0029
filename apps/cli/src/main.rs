//! chunkup: resumable chunked uploads to a WebDAV server.

mod bridge;
mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::App;
use crate::config::CliConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Resumable chunked uploads to a WebDAV server")]
struct Cli {
    /// Config file (defaults to ~/.config/chunkup/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the server account to the config file
    Init {
        #[arg(long)]
        url_base: String,
        #[arg(long)]
        user: String,
        /// DAV user id when it differs from the login name
        #[arg(long)]
        user_id: Option<String>,
        /// Chunk size in megabytes
        #[arg(long)]
        chunk_size_mb: Option<u64>,
    },
    /// Upload a file into a remote directory
    Upload {
        file: PathBuf,
        /// Remote directory, relative to the user's files
        #[arg(long, default_value = "/")]
        to: String,
        /// Keep a local copy after the upload
        #[arg(long)]
        keep_local: bool,
    },
    /// Resume an interrupted upload
    Resume { session_id: String },
    /// List stored upload sessions
    Sessions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let config = CliConfig::load(&config_path)?;
    tracing::debug!(path = %config_path.display(), "configuration loaded");

    match cli.command {
        Command::Init {
            url_base,
            user,
            user_id,
            chunk_size_mb,
        } => {
            let config = CliConfig {
                url_base,
                user,
                user_id: user_id.unwrap_or_default(),
                chunk_size_mb: chunk_size_mb.unwrap_or(config.chunk_size_mb),
                ..config
            };
            config.save(&config_path)?;
            println!("wrote {}", config_path.display());
            Ok(())
        }
        Command::Upload {
            file,
            to,
            keep_local,
        } => App::open(config)?.upload_file(&file, &to, keep_local).await,
        Command::Resume { session_id } => App::open(config)?.resume(&session_id).await,
        Command::Sessions => {
            App::open(config)?.list_sessions();
            Ok(())
        }
    }
}
