// Allow panic/unwrap/expect in tests (denied globally via Cargo.toml lints)
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        clippy::arithmetic_side_effects,
        clippy::indexing_slicing
    )
)]

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use std::path::PathBuf;
use tracing::warn;

use flowvault::backup::{run_backup, BackupOptions};
use flowvault::config::{self, StorageMode, UserConfig};
use flowvault::engine::EngineCli;
use flowvault::logging::{init_logging, parse_rotation, LogConfig, LOG_FILENAME};
use flowvault::restore::{run_restore, RestoreOptions};
use flowvault::staging::IdPolicy;
use flowvault::HttpRemoteApi;

/// Flowvault - Backup and restore for workflow-automation servers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable JSON log format (for production/log aggregation)
    #[arg(long, env = "FLOWVAULT_LOG_JSON", default_value = "false")]
    log_json: bool,

    /// Log rotation period: daily, hourly, or never
    #[arg(long, env = "FLOWVAULT_LOG_ROTATION", default_value = "daily")]
    log_rotation: String,

    /// Custom log directory (default: ~/.flowvault/logs)
    #[arg(long, env = "FLOWVAULT_LOG_DIR")]
    log_dir: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export all workflows into the backup tree
    Backup {
        /// Backup root directory (default: from config, else ~/.flowvault/backups)
        #[arg(long, env = "FLOWVAULT_BACKUP_ROOT")]
        root: Option<PathBuf>,

        /// Where backup output is persisted
        #[arg(long, env = "FLOWVAULT_STORAGE", value_enum)]
        storage: Option<StorageMode>,

        /// Also export credentials, in their encrypted form
        #[arg(long)]
        include_credentials: bool,
    },
    /// Import the backup tree into the instance, preserving identities
    Restore {
        /// Backup root directory (default: from config, else ~/.flowvault/backups)
        #[arg(long, env = "FLOWVAULT_BACKUP_ROOT")]
        root: Option<PathBuf>,

        /// How existing workflow ids are treated during staging
        #[arg(long, env = "FLOWVAULT_ID_POLICY", value_enum)]
        id_policy: Option<IdPolicy>,

        /// Keep the staging area (staged copies plus the run manifest)
        /// under ~/.flowvault/staging for debugging
        #[arg(long)]
        keep_manifest: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre error hooks for colored error output
    color_eyre::install()?;

    // Parse CLI arguments first (before logging, so we can use log config)
    let args = Args::parse();

    let log_dir = args.log_dir.clone().map(PathBuf::from).unwrap_or_else(|| {
        config::flowvault_home()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("logs")
    });
    let log_file = log_dir.join(LOG_FILENAME);

    let log_config = LogConfig {
        log_dir,
        json_format: args.log_json,
        rotation: parse_rotation(&args.log_rotation),
        ..Default::default()
    };

    if let Err(e) = init_logging(log_config) {
        eprintln!();
        eprintln!("Error: Failed to initialize logging: {e}");
        eprintln!();
        eprintln!("Logs: {}", log_file.display());
        eprintln!();
        return Err(e);
    }

    // Config file is optional; every section has working defaults.
    let config = config::load_config().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {e}");
        UserConfig::default()
    });

    let api_key = config.api_key().ok_or_else(|| {
        eyre!(
            "API key not found; export {} before running",
            config.api.api_key_env
        )
    })?;
    let api = HttpRemoteApi::new(&config.api.base_url, &api_key);
    let engine = EngineCli::new(&config.engine.command)?;

    match args.command {
        Command::Backup {
            root,
            storage,
            include_credentials,
        } => {
            let root = match root {
                Some(root) => root,
                None => config.backup_root()?,
            };
            let mut opts = BackupOptions::from(&config.backup);
            if let Some(storage) = storage {
                opts.storage = storage;
            }
            if include_credentials {
                opts.include_credentials = true;
            }
            let summary = run_backup(&api, &engine, &root, &opts).await?;
            println!("{summary}");
        }
        Command::Restore {
            root,
            id_policy,
            keep_manifest,
        } => {
            let root = match root {
                Some(root) => root,
                None => config.backup_root()?,
            };
            let mut opts = RestoreOptions::from(&config.restore);
            if let Some(policy) = id_policy {
                opts.policy = policy;
            }
            if keep_manifest {
                opts.keep_manifest = true;
            }
            let summary = run_restore(&api, &engine, &root, &opts).await?;
            println!("{summary}");
        }
    }

    Ok(())
}
