//! gdrive-browser - cached Google Drive folder browser
//!
//! Serves folder listings and breadcrumb trails over a Unix socket, with a
//! couple of one-shot CLI commands for poking at a folder directly.

mod browser;
mod cache;
mod config;
mod drive;
mod ipc;

use anyhow::{anyhow, Context, Result};
use std::env;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use browser::{BrowserSettings, FileCategory, FolderBrowser};
use cache::{Clock, ContentCache, FileStore, MemoryStore, SystemClock};
use config::{CacheBackend, Config};
use drive::{DriveApi, DriveClient};
use ipc::{IpcServer, Shared};

/// CLI command
#[derive(Debug)]
enum Command {
    /// Run IPC server mode (default)
    Server,
    /// Print a folder listing
    Ls { folder_id: Option<String> },
    /// Print the breadcrumb trail of a folder
    Crumbs { folder_id: Option<String> },
    /// Show help
    Help,
}

fn print_help() {
    eprintln!(
        r#"gdrive-browser - Browse Google Drive folders with a local cache

USAGE:
    gdrive-browser                       # Run IPC server (default)
    gdrive-browser ls [folder_id]
    gdrive-browser crumbs [folder_id]
    gdrive-browser help

COMMANDS:
    (none)  Serve browsing sessions on the Unix socket
    ls      List a folder, folders first (default: DRIVE_DEFAULT_FOLDER_ID)
    crumbs  Show the path from the top folder down to a folder
    help    Show this help message

ENVIRONMENT:
    DRIVE_ACCESS_TOKEN          OAuth bearer token (required)
    DRIVE_DEFAULT_FOLDER_ID     Folder new sessions start in (default: root)
    DRIVE_ROOT_FOLDER_ID        Folder breadcrumbs stop at, besides root
    DRIVE_CACHE_TTL_SECS        Cache lifetime, 0 disables caching (default: 3600)
    DRIVE_CACHE_BACKEND         file or memory (default: file)
    DRIVE_CACHE_DIR             Cache directory for the file backend
    DRIVE_PAGE_SIZE             Items per listing request, 1-1000 (default: 50)
    DRIVE_MAX_DEPTH             Breadcrumb hop limit (default: 64)
    DRIVE_REQUEST_TIMEOUT_SECS  Per-request timeout (default: 30)
    DRIVE_MAX_RETRIES           Retries for transient failures (default: 2)
    DRIVE_SOCKET_PATH           IPC socket (default: /tmp/gdrive-browser.sock)
    DRIVE_API_URL               Drive API base URL (default: https://www.googleapis.com)
    RUST_LOG                    Log level (trace, debug, info, warn, error)

Variables may also be set in a .env file in the working directory.
"#
    );
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        return Ok(Command::Server);
    }

    match args[1].as_str() {
        "ls" => Ok(Command::Ls {
            folder_id: args.get(2).cloned(),
        }),
        "crumbs" => Ok(Command::Crumbs {
            folder_id: args.get(2).cloned(),
        }),
        "serve" => Ok(Command::Server),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(anyhow!("Unknown command: {}", other)),
    }
}

/// Build the shared content cache for the configured backend
fn build_cache(config: &Config) -> Result<Arc<ContentCache>> {
    let cache = match config.cache_backend {
        CacheBackend::Memory => ContentCache::new(MemoryStore::new()),
        CacheBackend::File => {
            let store = FileStore::new(config.cache_dir.clone()).with_context(|| {
                format!("Failed to open cache directory {}", config.cache_dir.display())
            })?;
            let pruned = store.prune(SystemClock.now_ms())?;
            info!(
                cache_dir = %store.cache_dir().display(),
                pruned = pruned,
                "File cache ready"
            );
            ContentCache::new(store)
        }
    };
    Ok(Arc::new(cache))
}

/// Configuration plus the shared cache and Drive client
fn load() -> Result<(Config, Arc<ContentCache>, Arc<dyn DriveApi>)> {
    let config = Config::from_env()?;
    let cache = build_cache(&config)?;
    let drive: Arc<dyn DriveApi> = Arc::new(DriveClient::from_config(&config)?);
    Ok((config, cache, drive))
}

fn icon(category: FileCategory) -> &'static str {
    match category {
        FileCategory::Folder => "[dir]",
        FileCategory::Document | FileCategory::Text => "[doc]",
        FileCategory::Spreadsheet => "[xls]",
        FileCategory::Presentation => "[ppt]",
        FileCategory::Pdf => "[pdf]",
        FileCategory::Image => "[img]",
        FileCategory::Archive => "[zip]",
        FileCategory::Video => "[vid]",
        FileCategory::Audio => "[aud]",
        FileCategory::Generic => "[   ]",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Level::INFO);

    // stdout is reserved for CLI output
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let command = match parse_args() {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    match command {
        Command::Server => {
            let (config, cache, drive) = load()?;
            let settings = BrowserSettings::from(&config);
            info!("Starting gdrive-browser in IPC server mode");

            let shared = Shared {
                drive,
                cache,
                settings,
                default_folder_id: config.default_folder_id.clone(),
            };
            let mut ipc_server = IpcServer::new(shared, config.socket_path.clone());
            if let Err(e) = ipc_server.start().await {
                error!(error = %e, "Failed to start IPC server");
                return Err(e);
            }

            let ipc_server = Arc::new(ipc_server);
            info!(
                socket_path = %ipc_server.socket_path().display(),
                "Daemon ready. Waiting for browsing clients..."
            );

            let runner = Arc::clone(&ipc_server);
            tokio::spawn(async move {
                if let Err(e) = runner.run().await {
                    error!(error = %e, "IPC server error");
                }
            });

            tokio::signal::ctrl_c().await?;

            info!("Received shutdown signal");
            ipc_server.stop().await?;
            info!("Shutdown complete.");
        }
        Command::Ls { folder_id } => {
            let (config, cache, drive) = load()?;
            let settings = BrowserSettings::from(&config);
            let folder_id = folder_id.unwrap_or_else(|| config.default_folder_id.clone());
            let mut browser =
                FolderBrowser::new(drive, Arc::clone(&cache), settings, folder_id.clone());

            let view = browser.browse(&folder_id).await?;
            let path: Vec<&str> = view.breadcrumbs.iter().map(|c| c.name.as_str()).collect();
            println!("{}", path.join(" / "));

            if view.files.is_empty() {
                println!("  (empty)");
            }
            for file in &view.files {
                println!(
                    "  {} {:<40} {:>10}  {}",
                    icon(file.category),
                    file.entry.name,
                    file.size_label.as_deref().unwrap_or("-"),
                    file.entry.id
                );
            }
            cache.log_metrics();
        }
        Command::Crumbs { folder_id } => {
            let (config, cache, drive) = load()?;
            let settings = BrowserSettings::from(&config);
            let folder_id = folder_id.unwrap_or_else(|| config.default_folder_id.clone());
            let browser = FolderBrowser::new(drive, Arc::clone(&cache), settings, folder_id);

            for (depth, crumb) in browser.current_breadcrumbs().await?.iter().enumerate() {
                println!("{}{}  ({})", "  ".repeat(depth), crumb.name, crumb.id);
            }
            cache.log_metrics();
        }
        Command::Help => {
            print_help();
        }
    }

    Ok(())
}
