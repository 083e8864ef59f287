//! IPC Server - Unix socket server for browsing clients
//!
//! Each accepted connection is one browsing session: it gets its own
//! `FolderBrowser` cursor over the shared cache and Drive client.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::browser::{BrowserSettings, FolderBrowser};
use crate::cache::ContentCache;
use crate::drive::DriveApi;
use crate::ipc::protocol::{parse_command, serialize_response, Command, Response, PROTOCOL_VERSION};

/// State shared by every connection
pub struct Shared {
    pub drive: Arc<dyn DriveApi>,
    pub cache: Arc<ContentCache>,
    pub settings: BrowserSettings,
    /// Where new sessions start
    pub default_folder_id: String,
}

impl Shared {
    fn session(&self) -> FolderBrowser {
        FolderBrowser::new(
            Arc::clone(&self.drive),
            Arc::clone(&self.cache),
            self.settings.clone(),
            self.default_folder_id.clone(),
        )
    }
}

/// IPC Server that listens for browsing commands
pub struct IpcServer {
    shared: Arc<Shared>,
    socket_path: PathBuf,
    /// Socket listener
    listener: Option<UnixListener>,
    /// Active connections counter
    connection_count: Arc<RwLock<u32>>,
}

impl IpcServer {
    /// Create a new IPC server
    pub fn new(shared: Shared, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            shared: Arc::new(shared),
            socket_path: socket_path.into(),
            listener: None,
            connection_count: Arc::new(RwLock::new(0)),
        }
    }

    /// Bind the socket, replacing a stale socket file if present
    pub async fn start(&mut self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)
                .context("Failed to remove existing socket file")?;
        }

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind Unix socket {}", self.socket_path.display()))?;

        info!(socket_path = %self.socket_path.display(), "IPC server started");

        self.listener = Some(listener);
        Ok(())
    }

    /// Run the server loop, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("Server not started")?;

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let shared = Arc::clone(&self.shared);
                    let connection_count = Arc::clone(&self.connection_count);

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, shared, connection_count).await {
                            error!(error = %e, "Connection handler error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    /// Stop the IPC server and clean up
    pub async fn stop(&self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).context("Failed to remove socket file")?;
        }
        self.shared.cache.log_metrics();
        info!(open_connections = self.connection_count().await, "IPC server stopped");
        Ok(())
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Get the number of active connections
    pub async fn connection_count(&self) -> u32 {
        *self.connection_count.read().await
    }
}

/// Handle a single client connection
async fn handle_connection(
    stream: UnixStream,
    shared: Arc<Shared>,
    connection_count: Arc<RwLock<u32>>,
) -> Result<()> {
    {
        let mut count = connection_count.write().await;
        *count += 1;
        debug!(count = *count, "New connection");
    }

    let mut session = shared.session();
    let (reader, mut writer) = stream.into_split();
    let mut buf_reader = BufReader::new(reader);
    let mut line = String::new();

    // Newline-delimited JSON, one response per command
    loop {
        line.clear();
        match buf_reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("Connection closed by client");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                debug!(command = %trimmed, "Received command");

                let response = match parse_command(trimmed.as_bytes()) {
                    Ok(command) => process_command(command, &mut session, &shared).await,
                    Err(e) => {
                        warn!(error = %e, command = %trimmed, "Failed to parse command");
                        Response::invalid_request(format!("Invalid command: {}", e))
                    }
                };

                match serialize_response(&response) {
                    Ok(json) => {
                        if let Err(e) = writer.write_all(&json).await {
                            error!(error = %e, "Failed to write response");
                            break;
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to serialize response");
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to read from socket");
                break;
            }
        }
    }

    {
        let mut count = connection_count.write().await;
        *count = count.saturating_sub(1);
        debug!(count = *count, "Connection ended");
    }

    Ok(())
}

/// Process a command against one session and return a response
async fn process_command(command: Command, session: &mut FolderBrowser, shared: &Shared) -> Response {
    match command {
        Command::ListFolder { folder_id } => {
            let requested = folder_id.filter(|id| !id.is_empty());
            let folder_id = requested
                .clone()
                .unwrap_or_else(|| session.current_folder().to_string());
            debug!(folder_id = %folder_id, "Processing listFolder command");

            let listing = match requested {
                Some(id) => session.contents(&id).await,
                None => session.current_contents().await,
            };
            match listing {
                Ok(files) => Response::Contents { folder_id, files },
                Err(e) => {
                    warn!(folder_id = %folder_id, error = %e, "listFolder failed");
                    Response::from(&e)
                }
            }
        }

        Command::GetBreadcrumbs { folder_id } => {
            let folder_id = folder_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| session.current_folder().to_string());
            debug!(folder_id = %folder_id, "Processing getBreadcrumbs command");

            match session.breadcrumbs(&folder_id).await {
                Ok(breadcrumbs) => Response::Breadcrumbs {
                    folder_id,
                    breadcrumbs,
                },
                Err(e) => {
                    warn!(folder_id = %folder_id, error = %e, "getBreadcrumbs failed");
                    Response::from(&e)
                }
            }
        }

        Command::ChangeFolder { folder_id } => {
            if folder_id.trim().is_empty() {
                return Response::invalid_request("Invalid folder ID");
            }
            info!(folder_id = %folder_id, "Processing changeFolder command");

            match session.browse(&folder_id).await {
                Ok(view) => Response::Folder {
                    current_folder: view.current_folder,
                    files: view.files,
                    breadcrumbs: view.breadcrumbs,
                },
                Err(e) => {
                    warn!(folder_id = %folder_id, error = %e, "changeFolder failed");
                    Response::from(&e)
                }
            }
        }

        Command::ClearFolder { folder_id } => {
            if folder_id.trim().is_empty() {
                return Response::invalid_request("Invalid folder ID");
            }

            match session.invalidate(&folder_id) {
                Ok(()) => Response::Success {
                    message: Some(format!("Cleared cached folder {}", folder_id)),
                },
                Err(e) => Response::from(&e),
            }
        }

        Command::GetStatus => {
            debug!("Processing getStatus command");

            let (cache_hits, cache_misses, hit_rate) = shared.cache.stats();
            Response::Status {
                version: PROTOCOL_VERSION,
                health: shared.drive.health_status().to_string(),
                cache_hits,
                cache_misses,
                hit_rate,
                recent_errors: shared.drive.recent_errors(),
            }
        }
    }
}
