//! # Sheet Server
//!
//! ```text
//! request ──► action/sheet from query string, else from JSON body
//!                │
//!                ├── missing      → {"status":"error","message":...}
//!                ├── getAll       → [ ...entities ]         (shared lock)
//!                ├── save         → {"status":"success"}    (exclusive lock)
//!                ├── delete       → {"status":"success"}    (exclusive lock)
//!                └── anything else→ {"status":"error",...}
//! ```
//!
//! Every reply is HTTP 200 with a JSON body; callers tell success from
//! failure by shape, the same way the hosted script behaves.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::sheet::book::SheetBook;

/// Default listen address for `quill serve-sheet`.
pub const DEFAULT_SHEET_BIND: &str = "127.0.0.1:8790";

#[derive(Debug, Clone)]
pub struct SheetServerConfig {
    pub bind_addr: String,
    /// JSON file the book is loaded from and rewritten after each write.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for SheetServerConfig {
    fn default() -> Self {
        SheetServerConfig {
            bind_addr: DEFAULT_SHEET_BIND.to_string(),
            snapshot_path: None,
        }
    }
}

impl SheetServerConfig {
    /// Any free loopback port, nothing on disk.
    pub fn ephemeral() -> Self {
        SheetServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            snapshot_path: None,
        }
    }
}

struct SheetState {
    book: RwLock<SheetBook>,
    snapshot_path: Option<PathBuf>,
}

pub struct SheetServer;

/// Running server. Dropping the handle does not stop it; call
/// [`shutdown`](SheetServerHandle::shutdown).
pub struct SheetServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SheetServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Base URL clients should be configured with.
    pub fn url(&self) -> String {
        format!("http://{}/", self.local_addr)
    }

    /// Stops accepting requests and waits for in-flight ones.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "Sheet server task ended abnormally");
        }
    }
}

impl SheetServer {
    pub async fn start(config: SheetServerConfig) -> StoreResult<SheetServerHandle> {
        let book = match &config.snapshot_path {
            Some(path) => load_snapshot(path).await?,
            None => SheetBook::new(),
        };
        let state = Arc::new(SheetState {
            book: RwLock::new(book),
            snapshot_path: config.snapshot_path.clone(),
        });

        let app = Router::new()
            .route("/", get(handle_request).post(handle_request))
            .with_state(state);

        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .map_err(|e| StoreError::Server(format!("Failed to bind to {}: {}", config.bind_addr, e)))?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, snapshot = ?config.snapshot_path, "Sheet server started");

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_rx.recv().await;
                    info!("Sheet server shutting down");
                })
                .await;
            if let Err(e) = served {
                warn!(error = %e, "Sheet server stopped with error");
            }
        });

        Ok(SheetServerHandle {
            local_addr,
            shutdown_tx,
            task,
        })
    }
}

// =============================================================================
// Request Handling
// =============================================================================

async fn handle_request(
    State(state): State<Arc<SheetState>>,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> Json<Value> {
    let params: Map<String, Value> = match serde_json::from_str(&body) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    let from_body = |key: &str| params.get(key).and_then(Value::as_str).map(str::to_string);

    let action = query.get("action").cloned().or_else(|| from_body("action"));
    let sheet = query.get("sheet").cloned().or_else(|| from_body("sheet"));

    let (Some(action), Some(sheet)) = (action, sheet) else {
        return error_reply("missing 'action' or 'sheet' parameter");
    };
    debug!(action = %action, sheet = %sheet, "Sheet request");

    match action.as_str() {
        "getAll" => Json(Value::Array(read_sheet(&state, &sheet).await)),
        "save" => {
            let Some(item) = params.get("item") else {
                return error_reply("item is missing an id");
            };
            let mut book = state.book.write().await;
            if let Err(message) = book.save(&sheet, item) {
                return error_reply(&message);
            }
            persist(&state, &book).await
        }
        "delete" => {
            let id = match params.get("id") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => return error_reply("missing 'id' parameter"),
            };
            let mut book = state.book.write().await;
            book.delete(&sheet, &id);
            persist(&state, &book).await
        }
        other => error_reply(&format!("unknown action '{other}'")),
    }
}

async fn read_sheet(state: &SheetState, sheet: &str) -> Vec<Value> {
    {
        let book = state.book.read().await;
        if book.has_sheet(sheet) {
            return book.get_all(sheet);
        }
    }
    let mut book = state.book.write().await;
    book.ensure_sheet(sheet);
    book.get_all(sheet)
}

async fn persist(state: &SheetState, book: &SheetBook) -> Json<Value> {
    if let Some(path) = &state.snapshot_path {
        if let Err(e) = save_snapshot(path, book).await {
            warn!(path = %path.display(), error = %e, "Snapshot write failed");
            return error_reply(&format!("snapshot write failed: {e}"));
        }
    }
    Json(json!({"status": "success"}))
}

fn error_reply(message: &str) -> Json<Value> {
    Json(json!({"status": "error", "message": message}))
}

// =============================================================================
// Snapshot
// =============================================================================

async fn load_snapshot(path: &Path) -> StoreResult<SheetBook> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => {
            let book: SheetBook = serde_json::from_str(&raw)?;
            info!(path = %path.display(), "Loaded sheet snapshot");
            Ok(book)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SheetBook::new()),
        Err(e) => Err(e.into()),
    }
}

/// Writes to a temp file then renames, so a crash never leaves half a book.
async fn save_snapshot(path: &Path, book: &SheetBook) -> StoreResult<()> {
    let raw = serde_json::to_string_pretty(book)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, raw).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
