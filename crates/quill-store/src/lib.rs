//! # quill-store: Entity Store for Quill
//!
//! One contract, two backends with the same observable behaviour.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          quill-store                                    │
//! │                                                                         │
//! │  quill-ledger / CLI                                                    │
//! │       │  Repository<Product | Customer | Order>  (typed, normalizing)  │
//! │       ▼                                                                 │
//! │  Arc<dyn EntityStore>   list / upsert / remove over JSON documents     │
//! │       │                                                                 │
//! │       ├─────────────────────────────┐                                  │
//! │       ▼                             ▼                                  │
//! │  ┌──────────────┐            ┌──────────────┐     HTTP     ┌─────────┐ │
//! │  │  LocalStore  │            │ RemoteStore  │ ───────────► │  sheet  │ │
//! │  │ SQLite blobs │            │  (reqwest)   │  getAll/save │ endpoint│ │
//! │  └──────────────┘            └──────────────┘  /delete     └─────────┘ │
//! │         ▲                           ▲                                  │
//! │         └──────── sync push/pull ───┘                                  │
//! │                                                                         │
//! │  config::select_store(settings) decides which one callers get.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`store`] - `EntityStore` trait, `Entity`, typed `Repository`
//! - [`local`] - SQLite document store (the device store)
//! - [`remote`] - HTTP client for the spreadsheet-backed store
//! - [`sheet`] - The spreadsheet endpoint itself, as an axum server
//! - [`config`] - `quill.toml`, persisted `AppSettings`, store selection
//! - [`sync`] - Copy every collection between the two backends

pub mod collection;
pub mod config;
pub mod error;
pub mod local;
pub mod migrations;
pub mod remote;
pub mod sheet;
pub mod store;
pub mod sync;

pub use collection::Collection;
pub use config::{select_store, AppSettings, QuillConfig};
pub use error::{StoreError, StoreResult};
pub use local::{LocalConfig, LocalStore};
pub use remote::RemoteStore;
pub use sheet::{SheetServer, SheetServerConfig, SheetServerHandle};
pub use store::{CustomerResolution, Entity, EntityStore, Repository};
pub use sync::{pull_remote_to_local, push_local_to_remote, SyncProgress, SyncSummary};
