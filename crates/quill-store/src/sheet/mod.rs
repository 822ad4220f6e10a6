//! # Sheet Endpoint
//!
//! A self-hosted implementation of the spreadsheet protocol that
//! [`RemoteStore`](crate::remote::RemoteStore) speaks. Each collection is a
//! sheet of 4-column rows; `JSON_DATA` holds the entity verbatim.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SheetServer (axum, GET / and POST /)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  RwLock<SheetBook>                                                     │
//! │    getAll  → shared lock (exclusive only to provision a new sheet)     │
//! │    save    → exclusive lock                                            │
//! │    delete  → exclusive lock                                            │
//! │       │                                                                 │
//! │       ▼ (optional)                                                      │
//! │  snapshot.json rewritten after every write                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod book;
pub mod server;

pub use book::{Sheet, SheetBook, SheetRow, HEADER};
pub use server::{SheetServer, SheetServerConfig, SheetServerHandle};
