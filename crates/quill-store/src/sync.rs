//! # Local ⇄ Remote Copy
//!
//! ```text
//! push:  local.list(Products)  ──upsert each──►  remote   (then Customers, Orders)
//!        progress (done / total) after every entity
//!
//! pull:  remote.list(Products, Customers, Orders)  ──►  local.replace_all(...)
//!        progress 1/3, 2/3, 3/3 as each collection arrives
//! ```
//!
//! Push is additive: remote rows with no local counterpart stay. Pull
//! overwrites the local collections wholesale, and only after all three
//! downloads succeeded.

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::collection::Collection;
use crate::error::StoreResult;
use crate::local::LocalStore;
use crate::store::{document_id, EntityStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncProgress {
    pub collection: Collection,
    pub done: usize,
    pub total: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub products: usize,
    pub customers: usize,
    pub orders: usize,
}

impl SyncSummary {
    pub fn total(&self) -> usize {
        self.products + self.customers + self.orders
    }

    fn record(&mut self, collection: Collection, count: usize) {
        match collection {
            Collection::Products => self.products = count,
            Collection::Customers => self.customers = count,
            Collection::Orders => self.orders = count,
        }
    }
}

/// Upserts every local entity into `remote`, products first.
///
/// Stops at the first failure; entities already pushed stay pushed.
pub async fn push_local_to_remote(
    local: &LocalStore,
    remote: &dyn EntityStore,
    mut progress: impl FnMut(&SyncProgress),
) -> StoreResult<SyncSummary> {
    let mut batches = Vec::with_capacity(Collection::ALL.len());
    for collection in Collection::ALL {
        batches.push((collection, local.list(collection).await?));
    }
    let total: usize = batches.iter().map(|(_, items)| items.len()).sum();
    info!(total, target = remote.backend(), "Pushing local data");

    let mut summary = SyncSummary::default();
    let mut done = 0;
    for (collection, items) in batches {
        let count = items.len();
        for item in items {
            let label = push_label(collection, &item);
            remote.upsert(collection, item).await?;
            done += 1;
            progress(&SyncProgress {
                collection,
                done,
                total,
                message: label,
            });
        }
        summary.record(collection, count);
    }

    info!(pushed = summary.total(), "Push complete");
    Ok(summary)
}

/// Replaces each local collection with the remote one.
pub async fn pull_remote_to_local(
    remote: &dyn EntityStore,
    local: &LocalStore,
    mut progress: impl FnMut(&SyncProgress),
) -> StoreResult<SyncSummary> {
    let total = Collection::ALL.len();
    let mut downloaded = Vec::with_capacity(total);
    for (index, collection) in Collection::ALL.into_iter().enumerate() {
        progress(&SyncProgress {
            collection,
            done: index + 1,
            total,
            message: format!("Downloading {}", collection.sheet_name()),
        });
        downloaded.push((collection, remote.list(collection).await?));
    }

    let mut summary = SyncSummary::default();
    for (collection, items) in downloaded {
        local.replace_all(collection, &items).await?;
        summary.record(collection, items.len());
    }

    info!(pulled = summary.total(), source = remote.backend(), "Pull complete");
    Ok(summary)
}

fn push_label(collection: Collection, item: &Value) -> String {
    let name = item.get("name").and_then(Value::as_str);
    let id = document_id(item).unwrap_or_default();
    match (collection, name) {
        (Collection::Products, Some(name)) => format!("Pushing product: {name}"),
        (Collection::Customers, Some(name)) => format!("Pushing customer: {name}"),
        (Collection::Products, None) => format!("Pushing product: {id}"),
        (Collection::Customers, None) => format!("Pushing customer: {id}"),
        (Collection::Orders, _) => format!("Pushing order: {id}"),
    }
}
