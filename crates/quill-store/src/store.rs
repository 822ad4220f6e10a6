//! # Entity Store Contract
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  EntityStore (untyped, object-safe)                                    │
//! │    list(collection)          -> [json]                                 │
//! │    upsert(collection, json)  -> insert if id unseen, else replace      │
//! │    remove(collection, id)    -> delete matching id (string compare)    │
//! │                                                                         │
//! │  Repository<T: Entity> (typed view over one collection)                │
//! │    list / get / upsert / remove                                        │
//! │    + normalization on read (product code, customer debt)               │
//! │    + Repository<Customer>::resolve_or_create -> Found | Created        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ids are compared as strings everywhere: the spreadsheet may hand back a
//! numeric id for a row that was written as a string.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

use quill_core::{new_id, Customer, Order, Product};

use crate::collection::Collection;
use crate::error::{StoreError, StoreResult};

// =============================================================================
// Untyped Contract
// =============================================================================

/// Persistence of the three collections. Both backends implement this with
/// identical observable behaviour.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Short backend name for logs (`local`, `remote`).
    fn backend(&self) -> &'static str;

    async fn list(&self, collection: Collection) -> StoreResult<Vec<Value>>;

    async fn upsert(&self, collection: Collection, item: Value) -> StoreResult<()>;

    async fn remove(&self, collection: Collection, id: &str) -> StoreResult<()>;
}

/// The `id` of a JSON document as a string. Numbers are stringified.
pub fn document_id(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Insert-or-replace by id inside an in-memory collection.
///
/// Shared by every backend that works on whole arrays.
pub(crate) fn upsert_in_place(items: &mut Vec<Value>, id: &str, item: Value) -> bool {
    match items.iter_mut().find(|v| document_id(v).as_deref() == Some(id)) {
        Some(existing) => {
            *existing = item;
            false
        }
        None => {
            items.push(item);
            true
        }
    }
}

// =============================================================================
// Typed Entities
// =============================================================================

/// A domain type stored in one collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    /// Repairs legacy documents after decoding.
    fn normalize(&mut self) {}
}

impl Entity for Product {
    const COLLECTION: Collection = Collection::Products;

    fn id(&self) -> &str {
        &self.id
    }

    /// Rows saved before codes existed get `SP<id>`.
    fn normalize(&mut self) {
        if self.code.trim().is_empty() {
            self.code = format!("SP{}", self.id);
        }
    }
}

impl Entity for Customer {
    const COLLECTION: Collection = Collection::Customers;

    fn id(&self) -> &str {
        &self.id
    }

    fn normalize(&mut self) {
        self.debt = self.debt.floor_zero();
    }
}

impl Entity for Order {
    const COLLECTION: Collection = Collection::Orders;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Typed access to one collection.
pub struct Repository<T> {
    store: Arc<dyn EntityStore>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Repository {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Repository {
            store,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    /// Every entity in the collection, decoded and normalized.
    ///
    /// A document that does not decode fails the whole call; callers must
    /// not act on a partial view of the ledger.
    pub async fn list(&self) -> StoreResult<Vec<T>> {
        let documents = self.store.list(T::COLLECTION).await?;
        debug!(
            collection = %T::COLLECTION,
            backend = self.store.backend(),
            count = documents.len(),
            "Listed documents"
        );
        documents.into_iter().map(decode::<T>).collect()
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<T>> {
        Ok(self.list().await?.into_iter().find(|e| e.id() == id))
    }

    pub async fn exists(&self, id: &str) -> StoreResult<bool> {
        let documents = self.store.list(T::COLLECTION).await?;
        Ok(documents.iter().any(|d| document_id(d).as_deref() == Some(id)))
    }

    pub async fn upsert(&self, entity: &T) -> StoreResult<()> {
        if entity.id().trim().is_empty() {
            return Err(StoreError::MissingId {
                collection: T::COLLECTION.to_string(),
            });
        }
        debug!(collection = %T::COLLECTION, id = %entity.id(), "Upserting entity");
        let document = serde_json::to_value(entity)?;
        self.store.upsert(T::COLLECTION, document).await
    }

    pub async fn remove(&self, id: &str) -> StoreResult<()> {
        debug!(collection = %T::COLLECTION, id = %id, "Removing entity");
        self.store.remove(T::COLLECTION, id).await
    }
}

fn decode<T: Entity>(document: Value) -> StoreResult<T> {
    let id = document_id(&document).unwrap_or_else(|| "<no id>".to_string());
    let mut entity: T = serde_json::from_value(document).map_err(|e| StoreError::Decode {
        collection: T::COLLECTION.to_string(),
        id,
        message: e.to_string(),
    })?;
    entity.normalize();
    Ok(entity)
}

// =============================================================================
// Customer Resolution
// =============================================================================

/// Outcome of looking a customer up by code.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomerResolution {
    /// An existing record.
    Found(Customer),
    /// A fresh record built for this code. Not yet persisted.
    Created(Customer),
}

impl CustomerResolution {
    pub fn customer(&self) -> &Customer {
        match self {
            CustomerResolution::Found(c) | CustomerResolution::Created(c) => c,
        }
    }

    pub fn into_customer(self) -> Customer {
        match self {
            CustomerResolution::Found(c) | CustomerResolution::Created(c) => c,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, CustomerResolution::Created(_))
    }
}

impl Repository<Customer> {
    /// Exact, case-sensitive match on `code` (surrounding whitespace ignored).
    pub async fn find_by_code(&self, code: &str) -> StoreResult<Option<Customer>> {
        let code = code.trim();
        Ok(self.list().await?.into_iter().find(|c| c.code.trim() == code))
    }

    /// Finds the customer for `code`, or builds a new walk-in record for it.
    ///
    /// The created record is returned unsaved so the caller can apply the
    /// sale to it and persist once.
    pub async fn resolve_or_create(
        &self,
        code: &str,
        quick_name: Option<&str>,
    ) -> StoreResult<CustomerResolution> {
        match self.find_by_code(code).await? {
            Some(found) => Ok(CustomerResolution::Found(found)),
            None => {
                debug!(code = %code, "Customer not found, creating");
                Ok(CustomerResolution::Created(Customer::walk_in(
                    new_id(None),
                    code,
                    quick_name,
                )))
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
