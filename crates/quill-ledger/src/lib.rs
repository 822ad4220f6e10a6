//! # quill-ledger: Multi-Entity Shop Operations
//!
//! Everything that writes to more than one collection lives here, on top of
//! whichever [`EntityStore`](quill_store::EntityStore) is active.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        quill CLI / UI                                   │
//! │                               │                                         │
//! │  ┌────────────────────────────▼────────────────────────────────────┐   │
//! │  │                ★ quill-ledger (THIS CRATE) ★                    │   │
//! │  │                                                                  │   │
//! │  │   processor   commit SALE / IMPORT        ┐                      │   │
//! │  │   debt        collect, settle, reconcile  ├─ saga step tracking  │   │
//! │  │   catalog     product / customer upkeep   ┘                      │   │
//! │  │   shop        facade + stats / reports                           │   │
//! │  └──────────────┬───────────────────────────────────┬──────────────┘   │
//! │                 │                                   │                   │
//! │       quill-core (pure rules)          quill-store (Arc<dyn EntityStore>)│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use quill_ledger::Shop;
//! use quill_store::LocalStore;
//!
//! let shop = Shop::new(Arc::new(LocalStore::in_memory().await?));
//! let removed = shop.catalog().purge_out_of_stock().await?;
//! println!("removed {removed} empty products");
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod debt;
pub mod error;
pub mod processor;
mod saga;
pub mod shop;

pub use catalog::Catalog;
pub use debt::{reconcile, DebtLedger, DebtMismatch, DebtReceipt, ReconcileReport};
pub use error::{CommitStep, LedgerError, LedgerResult};
pub use processor::{CommitOutcome, CommitReceipt, OrderProcessor};
pub use shop::Shop;

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;

    use quill_core::{Customer, Money, Order, OrderItem, OrderType, Product};
    use quill_store::{Collection, EntityStore, LocalStore, StoreError, StoreResult};

    pub async fn memory_store() -> Arc<dyn EntityStore> {
        Arc::new(LocalStore::in_memory().await.unwrap())
    }

    pub fn product(id: &str, price: i64, cost: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            code: format!("SP-{id}"),
            name: format!("Item {id}"),
            category: Default::default(),
            price: Money::from_dong(price),
            wholesale_price: None,
            cost: Money::from_dong(cost),
            stock,
            image_url: None,
        }
    }

    pub fn customer(id: &str, code: &str) -> Customer {
        Customer::walk_in(id.to_string(), code, None)
    }

    fn order(id: &str, kind: OrderType, lines: &[(&str, i64, i64)]) -> Order {
        let mut order = Order::new(id, 1_700_000_000_000, kind);
        order.items = lines
            .iter()
            .map(|&(product_id, quantity, price)| OrderItem {
                product_id: product_id.to_string(),
                product_name: format!("Item {product_id}"),
                quantity,
                price: Money::from_dong(price),
                is_custom_price: false,
            })
            .collect();
        order.total_amount = order.items_total();
        order.amount_given = order.total_amount;
        order
    }

    /// A paid walk-in sale of `(product_id, quantity, unit_price)` lines.
    pub fn sale(id: &str, lines: &[(&str, i64, i64)]) -> Order {
        order(id, OrderType::Sale, lines)
    }

    /// A VAT-invoiced import of `(product_id, quantity, unit_cost)` lines.
    pub fn import(id: &str, lines: &[(&str, i64, i64)]) -> Order {
        let mut order = order(id, OrderType::Import, lines);
        order.tax_status = Some(quill_core::TaxStatus::Tax);
        order
    }

    /// Delegates to `inner` but fails every upsert into one collection.
    pub struct FailingStore {
        inner: Arc<dyn EntityStore>,
        fail_on: Collection,
    }

    impl FailingStore {
        pub fn new(inner: Arc<dyn EntityStore>, fail_on: Collection) -> Self {
            FailingStore { inner, fail_on }
        }
    }

    #[async_trait]
    impl EntityStore for FailingStore {
        fn backend(&self) -> &'static str {
            "failing"
        }

        async fn list(&self, collection: Collection) -> StoreResult<Vec<Value>> {
            self.inner.list(collection).await
        }

        async fn upsert(&self, collection: Collection, item: Value) -> StoreResult<()> {
            if collection == self.fail_on {
                return Err(StoreError::Transport("connection reset".into()));
            }
            self.inner.upsert(collection, item).await
        }

        async fn remove(&self, collection: Collection, id: &str) -> StoreResult<()> {
            self.inner.remove(collection, id).await
        }
    }
}
