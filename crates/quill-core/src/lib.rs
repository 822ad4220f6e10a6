//! # quill-core: Pure Business Logic for Quill
//!
//! Everything the shop calculates lives here as plain functions over plain
//! data. Persistence and HTTP live in `quill-store`; the multi-entity commit
//! workflow lives in `quill-ledger`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Quill Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Web UI / quill CLI (external callers)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          quill-ledger: OrderProcessor, DebtLedger, Shop         │   │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘   │
//! │                 │                              │                        │
//! │  ┌──────────────▼──────────────┐  ┌────────────▼────────────────────┐  │
//! │  │  ★ quill-core (THIS CRATE) ★│  │  quill-store: EntityStore       │  │
//! │  │                             │  │  SQLite blobs / sheet HTTP      │  │
//! │  │  types    money    costing  │  └─────────────────────────────────┘  │
//! │  │  cart     intake   stats    │                                        │
//! │  │  reports  validation        │                                        │
//! │  │                             │                                        │
//! │  │  NO I/O • NO CLOCK • PURE   │                                        │
//! │  └─────────────────────────────┘                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, Customer, Order and friends (wire-compatible JSON)
//! - [`money`] - Whole-đồng `Money` with lenient decoding
//! - [`costing`] - Weighted-average unit cost on stock intake
//! - [`cart`] - Sale cart pricing and payment settlement
//! - [`intake`] - Import (goods received) order builder
//! - [`stats`] - Trailing daily window, monthly customer split, inventory
//! - [`reports`] - Monthly revenue and purchase reports
//! - [`validation`] - Order and entity validation rules
//!
//! ## Example Usage
//!
//! ```rust
//! use quill_core::costing::apply_import;
//! use quill_core::Money;
//!
//! // 10 units at 1.000₫ plus 10 units at 2.000₫
//! let effect = apply_import(10, Money::from_dong(1_000), 10, Money::from_dong(2_000));
//! assert_eq!(effect.cost, Money::from_dong(1_500));
//! assert_eq!(effect.stock, 20);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod costing;
pub mod error;
pub mod intake;
pub mod money;
pub mod reports;
pub mod stats;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Customer code used for walk-in sales.
pub const GUEST_CUSTOMER_CODE: &str = "GUEST";

/// Stock assigned to service products (photocopy, printing).
///
/// Services are never out of stock; the sentinel keeps the number
/// comparable with real stock levels in the UI.
pub const SERVICE_STOCK: i64 = 1_000_000_000;

/// Quantity ceiling for a single service line in the cart.
pub const MAX_SERVICE_QUANTITY: i64 = 999_999;

/// Length of the trailing dashboard window, in days (today included).
pub const STATS_WINDOW_DAYS: usize = 30;

/// Below this stock level a product shows up in the low-stock list.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Label replacing service product names in the revenue report.
pub const SERVICE_REPORT_LABEL: &str = "Photo tài liệu";

/// Returns true when `code` denotes the walk-in customer (absent, blank or GUEST).
pub fn is_guest_code(code: Option<&str>) -> bool {
    match code.map(str::trim) {
        None => true,
        Some(c) => c.is_empty() || c.eq_ignore_ascii_case(GUEST_CUSTOMER_CODE),
    }
}

/// Generates a new identifier, optionally prefixed (`PAY-`, `DEBT-`, `IMP-`).
pub fn new_id(prefix: Option<&str>) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    match prefix {
        Some(p) => format!("{}-{}", p, id),
        None => id,
    }
}
