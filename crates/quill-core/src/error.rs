//! # Error Types
//!
//! Domain-specific error types for quill-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  quill-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations (cart, payment)       │
//! │  └── ValidationError  - Input rejected before any I/O                  │
//! │                                                                         │
//! │  quill-store errors                                                    │
//! │  └── StoreError       - Transport, HTTP, SQLite, malformed payloads    │
//! │                                                                         │
//! │  quill-ledger errors                                                   │
//! │  └── LedgerError      - Missing customer/order, partial commits        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → CLI / UI            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A cart operation referenced a product that is not in the cart.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Not enough stock to add another unit to the cart.
    ///
    /// ## User Workflow
    /// ```text
    /// Tap product (stock: 2, already 2 in cart)
    ///      │
    ///      ▼
    /// InsufficientStock { code: "BUT-BI", available: 2, requested: 3 }
    ///      │
    ///      ▼
    /// UI: "Only 2 BUT-BI in stock"
    /// ```
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    /// Payment amount does not satisfy the chosen payment mode.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// The customer handed over less cash than the total in pay-now mode.
    #[error("Insufficient payment: total {total}, given {given}")]
    InsufficientPayment { total: Money, given: Money },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any store call is made, so nothing has been written when
/// one of these reaches the caller.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., a malformed date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// The order cannot be submitted in its current shape.
    #[error("Order {order_id} rejected: {reason}")]
    OrderRejected { order_id: String, reason: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }

    pub fn rejected(order_id: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::OrderRejected {
            order_id: order_id.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
