//! # Ledger Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  ValidationError / CoreError ──► LedgerError::Core     nothing written │
//! │  StoreError before step 1    ──► LedgerError::Store    nothing written │
//! │  not found / zero debt       ──► LedgerError::{...}    nothing written │
//! │  StoreError after step N     ──► LedgerError::PartiallyApplied         │
//! │                                   { completed: [step 1 .. step N] }    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CLI / UI shows the message; a partial commit is never retried        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use quill_core::{CoreError, ValidationError};
use quill_store::StoreError;

/// One write in a multi-entity operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum CommitStep {
    RecordOrder,
    AdjustStock { product_id: String },
    UpdateCustomer { customer_id: String },
    UpdateOrder { order_id: String },
    RecordAudit { order_id: String },
}

impl fmt::Display for CommitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitStep::RecordOrder => write!(f, "record order"),
            CommitStep::AdjustStock { product_id } => write!(f, "adjust stock of {}", product_id),
            CommitStep::UpdateCustomer { customer_id } => write!(f, "update customer {}", customer_id),
            CommitStep::UpdateOrder { order_id } => write!(f, "update order {}", order_id),
            CommitStep::RecordAudit { order_id } => write!(f, "record audit entry {}", order_id),
        }
    }
}

/// Order processor and debt ledger errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Input rejected before any I/O.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A store call failed before anything was written.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Settling a customer or order that owes nothing.
    #[error("No outstanding debt on {kind} {id}")]
    NoOutstandingDebt { kind: &'static str, id: String },

    /// A store call failed after earlier writes of the same operation
    /// committed. Those writes are not undone.
    ///
    /// ## Recovery
    /// ```text
    /// completed: [RecordOrder, AdjustStock(p1)]   failed at: AdjustStock(p2)
    ///      │
    ///      ▼
    /// Re-submitting the order is a duplicate no-op; the operator fixes
    /// p2's stock and the customer by hand.
    /// ```
    #[error("Operation on {subject} partially applied after {} step(s): {source}", completed.len())]
    PartiallyApplied {
        subject: String,
        completed: Vec<CommitStep>,
        #[source]
        source: StoreError,
    },
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Core(CoreError::Validation(err))
    }
}

impl LedgerError {
    /// Steps that were written before the failure, if any.
    pub fn completed_steps(&self) -> &[CommitStep] {
        match self {
            LedgerError::PartiallyApplied { completed, .. } => completed,
            _ => &[],
        }
    }
}

/// Convenience type alias for Results with LedgerError.
pub type LedgerResult<T> = Result<T, LedgerError>;
