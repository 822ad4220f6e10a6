//! # Commit Saga
//!
//! Bookkeeping for operations that write several entities with no
//! transaction around them.
//!
//! ```text
//! saga.step(RecordOrder,        orders.upsert(..))   ✓ completed = [RecordOrder]
//! saga.step(AdjustStock("p1"),  products.upsert(..)) ✓ completed = [.., p1]
//! saga.step(AdjustStock("p2"),  products.upsert(..)) ✗
//!      │
//!      └──► LedgerError::PartiallyApplied { completed: [RecordOrder, p1] }
//! ```
//!
//! A failure before the first completed step is returned as a plain
//! [`LedgerError::Store`]: nothing was written, so the caller may retry.

use std::future::Future;
use tracing::{debug, error};

use quill_store::StoreResult;

use crate::error::{CommitStep, LedgerError, LedgerResult};

pub(crate) struct Saga {
    subject: String,
    completed: Vec<CommitStep>,
}

impl Saga {
    pub(crate) fn new(subject: impl Into<String>) -> Self {
        Saga {
            subject: subject.into(),
            completed: Vec::new(),
        }
    }

    /// Runs one write and records it on success.
    pub(crate) async fn step<F>(&mut self, step: CommitStep, write: F) -> LedgerResult<()>
    where
        F: Future<Output = StoreResult<()>>,
    {
        match write.await {
            Ok(()) => {
                debug!(subject = %self.subject, step = %step, "Saga step committed");
                self.completed.push(step);
                Ok(())
            }
            Err(e) => Err(self.fail(&step.to_string(), e)),
        }
    }

    /// Runs a read between writes. Failures are mapped like a write's.
    pub(crate) async fn guard<T, F>(&self, what: &str, read: F) -> LedgerResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        read.await.map_err(|e| self.fail(what, e))
    }

    pub(crate) fn finish(self) -> Vec<CommitStep> {
        self.completed
    }

    fn fail(&self, during: &str, source: quill_store::StoreError) -> LedgerError {
        if self.completed.is_empty() {
            return LedgerError::Store(source);
        }
        error!(
            subject = %self.subject,
            during = %during,
            completed = self.completed.len(),
            error = %source,
            "Operation partially applied"
        );
        LedgerError::PartiallyApplied {
            subject: self.subject.clone(),
            completed: self.completed.clone(),
            source,
        }
    }
}
