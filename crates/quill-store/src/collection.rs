//! The three persisted collections and their names on each backend.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    Products,
    Customers,
    Orders,
}

impl Collection {
    /// Sync order: referenced entities before the orders that name them.
    pub const ALL: [Collection; 3] = [Collection::Products, Collection::Customers, Collection::Orders];

    /// Sheet (tab) name on the remote endpoint.
    pub const fn sheet_name(&self) -> &'static str {
        match self {
            Collection::Products => "Products",
            Collection::Customers => "Customers",
            Collection::Orders => "Orders",
        }
    }

    /// Key of the blob in the local store.
    pub const fn local_key(&self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Customers => "customers",
            Collection::Orders => "orders",
        }
    }

    pub fn from_sheet_name(name: &str) -> Option<Self> {
        Collection::ALL.into_iter().find(|c| c.sheet_name() == name)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}
