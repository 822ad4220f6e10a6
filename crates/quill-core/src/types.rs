//! # Domain Types
//!
//! The three persisted collections (products, customers, orders) and the
//! enums they carry. Field names serialize in camelCase so the JSON is the
//! same document the shop's spreadsheet and browser storage already hold.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │    Product      │   │    Customer     │   │       Order         │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  id             │   │  id             │   │  id                 │   │
//! │  │  code (SP…)     │   │  code (lookup)  │◄──│  customerCode       │   │
//! │  │  category       │   │  group          │   │  type               │   │
//! │  │  price / cost   │   │  totalSpent     │   │  items[] ──► Product│   │
//! │  │  stock          │   │  debt           │   │  paymentStatus      │   │
//! │  └─────────────────┘   └─────────────────┘   │  debtAmount         │   │
//! │                                              └─────────────────────┘   │
//! │                                                                         │
//! │  Customer.debt == Σ Order.debtAmount for that customer (by construction)│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::costing::{self, ImportEffect};
use crate::money::Money;
use crate::{is_guest_code, SERVICE_STOCK};

fn is_false(value: &bool) -> bool {
    !*value
}

// =============================================================================
// Enums
// =============================================================================

/// Product category.
///
/// Serialized with the shop's own labels; the upper-case names are
/// accepted on input as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ProductCategory {
    #[default]
    #[serde(rename = "Văn phòng phẩm", alias = "STATIONERY")]
    Stationery,
    /// Photocopy / printing. Stock is not tracked.
    #[serde(rename = "Dịch vụ Photo/In ấn", alias = "PHOTO_SERVICE")]
    PhotoService,
    #[serde(rename = "Sách/Truyện", alias = "BOOKS")]
    Books,
    #[serde(rename = "Khác", alias = "OTHER")]
    Other,
}

impl ProductCategory {
    /// Service categories have unbounded stock.
    pub const fn is_service(&self) -> bool {
        matches!(self, ProductCategory::PhotoService)
    }

    pub const fn label(&self) -> &'static str {
        match self {
            ProductCategory::Stationery => "Văn phòng phẩm",
            ProductCategory::PhotoService => "Dịch vụ Photo/In ấn",
            ProductCategory::Books => "Sách/Truyện",
            ProductCategory::Other => "Khác",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which price column applies to a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerGroup {
    #[default]
    Retail,
    Wholesale,
}

/// Kind of order. Absent on legacy rows, which are sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    #[default]
    Sale,
    Import,
    /// Audit entry for a debt payment. Always PAID with zero debt.
    DebtCollection,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Sale => write!(f, "SALE"),
            OrderType::Import => write!(f, "IMPORT"),
            OrderType::DebtCollection => write!(f, "DEBT_COLLECTION"),
        }
    }
}

/// Settlement state of an order.
///
/// ```text
///   DEBT ──(partial payment)──► PARTIAL ──(remaining paid)──► PAID
///     └───────────────(full payment)─────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Paid,
    Debt,
    Partial,
}

impl PaymentStatus {
    /// True when the order contributed to the customer's debt.
    pub const fn carries_debt(&self) -> bool {
        matches!(self, PaymentStatus::Debt | PaymentStatus::Partial)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Paid => write!(f, "PAID"),
            PaymentStatus::Debt => write!(f, "DEBT"),
            PaymentStatus::Partial => write!(f, "PARTIAL"),
        }
    }
}

/// Whether an import came with a VAT invoice.
///
/// `NoTax` purchases need the seller's identity for the monthly
/// purchase report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxStatus {
    Tax,
    #[default]
    NoTax,
}

// =============================================================================
// Product
// =============================================================================

/// A product or service on the shelf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,

    /// Display code (`SP…`). Rows without one are normalized on read.
    #[serde(default)]
    pub code: String,

    pub name: String,

    #[serde(default)]
    pub category: ProductCategory,

    /// Retail unit price.
    #[serde(default)]
    pub price: Money,

    /// Wholesale unit price. Falls back to `price` when unset or zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wholesale_price: Option<Money>,

    /// Weighted-average unit cost, recomputed only by imports.
    #[serde(default)]
    pub cost: Money,

    #[serde(default)]
    pub stock: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Product {
    pub fn is_service(&self) -> bool {
        self.category.is_service()
    }

    /// Unit price for a customer group.
    pub fn price_for(&self, group: CustomerGroup) -> Money {
        match group {
            CustomerGroup::Retail => self.price,
            CustomerGroup::Wholesale => match self.wholesale_price {
                Some(p) if !p.is_zero() => p,
                _ => self.price,
            },
        }
    }

    /// Applies a stock intake to this product (weighted-average cost).
    pub fn receive(&mut self, quantity: i64, unit_cost: Money) -> ImportEffect {
        let effect = costing::apply_import(self.stock, self.cost, quantity, unit_cost);
        self.cost = effect.cost;
        self.stock = effect.stock;
        effect
    }

    /// Fills the fields a save is expected to default.
    ///
    /// - services get the unbounded stock sentinel
    /// - an empty code becomes `SP<fallback>`
    /// - a missing wholesale price copies the retail price
    pub fn normalize(&mut self, code_fallback: &str) {
        if self.is_service() {
            self.stock = SERVICE_STOCK;
        }
        if self.code.trim().is_empty() {
            self.code = format!("SP{}", code_fallback);
        }
        if self.wholesale_price.is_none() {
            self.wholesale_price = Some(self.price);
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer, looked up by `code` at the till.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,

    /// Business key (often the phone number).
    pub code: String,

    pub name: String,

    #[serde(default)]
    pub phone: String,

    #[serde(default)]
    pub group: CustomerGroup,

    /// Cumulative sale totals. Only ever increases.
    #[serde(default)]
    pub total_spent: Money,

    /// Outstanding balance. Never below zero.
    #[serde(default)]
    pub debt: Money,

    /// Epoch milliseconds of the latest sale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_purchase_date: Option<i64>,
}

impl Customer {
    /// Builds the record created implicitly on a customer's first sale.
    pub fn walk_in(id: String, code: &str, quick_name: Option<&str>) -> Self {
        let code = code.trim();
        let name = match quick_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(n) => n.to_string(),
            None if is_guest_code(Some(code)) => "Walk-in customer".to_string(),
            None => format!("New customer ({})", code),
        };
        let phone = if !code.is_empty() && code.chars().all(|c| c.is_ascii_digit()) {
            code.to_string()
        } else {
            String::new()
        };

        Customer {
            id,
            code: code.to_string(),
            name,
            phone,
            group: CustomerGroup::Retail,
            total_spent: Money::zero(),
            debt: Money::zero(),
            last_purchase_date: None,
        }
    }

    pub fn is_guest(&self) -> bool {
        is_guest_code(Some(&self.code))
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line on an order.
///
/// `product_name` is a snapshot so old orders render after renames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub product_name: String,

    /// Units sold, units received, or 1 on debt-log entries.
    pub quantity: i64,

    /// Unit price charged (sale), unit cost paid (import), 0 (debt log).
    #[serde(default)]
    pub price: Money,

    /// Manual price override; exempt from group re-pricing.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_custom_price: bool,
}

impl OrderItem {
    pub fn subtotal(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Order
// =============================================================================

/// A sale, an import, or a debt-collection audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Globally unique; a second commit with the same id is a no-op.
    pub id: String,

    /// Epoch milliseconds.
    pub timestamp: i64,

    /// Absent on legacy rows. See [`Order::kind`].
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub order_type: Option<OrderType>,

    #[serde(default)]
    pub items: Vec<OrderItem>,

    #[serde(default)]
    pub total_amount: Money,

    #[serde(default)]
    pub profit: Money,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_code: Option<String>,

    #[serde(default)]
    pub payment_status: PaymentStatus,

    #[serde(default)]
    pub amount_given: Money,

    #[serde(default)]
    pub change_due: Money,

    /// Outstanding balance on this order alone.
    #[serde(default)]
    pub debt_amount: Money,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    // ---- import only -------------------------------------------------------
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_status: Option<TaxStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<Money>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_id_card: Option<String>,

    /// `YYYY-MM-DD`, as typed on the import form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<String>,
}

impl Order {
    /// Creates an empty order shell of the given type.
    pub fn new(id: impl Into<String>, timestamp: i64, order_type: OrderType) -> Self {
        Order {
            id: id.into(),
            timestamp,
            order_type: Some(order_type),
            items: Vec::new(),
            total_amount: Money::zero(),
            profit: Money::zero(),
            customer_code: None,
            payment_status: PaymentStatus::Paid,
            amount_given: Money::zero(),
            change_due: Money::zero(),
            debt_amount: Money::zero(),
            note: None,
            tax_status: None,
            tax_amount: None,
            seller_name: None,
            seller_address: None,
            seller_id_card: None,
            purchase_date: None,
        }
    }

    /// The order type, defaulting to SALE.
    pub fn kind(&self) -> OrderType {
        self.order_type.unwrap_or_default()
    }

    /// The customer code when it names a registered customer.
    pub fn registered_customer(&self) -> Option<&str> {
        match self.customer_code.as_deref() {
            code if is_guest_code(code) => None,
            code => code.map(str::trim),
        }
    }

    pub fn is_guest(&self) -> bool {
        self.registered_customer().is_none()
    }

    /// Σ quantity × price over the lines.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(OrderItem::subtotal).sum()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp)
    }

    /// Calendar date of the order in `tz`.
    pub fn local_date<Tz: TimeZone>(&self, tz: &Tz) -> Option<NaiveDate> {
        self.created_at().map(|at| at.with_timezone(tz).date_naive())
    }

    /// The typed purchase date of an import, if present and well-formed.
    pub fn purchase_date(&self) -> Option<NaiveDate> {
        self.purchase_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
    }

    /// Appends a line to the note, separated by ` | `.
    pub fn append_note(&mut self, annotation: &str) {
        self.note = Some(match self.note.as_deref().map(str::trim) {
            Some(existing) if !existing.is_empty() => format!("{} | {}", existing, annotation),
            _ => annotation.to_string(),
        });
    }
}

// =============================================================================
// Daily Stat
// =============================================================================

/// One bucket of the dashboard series. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    /// `YYYY-MM-DD`
    pub date: String,
    pub revenue: Money,
    pub orders: u32,
    pub profit: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================
