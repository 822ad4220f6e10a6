//! # Statistics Aggregator
//!
//! Folds the order ledger into the series the dashboard draws.
//!
//! ## Trailing Daily Window
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  now = 2024-03-30 (local)                                              │
//! │                                                                         │
//! │  bucket:   [0]         [1]        …        [28]        [29]            │
//! │  date:   03-01       03-02        …       03-29       03-30 ← today    │
//! │                                                                         │
//! │  SALE / IMPORT order on 03-02 ──► bucket[1] += totalAmount, profit, 1  │
//! │  DEBT_COLLECTION               ──► skipped (money already counted)     │
//! │  order on 02-29 or 03-31       ──► ignored, never clamped              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function takes the time zone (or `now` carrying one) explicitly so
//! tests can pin it; [`calculate_daily_stats_local`] is the device-local
//! convenience used by the apps.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Customer, DailyStat, Order, OrderType, Product};
use crate::{LOW_STOCK_THRESHOLD, STATS_WINDOW_DAYS};

// =============================================================================
// Daily Window
// =============================================================================

/// Builds the 30-day trailing series ending on `now`'s calendar date.
///
/// Buckets run oldest to newest; the last one is today.
pub fn calculate_daily_stats<Tz: TimeZone>(orders: &[Order], now: &DateTime<Tz>) -> Vec<DailyStat> {
    let tz = now.timezone();
    let today = now.date_naive();
    let start = today - Duration::days(STATS_WINDOW_DAYS as i64 - 1);

    let mut stats: Vec<DailyStat> = (0..STATS_WINDOW_DAYS)
        .map(|i| DailyStat {
            date: (start + Duration::days(i as i64)).format("%Y-%m-%d").to_string(),
            revenue: Money::zero(),
            orders: 0,
            profit: Money::zero(),
        })
        .collect();

    for order in orders.iter().filter(|o| o.kind() != OrderType::DebtCollection) {
        let Some(date) = order.local_date(&tz) else {
            continue;
        };
        if date < start || date > today {
            continue;
        }
        let bucket = &mut stats[(date - start).num_days() as usize];
        bucket.revenue += order.total_amount;
        bucket.orders += 1;
        bucket.profit += order.profit;
    }

    stats
}

/// [`calculate_daily_stats`] anchored on the device clock and time zone.
pub fn calculate_daily_stats_local(orders: &[Order]) -> Vec<DailyStat> {
    calculate_daily_stats(orders, &Local::now())
}

/// Today's tile: the last bucket of the window.
pub fn today_summary(stats: &[DailyStat]) -> Option<&DailyStat> {
    stats.last()
}

// =============================================================================
// Monthly Customer Split
// =============================================================================

/// Revenue of one month split by registered vs walk-in customers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySplit {
    /// 1-12
    pub month: u32,
    pub registered: Money,
    pub guest: Money,
}

/// Twelve rows for `year`. Debt collections are not revenue and are skipped.
pub fn monthly_customer_split<Tz: TimeZone>(orders: &[Order], year: i32, tz: &Tz) -> Vec<MonthlySplit> {
    let mut months: Vec<MonthlySplit> = (1..=12)
        .map(|month| MonthlySplit {
            month,
            registered: Money::zero(),
            guest: Money::zero(),
        })
        .collect();

    for order in orders.iter().filter(|o| o.kind() != OrderType::DebtCollection) {
        let Some(date) = order.local_date(tz) else {
            continue;
        };
        if date.year() != year {
            continue;
        }
        let row = &mut months[date.month0() as usize];
        if order.is_guest() {
            row.guest += order.total_amount;
        } else {
            row.registered += order.total_amount;
        }
    }
    months
}

// =============================================================================
// Inventory & Customers
// =============================================================================

/// Value locked in the shelves. Services are excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    /// Σ cost × stock
    pub stock_value: Money,
    /// Σ (price − cost) × stock
    pub potential_profit: Money,
    /// Stocked products below the low-stock threshold, lowest first.
    pub low_stock: Vec<Product>,
    /// Stocked products at or below zero (candidates for purging).
    pub out_of_stock: usize,
}

pub fn inventory_summary(products: &[Product]) -> InventorySummary {
    let stocked = products.iter().filter(|p| !p.is_service());

    let mut summary = InventorySummary {
        stock_value: Money::zero(),
        potential_profit: Money::zero(),
        low_stock: Vec::new(),
        out_of_stock: 0,
    };
    for product in stocked {
        summary.stock_value += product.cost * product.stock;
        summary.potential_profit += (product.price - product.cost) * product.stock;
        if product.stock < LOW_STOCK_THRESHOLD {
            summary.low_stock.push(product.clone());
        }
        if product.stock <= 0 {
            summary.out_of_stock += 1;
        }
    }
    summary.low_stock.sort_by_key(|p| p.stock);
    summary
}

/// The `limit` best customers by lifetime spend.
pub fn top_customers(customers: &[Customer], limit: usize) -> Vec<&Customer> {
    let mut ranked: Vec<&Customer> = customers.iter().collect();
    ranked.sort_by(|a, b| b.total_spent.cmp(&a.total_spent));
    ranked.truncate(limit);
    ranked
}

/// First and last calendar day of a month, if the month exists.
pub(crate) fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next - Duration::days(1)))
}

// =============================================================================
// Unit Tests
// =============================================================================
