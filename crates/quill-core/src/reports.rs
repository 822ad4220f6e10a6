//! # Monthly Reports
//!
//! Read-only projections over the order collection for the household
//! business tax filing.
//!
//! ```text
//! ┌──────────────────────────────┐    ┌──────────────────────────────────────┐
//! │ Revenue report (sổ doanh thu)│    │ Purchase report (bảng kê thu mua)    │
//! │                              │    │                                      │
//! │ one row per day with SALE    │    │ one row per line of a NO_TAX IMPORT  │
//! │ revenue > 0                  │    │ with the seller's identity           │
//! │ 01/03/2024  Bút bi, Photo…   │    │ 03/03/2024  Cô Hoa  Vở 96tr  100 …   │
//! │ ...                          │    │ ... sorted by purchase date          │
//! │ grand total                  │    │ grand total                          │
//! └──────────────────────────────┘    └──────────────────────────────────────┘
//! ```

use chrono::{Duration, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use ts_rs::TS;

use crate::money::Money;
use crate::stats::month_bounds;
use crate::types::{Order, OrderType, Product, TaxStatus};
use crate::SERVICE_REPORT_LABEL;

const FALLBACK_DESCRIPTION: &str = "Sales revenue";

fn format_day(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

// =============================================================================
// Revenue Report
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RevenueRow {
    /// `dd/mm/yyyy`
    pub date: String,
    pub description: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub year: i32,
    pub month: u32,
    pub rows: Vec<RevenueRow>,
    pub total: Money,
}

/// Daily SALE revenue for one month.
///
/// The description lists the distinct product names sold that day in the
/// order first seen; service lines collapse into one generic label.
/// Returns an empty report for a month that does not exist.
pub fn revenue_report<Tz: TimeZone>(
    orders: &[Order],
    products: &[Product],
    year: i32,
    month: u32,
    tz: &Tz,
) -> RevenueReport {
    let mut report = RevenueReport {
        year,
        month,
        rows: Vec::new(),
        total: Money::zero(),
    };
    let Some((first, last)) = month_bounds(year, month) else {
        return report;
    };

    let services: HashSet<&str> = products
        .iter()
        .filter(|p| p.is_service())
        .map(|p| p.id.as_str())
        .collect();

    let mut by_day: HashMap<NaiveDate, Vec<&Order>> = HashMap::new();
    for order in orders.iter().filter(|o| o.kind() == OrderType::Sale) {
        if let Some(date) = order.local_date(tz).filter(|d| *d >= first && *d <= last) {
            by_day.entry(date).or_default().push(order);
        }
    }

    let mut day = first;
    while day <= last {
        if let Some(day_orders) = by_day.get(&day) {
            let amount: Money = day_orders.iter().map(|o| o.total_amount).sum();
            if amount.is_positive() {
                report.rows.push(RevenueRow {
                    date: format_day(day),
                    description: describe(day_orders, &services),
                    amount,
                });
                report.total += amount;
            }
        }
        day += Duration::days(1);
    }
    report
}

fn describe(orders: &[&Order], services: &HashSet<&str>) -> String {
    let mut names: Vec<&str> = Vec::new();
    for item in orders.iter().flat_map(|o| o.items.iter()) {
        let name = if services.contains(item.product_id.as_str()) {
            SERVICE_REPORT_LABEL
        } else {
            item.product_name.as_str()
        };
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    if names.is_empty() {
        FALLBACK_DESCRIPTION.to_string()
    } else {
        names.join(", ")
    }
}

// =============================================================================
// Purchase Report
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRow {
    /// `dd/mm/yyyy`
    pub date: String,
    pub seller_name: String,
    pub seller_address: String,
    pub seller_id: String,
    pub item_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub total: Money,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReport {
    pub year: i32,
    pub month: u32,
    pub rows: Vec<PurchaseRow>,
    pub total: Money,
}

/// Line items of NO_TAX imports recorded in the month, oldest first.
///
/// The month is decided by the order timestamp; the row date shows the
/// typed purchase date when there is one.
pub fn purchase_report<Tz: TimeZone>(orders: &[Order], year: i32, month: u32, tz: &Tz) -> PurchaseReport {
    let mut report = PurchaseReport {
        year,
        month,
        rows: Vec::new(),
        total: Money::zero(),
    };
    let Some((first, last)) = month_bounds(year, month) else {
        return report;
    };

    let mut dated: Vec<(NaiveDate, PurchaseRow)> = Vec::new();
    let imports = orders.iter().filter(|o| {
        o.kind() == OrderType::Import && o.tax_status == Some(TaxStatus::NoTax)
    });
    for order in imports {
        let Some(recorded) = order.local_date(tz).filter(|d| *d >= first && *d <= last) else {
            continue;
        };
        let date = order.purchase_date().unwrap_or(recorded);
        for item in &order.items {
            let total = item.subtotal();
            dated.push((date, PurchaseRow {
                date: format_day(date),
                seller_name: order.seller_name.clone().unwrap_or_default(),
                seller_address: order.seller_address.clone().unwrap_or_default(),
                seller_id: order.seller_id_card.clone().unwrap_or_default(),
                item_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.price,
                total,
                note: order.note.clone().unwrap_or_default(),
            }));
            report.total += total;
        }
    }
    // stable: same-day rows keep ledger order
    dated.sort_by_key(|(date, _)| *date);
    report.rows = dated.into_iter().map(|(_, row)| row).collect();
    report
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderItem, ProductCategory};
    use chrono::FixedOffset;

    fn hanoi() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> i64 {
        hanoi().with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap().timestamp_millis()
    }

    fn item(id: &str, name: &str, qty: i64, price: i64) -> OrderItem {
        OrderItem {
            product_id: id.into(),
            product_name: name.into(),
            quantity: qty,
            price: Money::from_dong(price),
            is_custom_price: false,
        }
    }

    fn sale(id: &str, ts: i64, items: Vec<OrderItem>) -> Order {
        let mut o = Order::new(id, ts, OrderType::Sale);
        o.total_amount = items.iter().map(OrderItem::subtotal).sum();
        o.items = items;
        o
    }

    fn photo_service() -> Product {
        Product {
            id: "photo-a4".into(),
            code: "SP-PHOTO".into(),
            name: "Photo A4".into(),
            category: ProductCategory::PhotoService,
            price: Money::from_dong(500),
            wholesale_price: None,
            cost: Money::from_dong(150),
            stock: crate::SERVICE_STOCK,
            image_url: None,
        }
    }

    #[test]
    fn test_revenue_report_rows() {
        let orders = vec![
            sale("1", at(2024, 3, 2), vec![item("pen", "Bút bi", 2, 5_000), item("photo-a4", "Photo A4", 10, 500)]),
            sale("2", at(2024, 3, 2), vec![item("photo-a4", "Photo A4 2 mặt", 4, 800), item("pen", "Bút bi", 1, 5_000)]),
            sale("3", at(2024, 3, 5), vec![item("vo", "Vở 96 trang", 1, 8_000)]),
            sale("4", at(2024, 4, 1), vec![item("vo", "Vở 96 trang", 1, 8_000)]),
        ];
        let report = revenue_report(&orders, &[photo_service()], 2024, 3, &hanoi());

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].date, "02/03/2024");
        assert_eq!(report.rows[0].description, "Bút bi, Photo tài liệu");
        assert_eq!(report.rows[0].amount, Money::from_dong(10_000 + 5_000 + 3_200 + 5_000));
        assert_eq!(report.rows[1].date, "05/03/2024");
        assert_eq!(report.total, Money::from_dong(23_200 + 8_000));
    }

    #[test]
    fn test_revenue_report_skips_non_sales_and_zero_days() {
        let mut import = sale("i", at(2024, 3, 3), vec![item("vo", "Vở", 100, 4_000)]);
        import.order_type = Some(OrderType::Import);
        let mut collection = Order::new("PAY-1", at(2024, 3, 3), OrderType::DebtCollection);
        collection.amount_given = Money::from_dong(50_000);
        let free = sale("f", at(2024, 3, 4), vec![item("gift", "Quà tặng", 1, 0)]);

        let report = revenue_report(&[import, collection, free], &[], 2024, 3, &hanoi());
        assert!(report.rows.is_empty());
        assert!(report.total.is_zero());
    }

    #[test]
    fn test_revenue_report_counts_untyped_orders_as_sales() {
        let mut legacy = sale("l", at(2024, 3, 9), vec![item("pen", "Bút", 1, 5_000)]);
        legacy.order_type = None;
        let report = revenue_report(&[legacy], &[], 2024, 3, &hanoi());
        assert_eq!(report.total, Money::from_dong(5_000));
    }

    #[test]
    fn test_revenue_description_fallback() {
        let nameless = sale("n", at(2024, 3, 9), vec![item("x", "", 1, 5_000)]);
        let report = revenue_report(&[nameless], &[], 2024, 3, &hanoi());
        assert_eq!(report.rows[0].description, "Sales revenue");
    }

    fn import(id: &str, ts: i64, purchase: Option<&str>, tax: TaxStatus, items: Vec<OrderItem>) -> Order {
        let mut o = Order::new(id, ts, OrderType::Import);
        o.items = items;
        o.tax_status = Some(tax);
        o.purchase_date = purchase.map(str::to_string);
        o.seller_name = Some("Cô Hoa".into());
        o.seller_address = Some("Chợ Đồng Xuân".into());
        o.seller_id_card = Some("001".into());
        o
    }

    #[test]
    fn test_purchase_report() {
        let orders = vec![
            import("b", at(2024, 3, 20), Some("2024-03-18"), TaxStatus::NoTax, vec![item("vo", "Vở", 100, 4_000)]),
            import("a", at(2024, 3, 10), None, TaxStatus::NoTax, vec![item("pen", "Bút", 50, 2_000), item("ink", "Mực", 5, 10_000)]),
            import("t", at(2024, 3, 11), None, TaxStatus::Tax, vec![item("pen", "Bút", 50, 2_000)]),
            import("x", at(2024, 4, 1), Some("2024-03-31"), TaxStatus::NoTax, vec![item("pen", "Bút", 1, 1)]),
        ];
        let report = purchase_report(&orders, 2024, 3, &hanoi());

        let dates: Vec<&str> = report.rows.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["10/03/2024", "10/03/2024", "18/03/2024"]);
        assert_eq!(report.rows[0].item_name, "Bút");
        assert_eq!(report.rows[1].total, Money::from_dong(50_000));
        assert_eq!(report.rows[2].seller_id, "001");
        assert_eq!(report.total, Money::from_dong(100_000 + 50_000 + 400_000));
    }

    #[test]
    fn test_untagged_import_not_on_purchase_report() {
        let mut untagged = import("u", at(2024, 3, 12), None, TaxStatus::NoTax, vec![item("pen", "Bút", 10, 2_000)]);
        untagged.tax_status = None;
        let report = purchase_report(&[untagged], 2024, 3, &hanoi());
        assert!(report.rows.is_empty());
        assert_eq!(report.total, Money::zero());
    }

    #[test]
    fn test_invalid_month_is_empty() {
        assert!(purchase_report(&[], 2024, 0, &hanoi()).rows.is_empty());
        assert!(revenue_report(&[], &[], 2024, 13, &hanoi()).rows.is_empty());
    }
}
