//! Plain-text output. `--json` bypasses all of this.

use std::fmt::Write;

use quill_core::reports::{PurchaseReport, RevenueReport};
use quill_core::stats::{InventorySummary, MonthlySplit};
use quill_core::{Customer, DailyStat};
use quill_ledger::{CommitOutcome, DebtReceipt, ReconcileReport};
use quill_store::AppSettings;

pub fn today(stat: &DailyStat) -> String {
    format!(
        "Today {}: revenue {}, {} order(s), profit {}",
        stat.date, stat.revenue, stat.orders, stat.profit
    )
}

pub fn daily_stats(stats: &[DailyStat]) -> String {
    let mut out = format!("{:<12} {:>16} {:>7} {:>16}\n", "date", "revenue", "orders", "profit");
    for stat in stats.iter().filter(|s| s.orders > 0) {
        let _ = writeln!(
            out,
            "{:<12} {:>16} {:>7} {:>16}",
            stat.date,
            stat.revenue.to_string(),
            stat.orders,
            stat.profit.to_string()
        );
    }
    out.trim_end().to_string()
}

pub fn revenue_report(report: &RevenueReport) -> String {
    let mut out = format!("Revenue {:02}/{}\n", report.month, report.year);
    for row in &report.rows {
        let _ = writeln!(out, "{}  {:>14}  {}", row.date, row.amount.to_string(), row.description);
    }
    let _ = write!(out, "Total: {}", report.total);
    out
}

pub fn purchase_report(report: &PurchaseReport) -> String {
    let mut out = format!("Purchases without invoice {:02}/{}\n", report.month, report.year);
    for row in &report.rows {
        let _ = writeln!(
            out,
            "{}  {} ({}, {})  {} x{} @ {} = {}",
            row.date,
            row.seller_name,
            row.seller_address,
            row.seller_id,
            row.item_name,
            row.quantity,
            row.unit_price,
            row.total
        );
    }
    let _ = write!(out, "Total: {}", report.total);
    out
}

pub fn customer_split(year: i32, split: &[MonthlySplit]) -> String {
    let mut out = format!("{year}   {:>16} {:>16}\n", "registered", "walk-in");
    for month in split {
        let _ = writeln!(
            out,
            "{:>4}   {:>16} {:>16}",
            month.month,
            month.registered.to_string(),
            month.guest.to_string()
        );
    }
    out.trim_end().to_string()
}

pub fn inventory(summary: &InventorySummary) -> String {
    let mut out = format!(
        "Stock value: {}\nPotential profit: {}\nOut of stock: {}\n",
        summary.stock_value, summary.potential_profit, summary.out_of_stock
    );
    if !summary.low_stock.is_empty() {
        out.push_str("Low stock:\n");
        for product in &summary.low_stock {
            let _ = writeln!(out, "  {:<10} {:<30} {}", product.code, product.name, product.stock);
        }
    }
    out.trim_end().to_string()
}

pub fn customers(customers: &[Customer]) -> String {
    let mut out = String::new();
    for c in customers {
        let _ = writeln!(
            out,
            "{:<14} {:<28} spent {:>14}  debt {:>12}",
            c.code,
            c.name,
            c.total_spent.to_string(),
            c.debt.to_string()
        );
    }
    out.trim_end().to_string()
}

pub fn commit_outcome(outcome: &CommitOutcome) -> String {
    let receipt = match outcome {
        CommitOutcome::Duplicate { order_id } => {
            return format!("Order {order_id} was already recorded; nothing changed");
        }
        CommitOutcome::Committed(receipt) => receipt,
    };

    let mut out = format!(
        "Committed {} {} ({} write(s))",
        receipt.order_type,
        receipt.order_id,
        receipt.steps.len()
    );
    for adj in &receipt.adjusted {
        let _ = write!(
            out,
            "\n  {}: stock {} -> {}, cost {} -> {}",
            adj.product_id, adj.stock_before, adj.stock_after, adj.cost_before, adj.cost_after
        );
    }
    if let Some(customer) = &receipt.customer {
        let _ = write!(
            out,
            "\n  customer {}{}: spent {}, debt {}",
            customer.code,
            if customer.created { " (new)" } else { "" },
            customer.total_spent,
            customer.debt
        );
    }
    if !receipt.negative_stock.is_empty() {
        let _ = write!(out, "\n  WARNING negative stock: {}", receipt.negative_stock.join(", "));
    }
    if !receipt.unresolved.is_empty() {
        let _ = write!(out, "\n  WARNING unknown products skipped: {}", receipt.unresolved.join(", "));
    }
    out
}

pub fn debt_receipt(receipt: &DebtReceipt) -> String {
    let mut out = format!("Applied {} (audit entry {})", receipt.applied, receipt.audit_order_id);
    if receipt.applied != receipt.requested {
        let _ = write!(out, "\n  requested {}, clamped to the outstanding debt", receipt.requested);
    }
    if let Some(order) = &receipt.order {
        let _ = write!(
            out,
            "\n  order {}: {} outstanding, {}",
            order.order_id, order.debt_amount, order.payment_status
        );
    }
    if let Some(customer) = &receipt.customer {
        let _ = write!(
            out,
            "\n  customer {}: debt {} -> {}",
            customer.customer_id, customer.debt_before, customer.debt_after
        );
    }
    out
}

pub fn reconcile(report: &ReconcileReport) -> String {
    if report.is_consistent() {
        return "Customer debt matches open order balances".to_string();
    }
    let mut out = String::new();
    for m in &report.mismatches {
        let _ = writeln!(
            out,
            "{} {} ({}): recorded {}, orders {}",
            m.code, m.name, m.customer_id, m.recorded, m.from_orders
        );
    }
    if !report.orphaned_debt.is_empty() {
        let _ = writeln!(out, "Orders owing with no customer: {}", report.orphaned_debt.join(", "));
    }
    out.trim_end().to_string()
}

pub fn settings(settings: &AppSettings) -> String {
    let url = if settings.remote_url.is_empty() {
        "(not set)"
    } else {
        settings.remote_url.as_str()
    };
    format!(
        "Backend: {}\nRemote URL: {}",
        if settings.use_remote { "remote" } else { "local" },
        url
    )
}
