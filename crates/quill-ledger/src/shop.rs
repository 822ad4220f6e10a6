//! # Shop Facade
//!
//! One handle over the active store for callers that want the whole
//! surface: commits, debt, catalog and the read-side projections.
//!
//! ```text
//!                ┌────────────── Shop ──────────────┐
//!  CLI / UI ───► │ processor()   debt_ledger()      │ ──► Arc<dyn EntityStore>
//!                │ catalog()     daily_stats() ...  │
//!                └──────────────────────────────────┘
//! ```
//!
//! Read-side methods load the collections and hand them to the pure
//! functions in `quill_core::{stats, reports}` with the device time zone.

use chrono::Local;
use std::sync::Arc;

use quill_core::reports::{purchase_report, revenue_report, PurchaseReport, RevenueReport};
use quill_core::stats::{
    calculate_daily_stats, inventory_summary, monthly_customer_split, top_customers, InventorySummary,
    MonthlySplit,
};
use quill_core::{Customer, DailyStat, Order, Product};
use quill_store::{EntityStore, Repository};

use crate::catalog::Catalog;
use crate::debt::{DebtLedger, ReconcileReport};
use crate::error::LedgerResult;
use crate::processor::OrderProcessor;

#[derive(Clone)]
pub struct Shop {
    store: Arc<dyn EntityStore>,
    processor: OrderProcessor,
    debt: DebtLedger,
    catalog: Catalog,
}

impl Shop {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Shop {
            processor: OrderProcessor::new(Arc::clone(&store)),
            debt: DebtLedger::new(Arc::clone(&store)),
            catalog: Catalog::new(Arc::clone(&store)),
            store,
        }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub fn processor(&self) -> &OrderProcessor {
        &self.processor
    }

    pub fn debt_ledger(&self) -> &DebtLedger {
        &self.debt
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn products(&self) -> Repository<Product> {
        Repository::new(Arc::clone(&self.store))
    }

    pub fn customers(&self) -> Repository<Customer> {
        Repository::new(Arc::clone(&self.store))
    }

    pub fn orders(&self) -> Repository<Order> {
        Repository::new(Arc::clone(&self.store))
    }

    // =========================================================================
    // Read side
    // =========================================================================

    /// The trailing daily window ending today (device time).
    pub async fn daily_stats(&self) -> LedgerResult<Vec<DailyStat>> {
        let orders = self.orders().list().await?;
        Ok(calculate_daily_stats(&orders, &Local::now()))
    }

    pub async fn revenue_report(&self, year: i32, month: u32) -> LedgerResult<RevenueReport> {
        let orders = self.orders().list().await?;
        let products = self.products().list().await?;
        Ok(revenue_report(&orders, &products, year, month, &Local))
    }

    pub async fn purchase_report(&self, year: i32, month: u32) -> LedgerResult<PurchaseReport> {
        let orders = self.orders().list().await?;
        Ok(purchase_report(&orders, year, month, &Local))
    }

    pub async fn customer_split(&self, year: i32) -> LedgerResult<Vec<MonthlySplit>> {
        let orders = self.orders().list().await?;
        Ok(monthly_customer_split(&orders, year, &Local))
    }

    pub async fn inventory(&self) -> LedgerResult<InventorySummary> {
        let products = self.products().list().await?;
        Ok(inventory_summary(&products))
    }

    pub async fn top_customers(&self, limit: usize) -> LedgerResult<Vec<Customer>> {
        let customers = self.customers().list().await?;
        Ok(top_customers(&customers, limit).into_iter().cloned().collect())
    }

    pub async fn reconcile(&self) -> LedgerResult<ReconcileReport> {
        self.debt.reconcile_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{customer, import, memory_store, product, sale};
    use quill_core::stats::today_summary;
    use quill_core::{Money, PaymentStatus};

    #[tokio::test]
    async fn test_day_of_trading() {
        let shop = Shop::new(memory_store().await);
        assert_eq!(shop.backend(), "local");

        shop.catalog().save_product(product("p1", 10_000, 6_000, 0)).await.unwrap();
        shop.catalog().save_customer(customer("c1", "0901")).await.unwrap();

        let now = Local::now().timestamp_millis();
        let mut restock = import("imp-1", &[("p1", 10, 6_000)]);
        restock.timestamp = now;
        shop.processor().commit(restock, None).await.unwrap();

        let mut order = sale("o1", &[("p1", 2, 10_000)]);
        order.timestamp = now;
        order.profit = Money::from_dong(8_000);
        order.customer_code = Some("0901".into());
        order.payment_status = PaymentStatus::Debt;
        order.amount_given = Money::zero();
        order.debt_amount = Money::from_dong(20_000);
        shop.processor().commit(order, None).await.unwrap();

        shop.debt_ledger()
            .pay_order_debt("o1", Money::from_dong(5_000), None)
            .await
            .unwrap();

        let stats = shop.daily_stats().await.unwrap();
        let today = today_summary(&stats).unwrap();
        // import 60.000 + sale 20.000; the audit entry is not counted
        assert_eq!(today.revenue, Money::from_dong(80_000));
        assert_eq!(today.orders, 2);

        let inventory = shop.inventory().await.unwrap();
        assert_eq!(inventory.stock_value, Money::from_dong(48_000));

        let top = shop.top_customers(5).await.unwrap();
        assert_eq!(top[0].id, "c1");
        assert_eq!(top[0].debt, Money::from_dong(15_000));

        assert!(shop.reconcile().await.unwrap().is_consistent());
    }
}
