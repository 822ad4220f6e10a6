//! # Order Processor
//!
//! Commits a SALE or IMPORT order and applies it to stock and the customer.
//!
//! ## Commit Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit(order, quick_name)                                             │
//! │                                                                         │
//! │  0. type defaults to SALE; validate_order()          (no I/O yet)      │
//! │  1. order id already recorded?  ──yes──► Duplicate   (no-op, warn)     │
//! │  2. RecordOrder                 orders.upsert(order)                   │
//! │  3. AdjustStock(p) per line     SALE:   stock -= qty                   │
//! │                                 IMPORT: weighted-average receive()     │
//! │  4. UpdateCustomer (SALE only)  resolve_or_create(code | GUEST)        │
//! │                                 totalSpent += total                    │
//! │                                 lastPurchaseDate = timestamp           │
//! │                                 debt += debtAmount if DEBT/PARTIAL     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no transaction across steps 2-4. A store failure after step 2
//! comes back as [`LedgerError::PartiallyApplied`](crate::LedgerError)
//! listing what was written. Re-submitting the same order is then a
//! duplicate no-op, so the remaining steps are never applied twice.
//!
//! Sales may drive stock negative. The receipt lists those products.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use quill_core::validation::validate_order;
use quill_core::{is_guest_code, Customer, Money, Order, OrderType, Product, GUEST_CUSTOMER_CODE};
use quill_store::{EntityStore, Repository};

use crate::error::{CommitStep, LedgerResult};
use crate::saga::Saga;

/// Stock and cost of one product before and after a commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub product_id: String,
    pub stock_before: i64,
    pub stock_after: i64,
    pub cost_before: Money,
    pub cost_after: Money,
}

/// The customer a sale was booked against.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUpdate {
    pub customer_id: String,
    pub code: String,
    /// True when the record did not exist before this sale.
    pub created: bool,
    pub total_spent: Money,
    pub debt: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReceipt {
    pub order_id: String,
    pub order_type: OrderType,
    pub steps: Vec<CommitStep>,
    pub adjusted: Vec<StockAdjustment>,
    /// Non-service products left below zero by this sale.
    pub negative_stock: Vec<String>,
    /// Line product ids with no matching product; those lines were skipped.
    pub unresolved: Vec<String>,
    pub customer: Option<CustomerUpdate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CommitOutcome {
    Committed(CommitReceipt),
    /// The order id was already recorded; nothing was written.
    Duplicate { order_id: String },
}

impl CommitOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, CommitOutcome::Duplicate { .. })
    }

    pub fn receipt(&self) -> Option<&CommitReceipt> {
        match self {
            CommitOutcome::Committed(receipt) => Some(receipt),
            CommitOutcome::Duplicate { .. } => None,
        }
    }
}

#[derive(Clone)]
pub struct OrderProcessor {
    orders: Repository<Order>,
    products: Repository<Product>,
    customers: Repository<Customer>,
}

impl OrderProcessor {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        OrderProcessor {
            orders: Repository::new(Arc::clone(&store)),
            products: Repository::new(Arc::clone(&store)),
            customers: Repository::new(store),
        }
    }

    /// Records `order` and applies it.
    ///
    /// `quick_name` names the customer when the sale creates one.
    pub async fn commit(&self, mut order: Order, quick_name: Option<&str>) -> LedgerResult<CommitOutcome> {
        if order.order_type.is_none() {
            order.order_type = Some(OrderType::Sale);
        }
        validate_order(&order)?;

        if self.orders.exists(&order.id).await? {
            warn!(order_id = %order.id, "Order already recorded, ignoring duplicate submission");
            return Ok(CommitOutcome::Duplicate { order_id: order.id });
        }

        let kind = order.kind();
        info!(
            order_id = %order.id,
            order_type = %kind,
            items = order.items.len(),
            total = %order.total_amount,
            "Committing order"
        );

        let mut saga = Saga::new(order.id.clone());
        saga.step(CommitStep::RecordOrder, self.orders.upsert(&order)).await?;

        let mut receipt = CommitReceipt {
            order_id: order.id.clone(),
            order_type: kind,
            steps: Vec::new(),
            adjusted: Vec::new(),
            negative_stock: Vec::new(),
            unresolved: Vec::new(),
            customer: None,
        };

        let mut products = saga.guard("load products", self.products.list()).await?;
        for item in &order.items {
            let Some(product) = products.iter_mut().find(|p| p.id == item.product_id) else {
                warn!(
                    order_id = %order.id,
                    product_id = %item.product_id,
                    "Order line references an unknown product, skipping"
                );
                receipt.unresolved.push(item.product_id.clone());
                continue;
            };

            let (stock_before, cost_before) = (product.stock, product.cost);
            match kind {
                OrderType::Import => {
                    product.receive(item.quantity, item.price);
                }
                _ => {
                    product.stock -= item.quantity;
                    if product.stock < 0 && !product.is_service() {
                        warn!(
                            product_id = %product.id,
                            stock = product.stock,
                            "Sale left product with negative stock"
                        );
                        if !receipt.negative_stock.contains(&product.id) {
                            receipt.negative_stock.push(product.id.clone());
                        }
                    }
                }
            }

            saga.step(
                CommitStep::AdjustStock {
                    product_id: product.id.clone(),
                },
                self.products.upsert(product),
            )
            .await?;
            receipt.adjusted.push(StockAdjustment {
                product_id: product.id.clone(),
                stock_before,
                stock_after: product.stock,
                cost_before,
                cost_after: product.cost,
            });
        }

        if kind == OrderType::Sale {
            receipt.customer = Some(self.book_sale(&order, quick_name, &mut saga).await?);
        }

        receipt.steps = saga.finish();
        info!(
            order_id = %receipt.order_id,
            steps = receipt.steps.len(),
            "Order committed"
        );
        Ok(CommitOutcome::Committed(receipt))
    }

    async fn book_sale(
        &self,
        order: &Order,
        quick_name: Option<&str>,
        saga: &mut Saga,
    ) -> LedgerResult<CustomerUpdate> {
        let code = match order.customer_code.as_deref() {
            code if is_guest_code(code) => GUEST_CUSTOMER_CODE,
            code => code.map(str::trim).unwrap_or(GUEST_CUSTOMER_CODE),
        };

        let resolution = saga
            .guard("resolve customer", self.customers.resolve_or_create(code, quick_name))
            .await?;
        let created = resolution.was_created();
        let mut customer = resolution.into_customer();

        customer.total_spent += order.total_amount;
        customer.last_purchase_date = Some(order.timestamp);
        if order.payment_status.carries_debt() {
            customer.debt += order.debt_amount;
        }

        saga.step(
            CommitStep::UpdateCustomer {
                customer_id: customer.id.clone(),
            },
            self.customers.upsert(&customer),
        )
        .await?;

        Ok(CustomerUpdate {
            customer_id: customer.id,
            code: customer.code,
            created,
            total_spent: customer.total_spent,
            debt: customer.debt,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::testing::{customer, import, memory_store, product, sale, FailingStore};
    use quill_core::{PaymentStatus, ProductCategory};
    use quill_store::{Collection, StoreError};

    #[tokio::test]
    async fn test_import_averages_cost() {
        let store = memory_store().await;
        let processor = OrderProcessor::new(Arc::clone(&store));
        let products: Repository<Product> = Repository::new(Arc::clone(&store));
        products.upsert(&product("p1", 1_500, 1_000, 10)).await.unwrap();

        let outcome = processor
            .commit(import("imp-1", &[("p1", 10, 2_000)]), None)
            .await
            .unwrap();

        let p = products.get("p1").await.unwrap().unwrap();
        assert_eq!(p.cost, Money::from_dong(1_500));
        assert_eq!(p.stock, 20);

        let receipt = outcome.receipt().unwrap();
        assert!(receipt.customer.is_none());
        assert_eq!(receipt.adjusted[0].cost_before, Money::from_dong(1_000));
        let customers: Repository<Customer> = Repository::new(store);
        assert!(customers.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sale_books_customer_totals_and_debt() {
        let store = memory_store().await;
        let processor = OrderProcessor::new(Arc::clone(&store));
        let products: Repository<Product> = Repository::new(Arc::clone(&store));
        let customers: Repository<Customer> = Repository::new(Arc::clone(&store));
        products.upsert(&product("p1", 10_000, 6_000, 5)).await.unwrap();
        products.upsert(&product("p2", 5_000, 3_000, 20)).await.unwrap();
        let mut lan = customer("c1", "0901");
        lan.debt = Money::from_dong(1_000);
        customers.upsert(&lan).await.unwrap();

        let mut order = sale("o1", &[("p1", 1, 10_000), ("p2", 3, 5_000)]);
        order.customer_code = Some("0901".into());
        order.payment_status = PaymentStatus::Partial;
        order.amount_given = Money::from_dong(20_000);
        order.debt_amount = Money::from_dong(5_000);

        processor.commit(order, None).await.unwrap();

        let lan = customers.get("c1").await.unwrap().unwrap();
        assert_eq!(lan.total_spent, Money::from_dong(25_000));
        assert_eq!(lan.debt, Money::from_dong(6_000));
        assert_eq!(lan.last_purchase_date, Some(1_700_000_000_000));
        assert_eq!(products.get("p2").await.unwrap().unwrap().stock, 17);
    }

    #[tokio::test]
    async fn test_paid_sale_leaves_debt_alone() {
        let store = memory_store().await;
        let processor = OrderProcessor::new(Arc::clone(&store));
        let customers: Repository<Customer> = Repository::new(Arc::clone(&store));
        let mut lan = customer("c1", "0901");
        lan.debt = Money::from_dong(4_000);
        customers.upsert(&lan).await.unwrap();

        let mut order = sale("o1", &[("p1", 1, 8_000)]);
        order.customer_code = Some("0901".into());
        order.debt_amount = Money::from_dong(8_000);
        processor.commit(order, None).await.unwrap();

        let lan = customers.get("c1").await.unwrap().unwrap();
        assert_eq!(lan.debt, Money::from_dong(4_000));
        assert_eq!(lan.total_spent, Money::from_dong(8_000));
    }

    #[tokio::test]
    async fn test_guest_sales_share_one_record() {
        let store = memory_store().await;
        let processor = OrderProcessor::new(Arc::clone(&store));

        let first = processor.commit(sale("o1", &[("p1", 1, 3_000)]), None).await.unwrap();
        let mut second = sale("o2", &[("p1", 2, 3_000)]);
        second.customer_code = Some("guest".into());
        let second = processor.commit(second, None).await.unwrap();

        assert!(first.receipt().unwrap().customer.as_ref().unwrap().created);
        let booked = second.receipt().unwrap().customer.clone().unwrap();
        assert!(!booked.created);
        assert_eq!(booked.code, GUEST_CUSTOMER_CODE);
        assert_eq!(booked.total_spent, Money::from_dong(9_000));

        let customers: Repository<Customer> = Repository::new(store);
        assert_eq!(customers.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_quick_name_used_for_new_customer() {
        let store = memory_store().await;
        let processor = OrderProcessor::new(Arc::clone(&store));

        let mut order = sale("o1", &[("p1", 1, 3_000)]);
        order.customer_code = Some("0987654321".into());
        processor.commit(order, Some("Cô Hoa")).await.unwrap();

        let customers: Repository<Customer> = Repository::new(store);
        let hoa = customers.find_by_code("0987654321").await.unwrap().unwrap();
        assert_eq!(hoa.name, "Cô Hoa");
        assert_eq!(hoa.phone, "0987654321");
    }

    #[tokio::test]
    async fn test_duplicate_is_noop() {
        let store = memory_store().await;
        let processor = OrderProcessor::new(Arc::clone(&store));
        let products: Repository<Product> = Repository::new(Arc::clone(&store));
        products.upsert(&product("p1", 3_000, 2_000, 10)).await.unwrap();

        let order = sale("o1", &[("p1", 2, 3_000)]);
        assert!(!processor.commit(order.clone(), None).await.unwrap().is_duplicate());
        let customers_before = store.list(Collection::Customers).await.unwrap();

        assert!(processor.commit(order, None).await.unwrap().is_duplicate());
        assert_eq!(products.get("p1").await.unwrap().unwrap().stock, 8);
        assert_eq!(store.list(Collection::Orders).await.unwrap().len(), 1);
        assert_eq!(store.list(Collection::Customers).await.unwrap(), customers_before);
    }

    #[tokio::test]
    async fn test_oversell_flags_negative_stock() {
        let store = memory_store().await;
        let processor = OrderProcessor::new(Arc::clone(&store));
        let products: Repository<Product> = Repository::new(Arc::clone(&store));
        products.upsert(&product("p1", 3_000, 2_000, 1)).await.unwrap();
        let mut photo = product("svc", 500, 0, quill_core::SERVICE_STOCK);
        photo.category = ProductCategory::PhotoService;
        products.upsert(&photo).await.unwrap();

        let outcome = processor
            .commit(sale("o1", &[("p1", 3, 3_000), ("svc", 40, 500), ("gone", 1, 1_000)]), None)
            .await
            .unwrap();

        let receipt = outcome.receipt().unwrap();
        assert_eq!(receipt.negative_stock, vec!["p1".to_string()]);
        assert_eq!(receipt.unresolved, vec!["gone".to_string()]);
        assert_eq!(receipt.adjusted.len(), 2);
        assert_eq!(products.get("p1").await.unwrap().unwrap().stock, -2);
    }

    #[tokio::test]
    async fn test_invalid_order_writes_nothing() {
        let store = memory_store().await;
        let processor = OrderProcessor::new(Arc::clone(&store));

        let mut order = sale("o1", &[("p1", 1, 3_000)]);
        order.payment_status = PaymentStatus::Debt;
        order.debt_amount = Money::from_dong(3_000);

        let err = processor.commit(order, None).await.unwrap_err();
        assert!(matches!(err, LedgerError::Core(_)));
        assert!(store.list(Collection::Orders).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_untyped_order_committed_as_sale() {
        let store = memory_store().await;
        let processor = OrderProcessor::new(Arc::clone(&store));

        let mut order = sale("o1", &[("p1", 1, 3_000)]);
        order.order_type = None;
        processor.commit(order, None).await.unwrap();

        let orders: Repository<Order> = Repository::new(store);
        assert_eq!(orders.get("o1").await.unwrap().unwrap().order_type, Some(OrderType::Sale));
    }

    #[tokio::test]
    async fn test_customer_write_failure_reports_partial_commit() {
        let inner = memory_store().await;
        let products: Repository<Product> = Repository::new(Arc::clone(&inner));
        products.upsert(&product("p1", 3_000, 2_000, 10)).await.unwrap();

        let failing: Arc<dyn EntityStore> = Arc::new(FailingStore::new(inner, Collection::Customers));
        let processor = OrderProcessor::new(failing);

        let err = processor
            .commit(sale("o1", &[("p1", 1, 3_000)]), None)
            .await
            .unwrap_err();
        match err {
            LedgerError::PartiallyApplied { completed, source, .. } => {
                assert_eq!(
                    completed,
                    vec![
                        CommitStep::RecordOrder,
                        CommitStep::AdjustStock {
                            product_id: "p1".into()
                        }
                    ]
                );
                assert!(matches!(source, StoreError::Transport(_)));
            }
            other => panic!("expected partial commit, got {other:?}"),
        }
        assert_eq!(products.get("p1").await.unwrap().unwrap().stock, 9);
    }
}
