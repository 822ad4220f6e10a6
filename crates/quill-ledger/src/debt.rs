//! # Debt Ledger
//!
//! Two ways money comes back, each leaving a DEBT_COLLECTION audit order.
//!
//! ```text
//! collect_debt(customer, amount)          pay_order_debt(order, amount)
//! ──────────────────────────────          ─────────────────────────────────
//! applied = min(amount, debt)             applied = min(amount, order.debt)
//! customer.debt -= applied                order.debtAmount  -= applied
//!   UpdateCustomer                        order.amountGiven += applied
//! audit PAY-…  "DEBT PAYMENT"             status PAID | PARTIAL, note += "Paid …"
//!   RecordAudit                             UpdateOrder
//!                                         customer.debt -= applied (if registered)
//!                                           UpdateCustomer
//!                                         audit DEBT-…  "ORDER DEBT #ABC123"
//!                                           RecordAudit
//! ```
//!
//! Customer debt and the per-order balances are kept in step by these two
//! paths only. [`reconcile`] reports where they have drifted apart;
//! `collect_debt` is not tied to any order, so customers paid down that way
//! show up there by construction.

use chrono::{Local, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use quill_core::validation::validate_payment_amount;
use quill_core::{new_id, Customer, Money, Order, OrderItem, OrderType, PaymentStatus};
use quill_store::{EntityStore, Repository};

use crate::error::{CommitStep, LedgerError, LedgerResult};
use crate::saga::Saga;

const DEBT_PAY_PRODUCT: (&str, &str) = ("DEBT_PAY", "DEBT PAYMENT");
const ORDER_DEBT_PRODUCT: &str = "ORDER_DEBT";

// =============================================================================
// Receipts
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerBalance {
    pub customer_id: String,
    pub debt_before: Money,
    pub debt_after: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBalance {
    pub order_id: String,
    pub debt_amount: Money,
    pub amount_given: Money,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtReceipt {
    pub audit_order_id: String,
    pub requested: Money,
    pub applied: Money,
    pub customer: Option<CustomerBalance>,
    pub order: Option<OrderBalance>,
    pub steps: Vec<CommitStep>,
}

// =============================================================================
// Ledger
// =============================================================================

#[derive(Clone)]
pub struct DebtLedger {
    orders: Repository<Order>,
    customers: Repository<Customer>,
}

impl DebtLedger {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        DebtLedger {
            orders: Repository::new(Arc::clone(&store)),
            customers: Repository::new(store),
        }
    }

    /// Records a payment against a customer's running balance.
    ///
    /// Amounts above the outstanding debt are clamped to it. The audit
    /// order's `amountGiven` is the applied (clamped) amount; the receipt
    /// carries both `requested` and `applied`.
    ///
    /// A customer with no debt is rejected with
    /// [`LedgerError::NoOutstandingDebt`].
    pub async fn collect_debt(
        &self,
        customer_id: &str,
        amount: Money,
        note: Option<&str>,
    ) -> LedgerResult<DebtReceipt> {
        validate_payment_amount(amount)?;

        let mut customer = self
            .customers
            .get(customer_id)
            .await?
            .ok_or_else(|| LedgerError::CustomerNotFound(customer_id.to_string()))?;
        if !customer.debt.is_positive() {
            return Err(LedgerError::NoOutstandingDebt {
                kind: "customer",
                id: customer_id.to_string(),
            });
        }

        let applied = clamp_payment(amount, customer.debt, "customer", customer_id);
        let debt_before = customer.debt;
        customer.debt = (customer.debt - applied).floor_zero();

        let mut saga = Saga::new(customer_id);
        saga.step(
            CommitStep::UpdateCustomer {
                customer_id: customer.id.clone(),
            },
            self.customers.upsert(&customer),
        )
        .await?;

        let note = note
            .map(str::to_string)
            .unwrap_or_else(|| format!("Debt collected from {}", customer.name));
        let audit = audit_entry(
            new_id(Some("PAY")),
            DEBT_PAY_PRODUCT.0,
            DEBT_PAY_PRODUCT.1.to_string(),
            Some(customer.code.clone()),
            applied,
            note,
        );
        saga.step(
            CommitStep::RecordAudit {
                order_id: audit.id.clone(),
            },
            self.orders.upsert(&audit),
        )
        .await?;

        info!(
            customer_id = %customer.id,
            applied = %applied,
            debt = %customer.debt,
            "Debt collected"
        );
        Ok(DebtReceipt {
            audit_order_id: audit.id,
            requested: amount,
            applied,
            customer: Some(CustomerBalance {
                customer_id: customer.id,
                debt_before,
                debt_after: customer.debt,
            }),
            order: None,
            steps: saga.finish(),
        })
    }

    /// Settles (part of) one order's outstanding balance.
    pub async fn pay_order_debt(
        &self,
        order_id: &str,
        amount: Money,
        note: Option<&str>,
    ) -> LedgerResult<DebtReceipt> {
        validate_payment_amount(amount)?;

        let mut order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;
        if !order.debt_amount.is_positive() {
            return Err(LedgerError::NoOutstandingDebt {
                kind: "order",
                id: order_id.to_string(),
            });
        }

        let applied = clamp_payment(amount, order.debt_amount, "order", order_id);
        order.debt_amount -= applied;
        order.amount_given += applied;
        order.payment_status = if order.debt_amount.is_zero() {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Partial
        };
        order.append_note(&format!(
            "Paid {} on {}",
            applied,
            Local::now().format("%d/%m/%Y")
        ));

        let mut saga = Saga::new(order_id);
        saga.step(
            CommitStep::UpdateOrder {
                order_id: order.id.clone(),
            },
            self.orders.upsert(&order),
        )
        .await?;

        let mut balance = None;
        if let Some(code) = order.registered_customer() {
            let found = saga
                .guard("find customer", self.customers.find_by_code(code))
                .await?;
            match found {
                Some(mut customer) => {
                    let debt_before = customer.debt;
                    customer.debt = (customer.debt - applied).floor_zero();
                    saga.step(
                        CommitStep::UpdateCustomer {
                            customer_id: customer.id.clone(),
                        },
                        self.customers.upsert(&customer),
                    )
                    .await?;
                    balance = Some(CustomerBalance {
                        customer_id: customer.id,
                        debt_before,
                        debt_after: customer.debt,
                    });
                }
                None => warn!(
                    order_id = %order.id,
                    code = %code,
                    "Order customer no longer exists, only the order was settled"
                ),
            }
        }

        let note = note
            .map(str::to_string)
            .unwrap_or_else(|| format!("Debt payment for order #{}", order.id));
        let audit = audit_entry(
            new_id(Some("DEBT")),
            ORDER_DEBT_PRODUCT,
            format!("ORDER DEBT #{}", short_order_ref(&order.id)),
            order.customer_code.clone(),
            applied,
            note,
        );
        saga.step(
            CommitStep::RecordAudit {
                order_id: audit.id.clone(),
            },
            self.orders.upsert(&audit),
        )
        .await?;

        info!(
            order_id = %order.id,
            applied = %applied,
            remaining = %order.debt_amount,
            status = %order.payment_status,
            "Order debt paid"
        );
        Ok(DebtReceipt {
            audit_order_id: audit.id,
            requested: amount,
            applied,
            customer: balance,
            order: Some(OrderBalance {
                order_id: order.id,
                debt_amount: order.debt_amount,
                amount_given: order.amount_given,
                payment_status: order.payment_status,
            }),
            steps: saga.finish(),
        })
    }

    /// [`reconcile`] over the current store contents.
    pub async fn reconcile_all(&self) -> LedgerResult<ReconcileReport> {
        let customers = self.customers.list().await?;
        let orders = self.orders.list().await?;
        Ok(reconcile(&customers, &orders))
    }
}

fn clamp_payment(amount: Money, outstanding: Money, kind: &str, id: &str) -> Money {
    if amount > outstanding {
        warn!(
            kind,
            id = %id,
            requested = %amount,
            outstanding = %outstanding,
            "Payment exceeds outstanding debt, clamping"
        );
        outstanding
    } else {
        amount
    }
}

fn audit_entry(
    id: String,
    product_id: &str,
    product_name: String,
    customer_code: Option<String>,
    amount: Money,
    note: String,
) -> Order {
    let mut audit = Order::new(id, Utc::now().timestamp_millis(), OrderType::DebtCollection);
    audit.items.push(OrderItem {
        product_id: product_id.to_string(),
        product_name,
        quantity: 1,
        price: Money::zero(),
        is_custom_price: false,
    });
    audit.customer_code = customer_code;
    audit.payment_status = PaymentStatus::Paid;
    audit.amount_given = amount;
    audit.note = Some(note);
    audit
}

/// Last six characters of an order id, upper-cased.
fn short_order_ref(order_id: &str) -> String {
    let chars: Vec<char> = order_id.chars().collect();
    let start = chars.len().saturating_sub(6);
    chars[start..].iter().collect::<String>().to_uppercase()
}

// =============================================================================
// Reconciliation
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtMismatch {
    pub customer_id: String,
    pub code: String,
    pub name: String,
    /// `customer.debt` as stored.
    pub recorded: Money,
    /// Σ debtAmount over the customer's orders.
    pub from_orders: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub mismatches: Vec<DebtMismatch>,
    /// Orders carrying debt whose customer code matches nobody.
    pub orphaned_debt: Vec<String>,
}

impl ReconcileReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty() && self.orphaned_debt.is_empty()
    }
}

/// Compares each customer's recorded debt with what their orders still owe.
pub fn reconcile(customers: &[Customer], orders: &[Order]) -> ReconcileReport {
    let mut owed: HashMap<&str, Money> = HashMap::new();
    let mut orphaned_debt = Vec::new();

    for order in orders.iter().filter(|o| o.debt_amount.is_positive()) {
        let known = order
            .registered_customer()
            .filter(|code| customers.iter().any(|c| c.code.trim() == *code));
        match known {
            Some(code) => *owed.entry(code).or_default() += order.debt_amount,
            None => orphaned_debt.push(order.id.clone()),
        }
    }

    let mismatches = customers
        .iter()
        .filter_map(|c| {
            let from_orders = owed.get(c.code.trim()).copied().unwrap_or_default();
            (from_orders != c.debt).then(|| DebtMismatch {
                customer_id: c.id.clone(),
                code: c.code.clone(),
                name: c.name.clone(),
                recorded: c.debt,
                from_orders,
            })
        })
        .collect();

    ReconcileReport {
        mismatches,
        orphaned_debt,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{customer, memory_store, sale};

    struct Fixture {
        ledger: DebtLedger,
        orders: Repository<Order>,
        customers: Repository<Customer>,
    }

    async fn fixture() -> Fixture {
        let store = memory_store().await;
        Fixture {
            ledger: DebtLedger::new(Arc::clone(&store)),
            orders: Repository::new(Arc::clone(&store)),
            customers: Repository::new(store),
        }
    }

    fn debt_sale(id: &str, code: Option<&str>, total: i64, debt: i64) -> Order {
        let mut order = sale(id, &[("p1", 1, total)]);
        order.customer_code = code.map(str::to_string);
        order.payment_status = PaymentStatus::Debt;
        order.amount_given = Money::from_dong(total - debt);
        order.debt_amount = Money::from_dong(debt);
        order
    }

    async fn audit_entries(orders: &Repository<Order>) -> Vec<Order> {
        orders
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|o| o.kind() == OrderType::DebtCollection)
            .collect()
    }

    #[tokio::test]
    async fn test_partial_order_payment() {
        let f = fixture().await;
        let mut lan = customer("c1", "0901");
        lan.debt = Money::from_dong(5_000);
        f.customers.upsert(&lan).await.unwrap();
        f.orders
            .upsert(&debt_sale("ord-abc123def", Some("0901"), 5_000, 5_000))
            .await
            .unwrap();

        let receipt = f
            .ledger
            .pay_order_debt("ord-abc123def", Money::from_dong(3_000), None)
            .await
            .unwrap();

        let order = f.orders.get("ord-abc123def").await.unwrap().unwrap();
        assert_eq!(order.debt_amount, Money::from_dong(2_000));
        assert_eq!(order.amount_given, Money::from_dong(3_000));
        assert_eq!(order.payment_status, PaymentStatus::Partial);
        assert!(order.note.unwrap().starts_with("Paid 3.000₫ on "));

        let lan = f.customers.get("c1").await.unwrap().unwrap();
        assert_eq!(lan.debt, Money::from_dong(2_000));

        let audits = audit_entries(&f.orders).await;
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].id, receipt.audit_order_id);
        assert!(audits[0].id.starts_with("DEBT-"));
        assert_eq!(audits[0].amount_given, Money::from_dong(3_000));
        assert_eq!(audits[0].debt_amount, Money::zero());
        assert_eq!(audits[0].total_amount, Money::zero());
        assert_eq!(audits[0].items[0].product_id, "ORDER_DEBT");
        assert_eq!(audits[0].items[0].product_name, "ORDER DEBT #123DEF");
        assert_eq!(audits[0].note.as_deref(), Some("Debt payment for order #ord-abc123def"));
        assert_eq!(receipt.steps.len(), 3);
    }

    #[tokio::test]
    async fn test_overpayment_settles_order_then_rejects() {
        let f = fixture().await;
        let mut lan = customer("c1", "0901");
        lan.debt = Money::from_dong(2_000);
        f.customers.upsert(&lan).await.unwrap();
        let mut order = debt_sale("o1", Some("0901"), 10_000, 2_000);
        order.note = Some("giao sau".into());
        f.orders.upsert(&order).await.unwrap();

        let receipt = f
            .ledger
            .pay_order_debt("o1", Money::from_dong(9_000), Some("cash"))
            .await
            .unwrap();
        assert_eq!(receipt.applied, Money::from_dong(2_000));

        let order = f.orders.get("o1").await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.amount_given, Money::from_dong(10_000));
        assert!(order.note.unwrap().starts_with("giao sau | Paid 2.000₫ on "));
        assert_eq!(f.customers.get("c1").await.unwrap().unwrap().debt, Money::zero());

        let err = f
            .ledger
            .pay_order_debt("o1", Money::from_dong(1_000), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NoOutstandingDebt { kind: "order", .. }));
    }

    #[tokio::test]
    async fn test_guest_order_skips_customer() {
        let f = fixture().await;
        f.orders.upsert(&debt_sale("o1", None, 4_000, 4_000)).await.unwrap();

        let receipt = f
            .ledger
            .pay_order_debt("o1", Money::from_dong(4_000), None)
            .await
            .unwrap();
        assert!(receipt.customer.is_none());
        assert_eq!(receipt.steps.len(), 2);
        assert!(f.customers.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_order_and_bad_amount() {
        let f = fixture().await;
        assert!(matches!(
            f.ledger.pay_order_debt("nope", Money::from_dong(1_000), None).await,
            Err(LedgerError::OrderNotFound(_))
        ));
        assert!(matches!(
            f.ledger.pay_order_debt("nope", Money::zero(), None).await,
            Err(LedgerError::Core(_))
        ));
    }

    #[tokio::test]
    async fn test_collect_debt_clamps_and_logs() {
        let f = fixture().await;
        let mut lan = customer("c1", "0901");
        lan.name = "Chị Lan".into();
        lan.debt = Money::from_dong(5_000);
        f.customers.upsert(&lan).await.unwrap();

        let receipt = f
            .ledger
            .collect_debt("c1", Money::from_dong(8_000), None)
            .await
            .unwrap();
        assert_eq!(receipt.requested, Money::from_dong(8_000));
        assert_eq!(receipt.applied, Money::from_dong(5_000));
        assert_eq!(f.customers.get("c1").await.unwrap().unwrap().debt, Money::zero());

        let audits = audit_entries(&f.orders).await;
        assert_eq!(audits.len(), 1);
        assert!(audits[0].id.starts_with("PAY-"));
        assert_eq!(audits[0].amount_given, Money::from_dong(5_000));
        assert_eq!(audits[0].customer_code.as_deref(), Some("0901"));
        assert_eq!(audits[0].items[0].product_name, "DEBT PAYMENT");
        assert_eq!(audits[0].note.as_deref(), Some("Debt collected from Chị Lan"));

        let err = f
            .ledger
            .collect_debt("c1", Money::from_dong(1_000), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NoOutstandingDebt { kind: "customer", .. }));
    }

    #[tokio::test]
    async fn test_collect_debt_unknown_customer() {
        let f = fixture().await;
        assert!(matches!(
            f.ledger.collect_debt("ghost", Money::from_dong(1_000), None).await,
            Err(LedgerError::CustomerNotFound(_))
        ));
    }

    #[test]
    fn test_short_order_ref() {
        assert_eq!(short_order_ref("1700000abcdef"), "ABCDEF");
        assert_eq!(short_order_ref("ab"), "AB");
    }

    #[test]
    fn test_reconcile() {
        let mut lan = customer("c1", "0901");
        lan.debt = Money::from_dong(7_000);
        let mut nam = customer("c2", "0902");
        nam.debt = Money::from_dong(1_000);

        let orders = vec![
            debt_sale("o1", Some("0901"), 5_000, 3_000),
            debt_sale("o2", Some("0901"), 4_000, 4_000),
            debt_sale("o3", Some("0999"), 2_000, 2_000),
            sale("o4", &[("p1", 1, 1_000)]),
        ];

        let report = reconcile(&[lan, nam], &orders);
        assert!(!report.is_consistent());
        assert_eq!(report.orphaned_debt, vec!["o3".to_string()]);
        assert_eq!(report.mismatches.len(), 1);
        assert_eq!(report.mismatches[0].customer_id, "c2");
        assert_eq!(report.mismatches[0].from_orders, Money::zero());
    }
}
