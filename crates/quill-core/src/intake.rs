//! # Stock Intake
//!
//! Builds IMPORT orders from the goods-received form.
//!
//! An import is always settled on the spot (`PAID`, `amountGiven = total`)
//! and carries no profit. Purchases without a VAT invoice (`NO_TAX`) must
//! name the seller so the monthly purchase report can be filed.

use chrono::NaiveDate;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Order, OrderItem, OrderType, PaymentStatus, Product, TaxStatus};
use crate::new_id;

/// Seller identity printed on the purchase report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Seller {
    pub name: String,
    pub address: String,
    pub id_card: String,
}

/// The goods-received form.
#[derive(Debug, Clone, Default)]
pub struct ImportSheet {
    items: Vec<OrderItem>,
    pub tax_status: TaxStatus,
    pub seller: Seller,
    pub purchase_date: Option<NaiveDate>,
    pub note: Option<String>,
}

impl ImportSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `quantity` units of `product` bought at `unit_cost` each.
    ///
    /// Receiving the same product twice on one form merges the lines.
    pub fn add_line(&mut self, product: &Product, quantity: i64, unit_cost: Money) -> CoreResult<()> {
        if quantity <= 0 {
            return Err(ValidationError::must_be_positive("quantity").into());
        }
        if unit_cost.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "unit cost".to_string(),
            }
            .into());
        }

        match self.items.iter_mut().find(|i| i.product_id == product.id) {
            Some(existing) if existing.price == unit_cost => existing.quantity += quantity,
            _ => self.items.push(OrderItem {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                quantity,
                price: unit_cost,
                is_custom_price: false,
            }),
        }
        Ok(())
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Σ quantity × unit cost
    pub fn total(&self) -> Money {
        self.items.iter().map(OrderItem::subtotal).sum()
    }

    /// Produces the IMPORT order (`IMP-…`).
    pub fn into_order(self, timestamp: i64) -> CoreResult<Order> {
        let id = new_id(Some("IMP"));
        if self.items.is_empty() {
            return Err(ValidationError::rejected(id, "import has no lines").into());
        }

        let total = self.total();
        let mut order = Order::new(id, timestamp, OrderType::Import);
        order.items = self.items;
        order.total_amount = total;
        order.profit = Money::zero();
        order.payment_status = PaymentStatus::Paid;
        order.amount_given = total;
        order.tax_status = Some(self.tax_status);
        order.tax_amount = Some(Money::zero());
        order.seller_name = non_empty(self.seller.name);
        order.seller_address = non_empty(self.seller.address);
        order.seller_id_card = non_empty(self.seller.id_card);
        order.purchase_date = self.purchase_date.map(|d| d.format("%Y-%m-%d").to_string());
        order.note = self.note.and_then(non_empty);

        crate::validation::validate_import(&order)?;
        Ok(order)
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
