//! # Sale Cart
//!
//! Builds a SALE order from products picked at the till.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cart Operations                                  │
//! │                                                                         │
//! │  Tap product ────────────► add_product() ───► line.qty += 1 / push     │
//! │                                                                         │
//! │  Identify customer ──────► set_customer() ──► re-price non-custom lines│
//! │                                                                         │
//! │  +/- buttons ────────────► adjust_quantity() ► clamp to [1, limit]     │
//! │                                                                         │
//! │  Edit line ──────────────► edit_line() ─────► isCustomPrice flag       │
//! │                                                                         │
//! │  Confirm payment ────────► checkout() ──────► Order (SALE)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Settlement
//! ```text
//!   mode   │ changeDue          │ debtAmount               │ status
//!  ────────┼────────────────────┼──────────────────────────┼──────────────────
//!   Now    │ given − total      │ 0                        │ PAID (given ≥ total)
//!   Debt   │ 0                  │ max(0, total − given)    │ DEBT    (given = 0)
//!          │                    │                          │ PARTIAL (0 < given < total)
//!          │                    │                          │ PAID    (given ≥ total)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Customer, CustomerGroup, Order, OrderItem, OrderType, PaymentStatus, Product};
use crate::{is_guest_code, new_id, MAX_SERVICE_QUANTITY};

/// How the customer settles at the till.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    /// Pay in full now; change is handed back.
    #[default]
    Now,
    /// Put all or part of the total on the customer's tab.
    Debt,
}

/// A cart line with the product facts frozen when it was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub item: OrderItem,
    retail_price: Money,
    wholesale_price: Option<Money>,
    unit_cost: Money,
    is_service: bool,
    stock: i64,
    code: String,
}

impl CartLine {
    fn from_product(product: &Product, group: CustomerGroup) -> Self {
        CartLine {
            item: OrderItem {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                quantity: 1,
                price: product.price_for(group),
                is_custom_price: false,
            },
            retail_price: product.price,
            wholesale_price: product.wholesale_price,
            unit_cost: product.cost,
            is_service: product.is_service(),
            stock: product.stock,
            code: product.code.clone(),
        }
    }

    /// Catalogue price for `group`, ignoring any manual override.
    fn list_price(&self, group: CustomerGroup) -> Money {
        match (group, self.wholesale_price) {
            (CustomerGroup::Wholesale, Some(p)) if !p.is_zero() => p,
            _ => self.retail_price,
        }
    }

    /// Highest quantity this line may reach.
    pub fn limit(&self) -> i64 {
        if self.is_service {
            MAX_SERVICE_QUANTITY
        } else {
            self.stock.max(0)
        }
    }

    /// (price − cost) × quantity
    pub fn profit(&self) -> Money {
        (self.item.price - self.unit_cost).multiply_quantity(self.item.quantity)
    }
}

/// Outcome of pricing the cart against a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub total: Money,
    pub amount_given: Money,
    pub change_due: Money,
    pub debt_amount: Money,
    pub status: PaymentStatus,
}

impl Settlement {
    /// Applies the settlement table in the module docs.
    pub fn compute(total: Money, amount_given: Money, mode: PaymentMode) -> Self {
        match mode {
            PaymentMode::Now => Settlement {
                total,
                amount_given,
                change_due: amount_given - total,
                debt_amount: Money::zero(),
                status: PaymentStatus::Paid,
            },
            PaymentMode::Debt => {
                let debt_amount = (total - amount_given).floor_zero();
                let status = if debt_amount.is_zero() {
                    PaymentStatus::Paid
                } else if amount_given.is_positive() {
                    PaymentStatus::Partial
                } else {
                    PaymentStatus::Debt
                };
                Settlement {
                    total,
                    amount_given,
                    change_due: Money::zero(),
                    debt_amount,
                    status,
                }
            }
        }
    }
}

/// Details captured on the payment screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payment {
    pub mode: PaymentMode,
    pub amount_given: Money,
    /// Typed or looked-up customer code. `None` means walk-in.
    pub customer_code: Option<String>,
    pub note: Option<String>,
}

/// The sale being built at the till.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    lines: Vec<CartLine>,
    group: CustomerGroup,
    customer_code: Option<String>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The identified customer's code, if any.
    pub fn customer_code(&self) -> Option<&str> {
        self.customer_code.as_deref()
    }

    /// Identifies (or clears) the customer and re-prices every line that
    /// was not priced by hand.
    pub fn set_customer(&mut self, customer: Option<&Customer>) {
        self.group = customer.map(|c| c.group).unwrap_or_default();
        self.customer_code = customer.map(|c| c.code.clone());
        let group = self.group;
        for line in self.lines.iter_mut().filter(|l| !l.item.is_custom_price) {
            line.item.price = line.list_price(group);
        }
    }

    /// Adds one unit of `product`.
    ///
    /// ## Errors
    /// `InsufficientStock` when a stocked product is sold out or the line
    /// already holds every unit on the shelf.
    pub fn add_product(&mut self, product: &Product) -> CoreResult<()> {
        if !product.is_service() && product.stock <= 0 {
            return Err(CoreError::InsufficientStock {
                code: product.code.clone(),
                available: product.stock,
                requested: 1,
            });
        }

        let group = self.group;
        match self.lines.iter_mut().find(|l| l.item.product_id == product.id) {
            Some(line) => {
                if !line.is_service && line.item.quantity >= product.stock {
                    return Err(CoreError::InsufficientStock {
                        code: product.code.clone(),
                        available: product.stock,
                        requested: line.item.quantity + 1,
                    });
                }
                line.item.quantity += 1;
                if !line.item.is_custom_price {
                    line.item.price = product.price_for(group);
                }
            }
            None => self.lines.push(CartLine::from_product(product, group)),
        }
        Ok(())
    }

    /// Moves a line's quantity by `delta`, clamped to `[1, limit]`.
    pub fn adjust_quantity(&mut self, product_id: &str, delta: i64) -> CoreResult<i64> {
        let line = self.line_mut(product_id)?;
        let limit = line.limit().max(1);
        line.item.quantity = (line.item.quantity + delta).clamp(1, limit);
        Ok(line.item.quantity)
    }

    /// Sets a line's quantity, clamped to `[1, limit]`.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<i64> {
        let line = self.line_mut(product_id)?;
        let limit = line.limit().max(1);
        line.item.quantity = quantity.clamp(1, limit);
        Ok(line.item.quantity)
    }

    /// Sets a line's unit price, keeping its quantity.
    pub fn set_price(&mut self, product_id: &str, price: Money) -> CoreResult<()> {
        let quantity = self.line_mut(product_id)?.item.quantity;
        self.edit_line(product_id, quantity, price)
    }

    /// Overwrites a line's quantity and unit price from the edit dialog.
    ///
    /// The line is flagged as custom-priced when the price differs from the
    /// catalogue price for the current customer group.
    pub fn edit_line(&mut self, product_id: &str, quantity: i64, price: Money) -> CoreResult<()> {
        if quantity <= 0 {
            return Err(ValidationError::must_be_positive("quantity").into());
        }
        if price.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "price".to_string(),
            }
            .into());
        }
        let group = self.group;
        let line = self.line_mut(product_id)?;
        line.item.quantity = quantity;
        line.item.price = price;
        line.item.is_custom_price = price != line.list_price(group);
        Ok(())
    }

    pub fn remove(&mut self, product_id: &str) -> CoreResult<()> {
        let before = self.lines.len();
        self.lines.retain(|l| l.item.product_id != product_id);
        if self.lines.len() == before {
            return Err(CoreError::ProductNotFound(product_id.to_string()));
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Σ price × quantity
    pub fn total(&self) -> Money {
        self.lines.iter().map(|l| l.item.subtotal()).sum()
    }

    /// Σ (price − cost) × quantity over the frozen product costs.
    pub fn estimated_profit(&self) -> Money {
        self.lines.iter().map(CartLine::profit).sum()
    }

    /// Validates the payment and produces the SALE order.
    ///
    /// ## Errors
    /// - empty cart
    /// - `Now` with less than the total handed over
    /// - `Debt` without a registered customer code
    pub fn checkout(&self, payment: &Payment, order_id: Option<String>, timestamp: i64) -> CoreResult<Order> {
        let order_id = order_id.unwrap_or_else(|| new_id(None));
        if self.lines.is_empty() {
            return Err(ValidationError::rejected(order_id, "cart is empty").into());
        }
        if payment.amount_given.is_negative() {
            return Err(CoreError::InvalidPaymentAmount {
                reason: "amount given cannot be negative".to_string(),
            });
        }

        let total = self.total();
        if payment.mode == PaymentMode::Now && payment.amount_given < total {
            return Err(CoreError::InsufficientPayment {
                total,
                given: payment.amount_given,
            });
        }

        let code = payment
            .customer_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .or(self.customer_code.as_deref());
        if payment.mode == PaymentMode::Debt && is_guest_code(code) {
            return Err(ValidationError::rejected(
                order_id,
                "a customer code is required to sell on credit",
            )
            .into());
        }

        let settlement = Settlement::compute(total, payment.amount_given, payment.mode);

        let mut order = Order::new(order_id, timestamp, OrderType::Sale);
        order.items = self.lines.iter().map(|l| l.item.clone()).collect();
        order.total_amount = settlement.total;
        order.profit = self.estimated_profit();
        order.customer_code = Some(code.unwrap_or(crate::GUEST_CUSTOMER_CODE).to_string());
        order.payment_status = settlement.status;
        order.amount_given = settlement.amount_given;
        order.change_due = settlement.change_due;
        order.debt_amount = settlement.debt_amount;
        order.note = payment
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        Ok(order)
    }

    fn line_mut(&mut self, product_id: &str) -> CoreResult<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|l| l.item.product_id == product_id)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductCategory;

    fn product(id: &str, price: i64, cost: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            code: format!("SP-{}", id),
            name: format!("Product {}", id),
            category: ProductCategory::Stationery,
            price: Money::from_dong(price),
            wholesale_price: Some(Money::from_dong(price * 8 / 10)),
            cost: Money::from_dong(cost),
            stock,
            image_url: None,
        }
    }

    fn wholesale_customer() -> Customer {
        let mut c = Customer::walk_in("c1".into(), "0909", Some("Đại lý Minh"));
        c.group = CustomerGroup::Wholesale;
        c
    }

    fn pay_now(amount: i64) -> Payment {
        Payment {
            mode: PaymentMode::Now,
            amount_given: Money::from_dong(amount),
            ..Default::default()
        }
    }

    #[test]
    fn test_two_line_sale_paid_now() {
        let a = product("a", 10_000, 6_000, 5);
        let b = product("b", 5_000, 3_000, 10);
        let mut cart = Cart::new();
        cart.add_product(&a).unwrap();
        cart.add_product(&b).unwrap();
        cart.adjust_quantity("b", 2).unwrap();

        let order = cart.checkout(&pay_now(25_000), None, 1_700_000_000_000).unwrap();
        assert_eq!(order.total_amount, Money::from_dong(25_000));
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.debt_amount, Money::zero());
        assert_eq!(order.change_due, Money::zero());
        assert_eq!(order.profit, Money::from_dong(4_000 + 3 * 2_000));
        assert_eq!(order.customer_code.as_deref(), Some("GUEST"));
        assert_eq!(order.kind(), OrderType::Sale);
    }

    #[test]
    fn test_change_due() {
        let mut cart = Cart::new();
        cart.add_product(&product("a", 12_000, 8_000, 3)).unwrap();
        let order = cart.checkout(&pay_now(20_000), None, 0).unwrap();
        assert_eq!(order.change_due, Money::from_dong(8_000));
    }

    #[test]
    fn test_insufficient_payment_rejected() {
        let mut cart = Cart::new();
        cart.add_product(&product("a", 12_000, 8_000, 3)).unwrap();
        let err = cart.checkout(&pay_now(10_000), None, 0).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientPayment { .. }));
    }

    #[test]
    fn test_empty_cart_rejected() {
        let err = Cart::new().checkout(&pay_now(0), Some("o1".into()), 0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OrderRejected { .. })
        ));
    }

    #[test]
    fn test_debt_requires_customer() {
        let mut cart = Cart::new();
        cart.add_product(&product("a", 12_000, 8_000, 3)).unwrap();
        let payment = Payment {
            mode: PaymentMode::Debt,
            ..Default::default()
        };
        assert!(cart.checkout(&payment, None, 0).is_err());

        let payment = Payment {
            mode: PaymentMode::Debt,
            customer_code: Some("GUEST".into()),
            ..Default::default()
        };
        assert!(cart.checkout(&payment, None, 0).is_err());
    }

    #[test]
    fn test_debt_statuses() {
        let mut cart = Cart::new();
        cart.add_product(&product("a", 12_000, 8_000, 3)).unwrap();
        let mut payment = Payment {
            mode: PaymentMode::Debt,
            customer_code: Some("0909".into()),
            ..Default::default()
        };

        let order = cart.checkout(&payment, None, 0).unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Debt);
        assert_eq!(order.debt_amount, Money::from_dong(12_000));

        payment.amount_given = Money::from_dong(5_000);
        let order = cart.checkout(&payment, None, 0).unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Partial);
        assert_eq!(order.debt_amount, Money::from_dong(7_000));
        assert_eq!(order.change_due, Money::zero());

        payment.amount_given = Money::from_dong(12_000);
        let order = cart.checkout(&payment, None, 0).unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert!(order.debt_amount.is_zero());
    }

    #[test]
    fn test_customer_change_reprices_except_custom_lines() {
        let a = product("a", 10_000, 6_000, 5);
        let b = product("b", 5_000, 3_000, 10);
        let mut cart = Cart::new();
        cart.add_product(&a).unwrap();
        cart.add_product(&b).unwrap();
        cart.edit_line("b", 1, Money::from_dong(4_500)).unwrap();
        assert!(cart.lines()[1].item.is_custom_price);

        cart.set_customer(Some(&wholesale_customer()));
        assert_eq!(cart.lines()[0].item.price, Money::from_dong(8_000));
        assert_eq!(cart.lines()[1].item.price, Money::from_dong(4_500));

        cart.set_customer(None);
        assert_eq!(cart.lines()[0].item.price, Money::from_dong(10_000));
        assert_eq!(cart.customer_code(), None);
    }

    #[test]
    fn test_edit_to_list_price_clears_custom_flag() {
        let mut cart = Cart::new();
        cart.set_customer(Some(&wholesale_customer()));
        cart.add_product(&product("a", 10_000, 6_000, 5)).unwrap();

        cart.edit_line("a", 2, Money::from_dong(10_000)).unwrap();
        assert!(cart.lines()[0].item.is_custom_price);

        cart.edit_line("a", 2, Money::from_dong(8_000)).unwrap();
        assert!(!cart.lines()[0].item.is_custom_price);
    }

    #[test]
    fn test_stock_limits() {
        let mut cart = Cart::new();
        assert!(cart.add_product(&product("empty", 1_000, 500, 0)).is_err());

        let two = product("two", 1_000, 500, 2);
        cart.add_product(&two).unwrap();
        cart.add_product(&two).unwrap();
        assert!(matches!(
            cart.add_product(&two),
            Err(CoreError::InsufficientStock { requested: 3, .. })
        ));

        assert_eq!(cart.adjust_quantity("two", 10).unwrap(), 2);
        assert_eq!(cart.adjust_quantity("two", -10).unwrap(), 1);
        assert_eq!(cart.set_quantity("two", 0).unwrap(), 1);
        assert_eq!(cart.set_quantity("two", 7).unwrap(), 2);
    }

    #[test]
    fn test_set_price_keeps_quantity() {
        let mut cart = Cart::new();
        cart.add_product(&product("a", 10_000, 6_000, 5)).unwrap();
        cart.set_quantity("a", 3).unwrap();
        cart.set_price("a", Money::from_dong(9_000)).unwrap();
        assert_eq!(cart.lines()[0].item.quantity, 3);
        assert!(cart.lines()[0].item.is_custom_price);
        assert_eq!(cart.total(), Money::from_dong(27_000));
    }

    #[test]
    fn test_services_ignore_stock() {
        let mut photo = product("photo", 500, 200, 0);
        photo.category = ProductCategory::PhotoService;
        let mut cart = Cart::new();
        cart.add_product(&photo).unwrap();
        assert_eq!(cart.adjust_quantity("photo", 2_000_000).unwrap(), MAX_SERVICE_QUANTITY);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        cart.add_product(&product("a", 1_000, 500, 2)).unwrap();
        assert!(cart.remove("missing").is_err());
        cart.remove("a").unwrap();
        assert!(cart.is_empty());

        cart.add_product(&product("a", 1_000, 500, 2)).unwrap();
        cart.clear();
        assert_eq!(cart.total(), Money::zero());
    }

    #[test]
    fn test_cart_customer_code_is_used() {
        let mut cart = Cart::new();
        cart.set_customer(Some(&wholesale_customer()));
        cart.add_product(&product("a", 10_000, 6_000, 5)).unwrap();
        let payment = Payment {
            mode: PaymentMode::Debt,
            ..Default::default()
        };
        let order = cart.checkout(&payment, None, 0).unwrap();
        assert_eq!(order.customer_code.as_deref(), Some("0909"));
        assert_eq!(order.debt_amount, Money::from_dong(8_000));
    }
}
