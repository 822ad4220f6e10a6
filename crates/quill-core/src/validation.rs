//! # Validation Module
//!
//! Rules checked before an order, product or customer reaches the store.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI                                                           │
//! │  ├── Disabled buttons, insufficient-cash alert                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Order shape per type (SALE / IMPORT / DEBT_COLLECTION)            │
//! │  └── Amounts and identity fields                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: quill-ledger commit (no I/O happens if Layer 2 fails)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Customer, Order, OrderType, Product, TaxStatus};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates an order submitted for commit.
///
/// DEBT_COLLECTION orders are produced by the debt ledger only and are
/// refused here.
pub fn validate_order(order: &Order) -> ValidationResult<()> {
    if order.id.trim().is_empty() {
        return Err(ValidationError::required("order id"));
    }
    match order.kind() {
        OrderType::Sale => validate_sale(order),
        OrderType::Import => validate_import(order),
        OrderType::DebtCollection => Err(ValidationError::rejected(
            &order.id,
            "debt collection entries are recorded by the debt ledger",
        )),
    }
}

/// SALE: lines present and positive, debt only against a registered customer.
pub fn validate_sale(order: &Order) -> ValidationResult<()> {
    validate_lines(order)?;
    validate_non_negative("amount given", order.amount_given)?;
    validate_non_negative("debt amount", order.debt_amount)?;

    if order.payment_status.carries_debt() && order.registered_customer().is_none() {
        return Err(ValidationError::rejected(
            &order.id,
            format!(
                "{} sale needs a customer code",
                order.payment_status
            ),
        ));
    }
    Ok(())
}

/// IMPORT: lines present and positive, seller identity for NO_TAX.
///
/// An import with no tax status is not a NO_TAX purchase.
pub fn validate_import(order: &Order) -> ValidationResult<()> {
    validate_lines(order)?;

    if order.tax_status == Some(TaxStatus::NoTax) {
        let fields = [
            ("seller name", &order.seller_name),
            ("seller address", &order.seller_address),
            ("seller id card", &order.seller_id_card),
        ];
        for (field, value) in fields {
            if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                return Err(ValidationError::required(field));
            }
        }
    }

    if let Some(raw) = order.purchase_date.as_deref() {
        if order.purchase_date().is_none() {
            return Err(ValidationError::InvalidFormat {
                field: "purchase date".to_string(),
                reason: format!("expected YYYY-MM-DD, got '{}'", raw),
            });
        }
    }
    Ok(())
}

fn validate_lines(order: &Order) -> ValidationResult<()> {
    if order.items.is_empty() {
        return Err(ValidationError::rejected(&order.id, "order has no items"));
    }
    for item in &order.items {
        if item.product_id.trim().is_empty() {
            return Err(ValidationError::required("product id"));
        }
        if item.quantity <= 0 {
            return Err(ValidationError::must_be_positive(format!(
                "quantity of {}",
                item.product_name
            )));
        }
        validate_non_negative("price", item.price)?;
    }
    Ok(())
}

/// A payment amount: strictly positive.
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::must_be_positive("payment amount"));
    }
    Ok(())
}

pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Product form: a name and non-negative prices.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    if product.name.trim().is_empty() {
        return Err(ValidationError::required("product name"));
    }
    validate_non_negative("price", product.price)?;
    validate_non_negative("cost", product.cost)?;
    if let Some(wholesale) = product.wholesale_price {
        validate_non_negative("wholesale price", wholesale)?;
    }
    Ok(())
}

/// Customer form: code and name are required.
pub fn validate_customer(customer: &Customer) -> ValidationResult<()> {
    if customer.code.trim().is_empty() {
        return Err(ValidationError::required("customer code"));
    }
    if customer.name.trim().is_empty() {
        return Err(ValidationError::required("customer name"));
    }
    validate_non_negative("debt", customer.debt)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderItem, PaymentStatus};

    fn line(qty: i64) -> OrderItem {
        OrderItem {
            product_id: "p1".into(),
            product_name: "Thước kẻ".into(),
            quantity: qty,
            price: Money::from_dong(3_000),
            is_custom_price: false,
        }
    }

    fn sale() -> Order {
        let mut o = Order::new("o1", 0, OrderType::Sale);
        o.items.push(line(2));
        o
    }

    #[test]
    fn test_valid_sale() {
        assert!(validate_order(&sale()).is_ok());
    }

    #[test]
    fn test_sale_requires_items_and_positive_quantities() {
        let mut o = sale();
        o.items.clear();
        assert!(validate_order(&o).is_err());

        let mut o = sale();
        o.items.push(line(0));
        assert!(matches!(
            validate_order(&o),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_debt_sale_requires_customer() {
        let mut o = sale();
        o.payment_status = PaymentStatus::Partial;
        o.customer_code = Some("GUEST".into());
        assert!(validate_order(&o).is_err());

        o.customer_code = Some("0912".into());
        assert!(validate_order(&o).is_ok());
    }

    #[test]
    fn test_debt_collection_cannot_be_submitted() {
        let mut o = Order::new("PAY-1", 0, OrderType::DebtCollection);
        o.items.push(line(1));
        assert!(matches!(
            validate_order(&o),
            Err(ValidationError::OrderRejected { .. })
        ));
    }

    #[test]
    fn test_import_rules() {
        let mut o = Order::new("IMP-1", 0, OrderType::Import);
        o.items.push(line(5));
        o.tax_status = Some(TaxStatus::NoTax);
        o.seller_name = Some("Cô Hoa".into());
        o.seller_address = Some("Chợ Đồng Xuân".into());
        assert!(matches!(
            validate_order(&o),
            Err(ValidationError::Required { field }) if field == "seller id card"
        ));

        o.seller_id_card = Some("0123".into());
        assert!(validate_order(&o).is_ok());

        o.purchase_date = Some("03/05/2024".into());
        assert!(matches!(
            validate_order(&o),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_untagged_import_needs_no_seller() {
        let mut o = Order::new("IMP-2", 0, OrderType::Import);
        o.items.push(line(5));
        assert_eq!(o.tax_status, None);
        assert!(validate_order(&o).is_ok());
    }

    #[test]
    fn test_payment_amount() {
        assert!(validate_payment_amount(Money::from_dong(1)).is_ok());
        assert!(validate_payment_amount(Money::zero()).is_err());
        assert!(validate_payment_amount(Money::from_dong(-5)).is_err());
    }

    #[test]
    fn test_product_and_customer_forms() {
        let mut p: Product = serde_json::from_str(r#"{"id":"p","name":" ","price":1}"#).unwrap();
        assert!(validate_product(&p).is_err());
        p.name = "Gôm".into();
        assert!(validate_product(&p).is_ok());

        let c = Customer::walk_in("c".into(), "", Some("Anh Tuấn"));
        assert!(validate_customer(&c).is_err());
    }
}
