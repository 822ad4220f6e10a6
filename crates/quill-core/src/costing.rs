//! # Costing Engine
//!
//! Moving weighted-average unit cost, recomputed whenever goods are received.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Import line: 10 × 2.000₫ into a product holding 10 @ 1.000₫           │
//! │                                                                         │
//! │   base  = max(0, stock)                 = 10                            │
//! │   cost' = round((10×1.000 + 10×2.000) / (10 + 10)) = 1.500₫            │
//! │   stock' = stock + 10                    = 20                           │
//! │                                                                         │
//! │  Negative stock (from over-selling) is floored to 0 in the cost basis  │
//! │  but the shortfall is still netted against the received quantity.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Result of receiving stock for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEffect {
    /// New weighted-average unit cost.
    pub cost: Money,
    /// New stock level.
    pub stock: i64,
}

/// Computes the new cost and stock after receiving `quantity` units at
/// `unit_cost`.
///
/// When the floored stock plus the received quantity is not positive there is
/// nothing to average over and the unit cost is taken as-is. Halves round up.
///
/// ```rust
/// use quill_core::costing::apply_import;
/// use quill_core::Money;
///
/// let effect = apply_import(-4, Money::from_dong(9_000), 6, Money::from_dong(2_000));
/// assert_eq!(effect.cost, Money::from_dong(2_000));
/// assert_eq!(effect.stock, 2);
/// ```
pub fn apply_import(
    current_stock: i64,
    current_cost: Money,
    quantity: i64,
    unit_cost: Money,
) -> ImportEffect {
    let base = current_stock.max(0) as i128;
    let denominator = base + quantity as i128;

    let cost = if denominator > 0 {
        let numerator =
            base * current_cost.dong() as i128 + quantity as i128 * unit_cost.dong() as i128;
        // floor(n/d + 1/2) with d > 0
        let rounded = (2 * numerator + denominator).div_euclid(2 * denominator);
        Money::from_dong(rounded as i64)
    } else {
        unit_cost
    };

    ImportEffect {
        cost,
        stock: current_stock + quantity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dong(v: i64) -> Money {
        Money::from_dong(v)
    }

    #[test]
    fn test_weighted_average() {
        let effect = apply_import(10, dong(1_000), 10, dong(2_000));
        assert_eq!(effect, ImportEffect { cost: dong(1_500), stock: 20 });
    }

    #[test]
    fn test_empty_shelf_takes_unit_cost() {
        assert_eq!(apply_import(0, dong(7_000), 5, dong(3_200)).cost, dong(3_200));
        assert_eq!(apply_import(-3, dong(7_000), 5, dong(3_200)).cost, dong(3_200));
    }

    #[test]
    fn test_negative_stock_is_netted() {
        let effect = apply_import(-3, dong(7_000), 5, dong(3_200));
        assert_eq!(effect.stock, 2);
    }

    #[test]
    fn test_rounds_half_up() {
        // (1×1000 + 1×1001) / 2 = 1000.5 → 1001
        assert_eq!(apply_import(1, dong(1_000), 1, dong(1_001)).cost, dong(1_001));
        // (2×1000 + 1×1001) / 3 = 1000.33 → 1000
        assert_eq!(apply_import(2, dong(1_000), 1, dong(1_001)).cost, dong(1_000));
        // (1×1000 + 2×1001) / 3 = 1000.67 → 1001
        assert_eq!(apply_import(1, dong(1_000), 2, dong(1_001)).cost, dong(1_001));
    }

    #[test]
    fn test_non_positive_denominator_guard() {
        let effect = apply_import(0, dong(5_000), 0, dong(4_000));
        assert_eq!(effect, ImportEffect { cost: dong(4_000), stock: 0 });
    }

    #[test]
    fn test_large_values_do_not_overflow() {
        let effect = apply_import(1_000_000_000, dong(2_000_000), 1_000_000_000, dong(2_000_000));
        assert_eq!(effect.cost, dong(2_000_000));
        assert_eq!(effect.stock, 2_000_000_000);
    }
}
