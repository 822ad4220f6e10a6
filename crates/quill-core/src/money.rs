//! # Money Module
//!
//! Provides the `Money` type for amounts in Vietnamese đồng.
//!
//! ## Whole Đồng
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The đồng has no minor unit in circulation. Every price, cost, debt   │
//! │  and total in the shop is a whole number of đồng, so Money wraps an   │
//! │  i64 and never touches floating point after decoding.                  │
//! │                                                                         │
//! │    price 5.000₫ × 3 = 15.000₫                                          │
//! │    weighted cost (10×1.000 + 10×2.000) / 20 = 1.500₫                   │
//! │                                                                         │
//! │  The only rounding in the system happens in costing::apply_import.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lenient Decoding
//! Documents come back from a spreadsheet that people also edit by hand.
//! `Money` therefore accepts integers, floats (rounded half up), numeric
//! strings and `null`. Anything non-numeric decodes as zero, matching how
//! the shop has always treated a blank debt cell.
//!
//! ## Usage
//! ```rust
//! use quill_core::money::Money;
//!
//! let price = Money::from_dong(5_000);
//! let line = price * 3;
//! assert_eq!(line.dong(), 15_000);
//! assert_eq!(line.to_string(), "15.000₫");
//! ```

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in whole đồng.
///
/// Signed so that change-due on an under-payment, or a refund, can be
/// represented and caught by validation instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole đồng.
    #[inline]
    pub const fn from_dong(dong: i64) -> Self {
        Money(dong)
    }

    /// Returns the amount in đồng.
    #[inline]
    pub const fn dong(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit amount by a quantity.
    ///
    /// ```rust
    /// use quill_core::money::Money;
    ///
    /// let line_total = Money::from_dong(5_000).multiply_quantity(3);
    /// assert_eq!(line_total.dong(), 15_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Clamps negative amounts to zero (debt balances never go below zero).
    #[inline]
    pub const fn floor_zero(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Formats with `.` thousands separators and no currency sign: `25.000`.
    pub fn grouped(&self) -> String {
        let digits = self.0.unsigned_abs().to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
        if self.0 < 0 {
            out.push('-');
        }
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push('.');
            }
            out.push(ch);
        }
        out
    }

    /// Rounds a decoded floating amount half up, like the shop UI does.
    fn from_float(value: f64) -> Self {
        if value.is_finite() {
            Money((value + 0.5).floor() as i64)
        } else {
            Money(0)
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// `25.000₫`
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}₫", self.grouped())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Lenient Deserialization
// =============================================================================

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an amount of money as a number or numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Ok(Money(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        i64::try_from(v)
            .map(Money)
            .map_err(|_| E::custom(format!("amount {} is out of range", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Ok(Money::from_float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        let trimmed = v.trim();
        if let Ok(whole) = trimmed.parse::<i64>() {
            return Ok(Money(whole));
        }
        Ok(trimmed
            .parse::<f64>()
            .map(Money::from_float)
            .unwrap_or_default())
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Money, E> {
        Ok(Money::zero())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::zero())
    }

    fn visit_none<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::zero())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Money, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
