//! Integer-cents money.
//!
//! Prices, wages, expenses, rental rates and payments are all stored and
//! exchanged as whole cents (`*_cents` columns and JSON fields). `Money`
//! wraps those values wherever the back-office does arithmetic on them:
//! order balances, line totals, rental costs.
//!
//! ```rust
//! use store_core::Money;
//!
//! let total = Money::from_cents(1230);
//! let paid: Money = [410, 410, 410].into_iter().map(Money::from_cents).sum();
//! assert!(total.remaining_after(paid).is_zero());
//! ```
//!
//! Arithmetic saturates at the `i64` bounds instead of overflowing.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money::ZERO
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// `quantity` units at this unit price.
    #[inline]
    pub const fn multiply_quantity(self, quantity: i64) -> Self {
        Money(self.0.saturating_mul(quantity))
    }

    /// What is still owed after `paid`; zero once fully paid.
    #[inline]
    pub const fn remaining_after(self, paid: Money) -> Self {
        if paid.0 >= self.0 {
            Money::ZERO
        } else {
            Money(self.0.saturating_sub(paid.0))
        }
    }
}

/// `$12.30`, `-$0.05`. Used in refusal messages.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        *self = *self - rhs;
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, quantity: i64) -> Money {
        self.multiply_quantity(quantity)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "$10.99");
        assert_eq!(Money::from_cents(500).to_string(), "$5.00");
        assert_eq!(Money::from_cents(-5).to_string(), "-$0.05");
        assert_eq!(Money::zero().to_string(), "$0.00");
        assert_eq!(Money::from_cents(i64::MIN).to_string(), "-$92233720368547758.08");
    }

    #[test]
    fn test_line_totals_sum() {
        let lines = [(275, 4), (2450, 1), (99, 10)];
        let total: Money = lines
            .iter()
            .map(|&(price, qty)| Money::from_cents(price) * qty)
            .sum();
        assert_eq!(total.cents(), 1100 + 2450 + 990);
    }

    #[test]
    fn test_deposits_settle_exactly() {
        let mut owed = Money::from_cents(1230);
        for _ in 0..3 {
            owed -= Money::from_cents(410);
        }
        assert!(owed.is_zero());
        assert!(!owed.is_positive());
    }

    #[test]
    fn test_remaining_after() {
        let total = Money::from_cents(5000);
        assert_eq!(total.remaining_after(Money::from_cents(1200)).cents(), 3800);
        assert!(total.remaining_after(total).is_zero());
        assert!(total.remaining_after(Money::from_cents(7000)).is_zero());
    }

    #[test]
    fn test_saturates() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!((max + Money::from_cents(1)).cents(), i64::MAX);
        assert_eq!(max.multiply_quantity(3).cents(), i64::MAX);
    }

    #[test]
    fn test_serializes_as_plain_cents() {
        assert_eq!(serde_json::to_string(&Money::from_cents(450)).unwrap(), "450");
    }
}
