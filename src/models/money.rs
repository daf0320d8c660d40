use std::fmt;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Monetary amount in minor units (1/100 of the currency unit).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    /// `major_rate` per unit times a fractional quantity, rounded half away from zero.
    /// `None` when the quantity is not finite or the result leaves the `i64` range.
    pub fn per_unit(major_rate: i64, quantity: f64) -> Option<Self> {
        let rate = major_rate.checked_mul(100)?;
        let amount = (rate as f64 * quantity).round();
        if !amount.is_finite() || amount < i64::MIN as f64 || amount >= i64::MAX as f64 {
            return None;
        }
        Some(Money(amount as i64))
    }

    /// Scales by `numerator / denominator`, rounding half away from zero.
    pub fn scale(self, numerator: i64, denominator: i64) -> Option<Self> {
        let product = self.0.checked_mul(numerator)?;
        let half = denominator / 2;
        let biased = if product >= 0 {
            product.checked_add(half)?
        } else {
            product.checked_sub(half)?
        };
        biased.checked_div(denominator).map(Money)
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}
