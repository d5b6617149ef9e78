//! Prices in Toman.
//!
//! The store sells in a single currency with no minor unit, so a price is a
//! whole number of Toman. Percentage math goes through [`Decimal`] and rounds
//! half away from zero.

use std::iter::Sum;
use std::ops::{Add, Sub};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An amount of money in Toman.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    /// Zero Toman.
    pub const ZERO: Self = Self(0);

    /// Create a price from a Toman amount.
    #[must_use]
    pub const fn new(toman: i64) -> Self {
        Self(toman)
    }

    /// The amount in Toman.
    #[must_use]
    pub const fn toman(&self) -> i64 {
        self.0
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiply by a quantity.
    #[must_use]
    pub const fn times(&self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as i64))
    }

    /// `percent`% of this price, rounded half away from zero.
    #[must_use]
    pub fn percent(&self, percent: Decimal) -> Self {
        let value = (Decimal::from(self.0) * percent / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        Self(value.to_i64().unwrap_or(i64::MAX))
    }

    /// Subtract, never going below zero.
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        let value = self.0.saturating_sub(other.0);
        if value < 0 { Self(0) } else { Self(value) }
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
