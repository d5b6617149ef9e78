//! Discount coupons.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Collection, Entity, ValidationError};
use crate::types::{CouponId, DiscountKind, Price};

/// Why a coupon cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CouponError {
    #[error("coupon not found")]
    NotFound,
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon has expired")]
    Expired,
    #[error("coupon usage limit reached")]
    UsageLimitReached,
    #[error("order subtotal must be at least {min}")]
    BelowMinimum { min: Price },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: CouponId,
    /// Stored uppercase; matching is case-insensitive.
    pub code: String,
    #[serde(default)]
    pub kind: DiscountKind,
    /// Percentage for [`DiscountKind::Percent`], Toman for [`DiscountKind::Fixed`].
    pub value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_order: Option<Price>,
    /// Cap on percentage discounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_discount: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub used_count: u32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

const fn default_active() -> bool {
    true
}

/// Canonical form of a coupon code.
#[must_use]
pub fn canonical_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl Coupon {
    /// Whether `code` names this coupon.
    #[must_use]
    pub fn matches(&self, code: &str) -> bool {
        self.code == canonical_code(code)
    }

    /// The discount this coupon gives on `subtotal` at time `now`.
    ///
    /// The result is never negative and never exceeds the subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`CouponError`] when the coupon is inactive, expired, used
    /// up, or the subtotal is below the minimum order.
    pub fn discount_for(&self, subtotal: Price, now: DateTime<Utc>) -> Result<Price, CouponError> {
        if !self.active {
            return Err(CouponError::Inactive);
        }
        if self.expires_at.is_some_and(|at| at <= now) {
            return Err(CouponError::Expired);
        }
        if self.usage_limit.is_some_and(|limit| self.used_count >= limit) {
            return Err(CouponError::UsageLimitReached);
        }
        if let Some(min) = self.min_order
            && subtotal < min
        {
            return Err(CouponError::BelowMinimum { min });
        }

        let discount = match self.kind {
            DiscountKind::Percent => {
                let raw = subtotal.percent(Decimal::from(self.value));
                self.max_discount.map_or(raw, |cap| raw.min(cap))
            }
            DiscountKind::Fixed => Price::new(self.value),
        };
        Ok(discount.min(subtotal).max(Price::ZERO))
    }
}

impl Entity for Coupon {
    type Id = CouponId;
    const COLLECTION: Collection = Collection::Coupons;

    fn id(&self) -> CouponId {
        self.id
    }

    fn set_id(&mut self, id: CouponId) {
        self.id = id;
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.code.clone())
    }

    fn normalize(&mut self) {
        self.code = canonical_code(&self.code);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.code.is_empty() {
            return Err(ValidationError::new("coupon code is required"));
        }
        if self.code.chars().any(char::is_whitespace) {
            return Err(ValidationError::new("coupon code cannot contain spaces"));
        }
        if self.min_order.is_some_and(|p| p.is_negative()) {
            return Err(ValidationError::new("minimum order cannot be negative"));
        }
        if self.max_discount.is_some_and(|p| p.is_negative()) {
            return Err(ValidationError::new("maximum discount cannot be negative"));
        }
        match self.kind {
            DiscountKind::Percent if !(1..=100).contains(&self.value) => Err(
                ValidationError::new("percentage must be between 1 and 100"),
            ),
            DiscountKind::Fixed if self.value <= 0 => {
                Err(ValidationError::new("fixed discount must be positive"))
            }
            _ => Ok(()),
        }
    }
}
