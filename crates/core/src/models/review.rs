//! Product reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Collection, Entity, ValidationError};
use crate::types::{ProductId, ReviewId, ReviewStatus, UserId};

/// Longest accepted review comment, in characters.
pub const MAX_COMMENT_CHARS: usize = 2_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub name: String,
    /// 1 to 5 stars.
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Whether storefront visitors may see the review.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.status == ReviewStatus::Approved
    }
}

impl Entity for Review {
    type Id = ReviewId;
    const COLLECTION: Collection = Collection::Reviews;

    fn id(&self) -> ReviewId {
        self.id
    }

    fn set_id(&mut self, id: ReviewId) {
        self.id = id;
    }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_owned();
        self.comment = self.comment.trim().to_owned();
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=5).contains(&self.rating) {
            return Err(ValidationError::new("rating must be between 1 and 5"));
        }
        if self.name.is_empty() {
            return Err(ValidationError::new("reviewer name is required"));
        }
        if self.comment.chars().count() > MAX_COMMENT_CHARS {
            return Err(ValidationError::new(format!(
                "comment must be at most {MAX_COMMENT_CHARS} characters"
            )));
        }
        Ok(())
    }
}

/// Average rating over approved reviews.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    /// Mean stars rounded to one decimal, `0.0` when there are no reviews.
    pub average: f64,
    pub count: usize,
}

impl RatingSummary {
    /// Summarize the approved reviews in `reviews`.
    #[must_use]
    pub fn of<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Self {
        let (sum, count) = reviews
            .into_iter()
            .filter(|r| r.is_public())
            .fold((0_u32, 0_usize), |(sum, count), r| {
                (sum + u32::from(r.rating), count + 1)
            });
        if count == 0 {
            return Self {
                average: 0.0,
                count: 0,
            };
        }
        #[allow(clippy::cast_precision_loss)] // review counts are small
        let mean = f64::from(sum) / count as f64;
        Self {
            average: (mean * 10.0).round() / 10.0,
            count,
        }
    }
}
