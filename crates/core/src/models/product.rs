//! Catalog products.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Collection, Entity, ValidationError};
use crate::types::{CategoryId, Price, ProductId, slugify};

const fn default_true() -> bool {
    true
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// List price.
    pub price: Price,
    /// Sale price; only honored while it is below `price`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    /// Image URLs, first one is the cover.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub featured: bool,
    /// Hidden from the storefront when false.
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-form specifications (material, size, ...).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The price a customer pays for one unit.
    #[must_use]
    pub fn effective_price(&self) -> Price {
        match self.discount_price {
            Some(discount) if discount < self.price => discount,
            _ => self.price,
        }
    }

    /// Whether at least one unit can be sold.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// First image, used as the thumbnail on orders.
    #[must_use]
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Case-insensitive search over name, description and tags.
    #[must_use]
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&needle))
    }
}

impl Entity for Product {
    type Id = ProductId;
    const COLLECTION: Collection = Collection::Products;

    fn id(&self) -> ProductId {
        self.id
    }

    fn set_id(&mut self, id: ProductId) {
        self.id = id;
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.slug.clone())
    }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_owned();
        self.slug = if self.slug.trim().is_empty() {
            slugify(&self.name)
        } else {
            slugify(&self.slug)
        };
        self.tags.retain(|tag| !tag.trim().is_empty());
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::new("product name is required"));
        }
        if self.slug.is_empty() {
            return Err(ValidationError::new("product slug is empty"));
        }
        if self.price.is_negative() {
            return Err(ValidationError::new("price cannot be negative"));
        }
        if let Some(discount) = self.discount_price
            && (discount.is_negative() || discount > self.price)
        {
            return Err(ValidationError::new(
                "discount price must be between zero and the price",
            ));
        }
        Ok(())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn pan() -> Product {
        serde_json::from_value(json!({
            "id": 1,
            "name": "تابه چدنی",
            "price": 500_000,
            "tags": ["Cast Iron"],
        }))
        .unwrap()
    }

    #[test]
    fn test_minimal_json_defaults() {
        let p = pan();
        assert!(p.active);
        assert_eq!(p.stock, 0);
        assert!(p.images.is_empty());
        assert!(!p.in_stock());
    }

    #[test]
    fn test_effective_price_ignores_higher_discount() {
        let mut p = pan();
        p.discount_price = Some(Price::new(450_000));
        assert_eq!(p.effective_price(), Price::new(450_000));

        p.discount_price = Some(Price::new(600_000));
        assert_eq!(p.effective_price(), Price::new(500_000));
    }

    #[test]
    fn test_matches_text_in_tags_and_persian_name() {
        let p = pan();
        assert!(p.matches_text("cast iron"));
        assert!(p.matches_text("چدنی"));
        assert!(!p.matches_text("steel"));
        assert!(p.matches_text("  "));
    }

    #[test]
    fn test_validate_discount_above_price() {
        let mut p = pan();
        p.normalize();
        p.discount_price = Some(Price::new(700_000));
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_normalize_slugifies_custom_slug() {
        let mut p = pan();
        p.slug = "Iron Pan 28".to_owned();
        p.normalize();
        assert_eq!(p.slug, "iron-pan-28");
    }
}
