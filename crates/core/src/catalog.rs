//! Product listing: filtering, sorting and pagination.

use serde::{Deserialize, Serialize};

use crate::models::Product;
use crate::types::{CategoryId, Price};

/// Default page size.
pub const DEFAULT_PER_PAGE: usize = 20;
/// Largest page size a client may ask for.
pub const MAX_PER_PAGE: usize = 100;

/// Sort order of a product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    /// Most recently created first.
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

/// Filters for a product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub category: Option<CategoryId>,
    pub text: Option<String>,
    pub featured: Option<bool>,
    pub in_stock: Option<bool>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    /// Admin listings include deactivated products.
    pub include_inactive: bool,
    pub sort: ProductSort,
}

impl ProductQuery {
    /// Whether `product` passes every filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if !self.include_inactive && !product.active {
            return false;
        }
        if self
            .category
            .is_some_and(|c| product.category_id != Some(c))
        {
            return false;
        }
        if self
            .text
            .as_deref()
            .is_some_and(|text| !product.matches_text(text))
        {
            return false;
        }
        if self.featured.is_some_and(|f| product.featured != f) {
            return false;
        }
        if self.in_stock.is_some_and(|s| product.in_stock() != s) {
            return false;
        }
        let price = product.effective_price();
        if self.min_price.is_some_and(|min| price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| price > max) {
            return false;
        }
        true
    }

    /// Filter and sort `products`.
    #[must_use]
    pub fn apply<'a>(&self, products: impl IntoIterator<Item = &'a Product>) -> Vec<&'a Product> {
        let mut hits: Vec<&Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        match self.sort {
            ProductSort::Newest => hits.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.id.cmp(&a.id))
            }),
            ProductSort::PriceAsc => {
                hits.sort_by(|a, b| {
                    a.effective_price()
                        .cmp(&b.effective_price())
                        .then_with(|| a.id.cmp(&b.id))
                });
            }
            ProductSort::PriceDesc => {
                hits.sort_by(|a, b| {
                    b.effective_price()
                        .cmp(&a.effective_price())
                        .then_with(|| a.id.cmp(&b.id))
                });
            }
            ProductSort::Name => hits.sort_by(|a, b| a.name.cmp(&b.name)),
        }
        hits
    }
}

/// Page request, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

impl PageRequest {
    /// Clamp client input: page at least 1, page size in `1..=MAX_PER_PAGE`.
    #[must_use]
    pub fn new(page: Option<usize>, per_page: Option<usize>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    /// Cut one page out of `items`.
    #[must_use]
    pub fn paginate<T>(self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let start = (self.page - 1).saturating_mul(self.per_page);
        let items = items.into_iter().skip(start).take(self.per_page).collect();
        Page {
            items,
            total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

impl<T> Page<T> {
    /// Transform the items, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn catalog() -> Vec<Product> {
        serde_json::from_value(json!([
            { "id": 1, "name": "Wok", "price": 900, "stock": 2, "categoryId": 1,
              "createdAt": "2026-01-01T00:00:00Z" },
            { "id": 2, "name": "Knife", "price": 300, "discountPrice": 250, "stock": 0,
              "categoryId": 2, "featured": true, "createdAt": "2026-02-01T00:00:00Z" },
            { "id": 3, "name": "Board", "price": 200, "stock": 5, "categoryId": 2,
              "active": false, "createdAt": "2026-03-01T00:00:00Z" },
            { "id": 4, "name": "Apron", "price": 250, "stock": 9,
              "tags": ["textile"], "createdAt": "2026-02-01T00:00:00Z" }
        ]))
        .unwrap()
    }

    fn ids(hits: &[&Product]) -> Vec<i64> {
        hits.iter().map(|p| p.id.as_i64()).collect()
    }

    #[test]
    fn test_default_hides_inactive_and_sorts_newest() {
        let products = catalog();
        let hits = ProductQuery::default().apply(&products);
        assert_eq!(ids(&hits), [4, 2, 1]);
    }

    #[test]
    fn test_include_inactive() {
        let products = catalog();
        let query = ProductQuery {
            include_inactive: true,
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&products)), [3, 4, 2, 1]);
    }

    #[test]
    fn test_price_filters_use_effective_price() {
        let products = catalog();
        let query = ProductQuery {
            max_price: Some(Price::new(250)),
            sort: ProductSort::PriceAsc,
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&products)), [2, 4]);
    }

    #[test]
    fn test_category_stock_and_text() {
        let products = catalog();
        let query = ProductQuery {
            category: Some(CategoryId::new(2)),
            in_stock: Some(false),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&products)), [2]);

        let query = ProductQuery {
            text: Some("TEXTILE".to_owned()),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&products)), [4]);
    }

    #[test]
    fn test_paginate_clamps() {
        let request = PageRequest::new(Some(0), Some(1_000));
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, MAX_PER_PAGE);

        let page = PageRequest::new(Some(2), Some(2)).paginate(vec![1, 2, 3, 4, 5]);
        assert_eq!(page.items, [3, 4]);
        assert_eq!(page.total, 5);

        let past_end = PageRequest::new(Some(9), Some(2)).paginate(vec![1, 2, 3]);
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 3);
    }
}
