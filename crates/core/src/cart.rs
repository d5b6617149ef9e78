//! Shopping cart and checkout pricing.
//!
//! Prices are never taken from the client. A cart only names products and
//! quantities; [`quote`] looks every line up in the current catalog and
//! computes the amounts the order will be placed with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::settings::ShippingSettings;
use crate::models::{Coupon, CouponError, OrderItem, Product};
use crate::types::{Price, ProductId};

/// One product and how many of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// The customer's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Lines in the order they were first added.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Add `quantity` units, merging with an existing line for the product.
    pub fn add(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.lines.push(CartLine {
                product_id,
                quantity,
            }),
        }
    }

    /// Set the quantity of a product; zero removes the line.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove(product_id);
            return;
        }
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = quantity,
            None => self.lines.push(CartLine {
                product_id,
                quantity,
            }),
        }
    }

    pub fn remove(&mut self, product_id: ProductId) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |sum, l| sum.saturating_add(l.quantity))
    }
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            cart.add(line.product_id, line.quantity);
        }
        cart
    }
}

/// Why a cart cannot be priced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("quantity for product {0} must be at least 1")]
    ZeroQuantity(ProductId),
    #[error("product {0} does not exist")]
    UnknownProduct(ProductId),
    #[error("{name} is no longer available")]
    Inactive { id: ProductId, name: String },
    #[error("only {available} of {name} left in stock")]
    InsufficientStock {
        id: ProductId,
        name: String,
        available: u32,
    },
    #[error(transparent)]
    Coupon(#[from] CouponError),
}

/// A priced cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutQuote {
    pub items: Vec<OrderItem>,
    pub subtotal: Price,
    pub discount: Price,
    pub shipping_cost: Price,
    pub total: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

/// Price `lines` against the current catalog.
///
/// Lines naming the same product are combined before stock is checked.
///
/// # Errors
///
/// Returns a [`QuoteError`] for an empty cart, a zero quantity, a product that
/// is missing, inactive or short on stock, or a coupon that does not apply.
pub fn quote(
    lines: &[CartLine],
    products: &[Product],
    shipping: &ShippingSettings,
    coupon: Option<&Coupon>,
    now: DateTime<Utc>,
) -> Result<CheckoutQuote, QuoteError> {
    if lines.is_empty() {
        return Err(QuoteError::EmptyCart);
    }
    if let Some(line) = lines.iter().find(|l| l.quantity == 0) {
        return Err(QuoteError::ZeroQuantity(line.product_id));
    }
    let merged = Cart::from(lines.to_vec());

    let mut items = Vec::with_capacity(merged.lines().len());
    for line in merged.lines() {
        let product = products
            .iter()
            .find(|p| p.id == line.product_id)
            .ok_or(QuoteError::UnknownProduct(line.product_id))?;
        if !product.active {
            return Err(QuoteError::Inactive {
                id: product.id,
                name: product.name.clone(),
            });
        }
        if product.stock < line.quantity {
            return Err(QuoteError::InsufficientStock {
                id: product.id,
                name: product.name.clone(),
                available: product.stock,
            });
        }
        let unit_price = product.effective_price();
        items.push(OrderItem {
            product_id: product.id,
            name: product.name.clone(),
            unit_price,
            quantity: line.quantity,
            image: product.cover_image().map(str::to_owned),
            line_total: unit_price.times(line.quantity),
        });
    }

    let subtotal: Price = items.iter().map(|i| i.line_total).sum();
    let discount = match coupon {
        Some(c) => c.discount_for(subtotal, now)?,
        None => Price::ZERO,
    };
    let discounted = subtotal.saturating_sub(discount);
    let shipping_cost = shipping.cost_for(discounted);

    Ok(CheckoutQuote {
        items,
        subtotal,
        discount,
        shipping_cost,
        total: discounted + shipping_cost,
        coupon_code: coupon.map(|c| c.code.clone()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn products() -> Vec<Product> {
        serde_json::from_value(json!([
            { "id": 1, "name": "Pot", "price": 300_000, "discountPrice": 250_000,
              "stock": 4, "images": ["/uploads/pot.webp"] },
            { "id": 2, "name": "Ladle", "price": 50_000, "stock": 1 },
            { "id": 3, "name": "Old Mixer", "price": 10, "stock": 9, "active": false }
        ]))
        .unwrap()
    }

    fn shipping() -> ShippingSettings {
        ShippingSettings {
            flat_rate: Price::new(40_000),
            free_shipping_threshold: Some(Price::new(500_000)),
        }
    }

    fn line(id: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            quantity,
        }
    }

    #[test]
    fn test_cart_add_merges_and_set_zero_removes() {
        let mut cart = Cart::new();
        cart.add(ProductId::new(1), 2);
        cart.add(ProductId::new(2), 1);
        cart.add(ProductId::new(1), 3);
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.item_count(), 6);

        cart.set_quantity(ProductId::new(1), 0);
        assert_eq!(cart.lines(), [line(2, 1)]);

        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_serializes_as_array() {
        let mut cart = Cart::new();
        cart.add(ProductId::new(5), 1);
        assert_eq!(
            serde_json::to_value(&cart).unwrap(),
            json!([{ "productId": 5, "quantity": 1 }])
        );
    }

    #[test]
    fn test_quote_uses_effective_price_and_flat_shipping() {
        let q = quote(&[line(1, 1), line(2, 1)], &products(), &shipping(), None, Utc::now()).unwrap();
        assert_eq!(q.items[0].unit_price, Price::new(250_000));
        assert_eq!(q.items[0].image.as_deref(), Some("/uploads/pot.webp"));
        assert_eq!(q.subtotal, Price::new(300_000));
        assert_eq!(q.shipping_cost, Price::new(40_000));
        assert_eq!(q.total, Price::new(340_000));
    }

    #[test]
    fn test_quote_free_shipping_after_discount() {
        let coupon: Coupon = serde_json::from_value(json!({
            "id": 1, "code": "TEN", "kind": "percent", "value": 10
        }))
        .unwrap();
        // 2 x 250_000 = 500_000, minus 10% = 450_000: below the threshold.
        let q = quote(&[line(1, 2)], &products(), &shipping(), Some(&coupon), Utc::now()).unwrap();
        assert_eq!(q.discount, Price::new(50_000));
        assert_eq!(q.shipping_cost, Price::new(40_000));
        assert_eq!(q.total, Price::new(490_000));
        assert_eq!(q.coupon_code.as_deref(), Some("TEN"));

        let q = quote(&[line(1, 2)], &products(), &shipping(), None, Utc::now()).unwrap();
        assert_eq!(q.shipping_cost, Price::ZERO);
    }

    #[test]
    fn test_quote_errors() {
        let now = Utc::now();
        let p = products();
        let s = shipping();
        assert_eq!(quote(&[], &p, &s, None, now), Err(QuoteError::EmptyCart));
        assert_eq!(
            quote(&[line(1, 0)], &p, &s, None, now),
            Err(QuoteError::ZeroQuantity(ProductId::new(1)))
        );
        assert_eq!(
            quote(&[line(42, 1)], &p, &s, None, now),
            Err(QuoteError::UnknownProduct(ProductId::new(42)))
        );
        assert!(matches!(
            quote(&[line(3, 1)], &p, &s, None, now),
            Err(QuoteError::Inactive { .. })
        ));
    }

    #[test]
    fn test_quote_combines_lines_before_stock_check() {
        let err = quote(&[line(2, 1), line(2, 1)], &products(), &shipping(), None, Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            QuoteError::InsufficientStock {
                id: ProductId::new(2),
                name: "Ladle".to_owned(),
                available: 1,
            }
        );
    }
}
