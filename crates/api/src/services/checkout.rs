//! Checkout and order lifecycle.
//!
//! These functions work on a loaded [`Database`] and are meant to run inside
//! a single [`crate::db::JsonFileDb::mutate`] call, so the stock check, the
//! stock decrement and the order insert land in the same write.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use ashpazkhoone_core::cart::{CartLine, CheckoutQuote, QuoteError, quote};
use ashpazkhoone_core::models::order::InvalidTransition;
use ashpazkhoone_core::models::{
    Address, Coupon, CouponError, CustomerInfo, Order, Product, StatusChange, next_id,
};
use ashpazkhoone_core::{OrderId, OrderStatus, PaymentMethod, PaymentStatus, Phone, UserId};

use crate::db::{Database, RepositoryError};

/// Errors from pricing or placing an order.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Quote(#[from] QuoteError),
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("payment method {0:?} is not available")]
    PaymentMethodUnavailable(PaymentMethod),
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<CouponError> for CheckoutError {
    fn from(err: CouponError) -> Self {
        Self::Quote(QuoteError::Coupon(err))
    }
}

/// Body of a checkout request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CartLine>,
    pub customer: CustomerInfo,
    pub shipping_address: Address,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Find an active coupon by code.
fn find_coupon<'a>(db: &'a Database, code: Option<&str>) -> Result<Option<&'a Coupon>, CouponError> {
    let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    db.coupons
        .iter()
        .find(|c| c.matches(code))
        .map(Some)
        .ok_or(CouponError::NotFound)
}

/// Price a cart against the current catalog and settings.
///
/// # Errors
///
/// Returns [`CheckoutError::Quote`] if the cart or coupon is rejected.
pub fn quote_cart(
    db: &Database,
    lines: &[CartLine],
    coupon_code: Option<&str>,
    now: DateTime<Utc>,
) -> Result<CheckoutQuote, CheckoutError> {
    let coupon = find_coupon(db, coupon_code)?;
    Ok(quote(lines, &db.products, &db.settings.shipping, coupon, now)?)
}

/// Validate, price and record an order.
///
/// Decrements stock for every line and counts one use of the coupon.
///
/// # Errors
///
/// Returns [`CheckoutError`] if a required field is empty, the payment
/// method is disabled, or the cart cannot be priced.
pub fn place_order(
    db: &mut Database,
    request: CheckoutRequest,
    user_id: Option<UserId>,
    now: DateTime<Utc>,
) -> Result<Order, CheckoutError> {
    if request.customer.name.trim().is_empty() {
        return Err(CheckoutError::MissingField("customer.name"));
    }
    if let Some(field) = request.shipping_address.missing_field() {
        return Err(CheckoutError::MissingField(field));
    }
    let payment = &db.settings.payment;
    let available = match request.payment_method {
        PaymentMethod::Online => true,
        PaymentMethod::CashOnDelivery => payment.cash_on_delivery,
        PaymentMethod::CardToCard => payment.card_to_card,
    };
    if !available {
        return Err(CheckoutError::PaymentMethodUnavailable(request.payment_method));
    }

    let priced = quote_cart(db, &request.items, request.coupon_code.as_deref(), now)?;

    for item in &priced.items {
        if let Some(product) = db.find_mut::<Product>(item.product_id) {
            product.stock = product.stock.saturating_sub(item.quantity);
            product.updated_at = now;
        }
    }
    if let Some(code) = &priced.coupon_code
        && let Some(coupon) = db.coupons.iter_mut().find(|c| &c.code == code)
    {
        coupon.used_count = coupon.used_count.saturating_add(1);
    }

    let id: OrderId = next_id(&db.orders);
    let order = Order {
        id,
        order_number: Order::number_for(id, now),
        user_id,
        customer: request.customer,
        shipping_address: request.shipping_address,
        items: priced.items,
        subtotal: priced.subtotal,
        discount: priced.discount,
        shipping_cost: priced.shipping_cost,
        total: priced.total,
        coupon_code: priced.coupon_code,
        payment_method: request.payment_method,
        payment_status: PaymentStatus::Pending,
        status: OrderStatus::Pending,
        status_history: vec![StatusChange {
            status: OrderStatus::Pending,
            at: now,
            note: None,
        }],
        notes: request.notes.filter(|n| !n.trim().is_empty()),
        created_at: now,
        updated_at: now,
    };
    let order = db.insert(order)?;
    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        total = %order.total,
        "order placed"
    );
    Ok(order)
}

/// Move an order to `next`. Cancelling returns its items to stock.
///
/// # Errors
///
/// Returns [`CheckoutError::Transition`] for a move the lifecycle forbids,
/// or [`CheckoutError::Repository`] if the order does not exist.
pub fn change_status(
    db: &mut Database,
    id: OrderId,
    next: OrderStatus,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<Order, CheckoutError> {
    let order = db.find_mut::<Order>(id).ok_or(RepositoryError::NotFound)?;
    order.transition(next, note.filter(|n| !n.trim().is_empty()), now)?;
    let order = order.clone();

    if next == OrderStatus::Cancelled {
        for item in &order.items {
            if let Some(product) = db.find_mut::<Product>(item.product_id) {
                product.stock = product.stock.saturating_add(item.quantity);
                product.updated_at = now;
            }
        }
        tracing::info!(order_id = %order.id, "order cancelled, stock restored");
    }
    Ok(order)
}

/// Set an order's payment status.
///
/// # Errors
///
/// Returns [`RepositoryError::NotFound`] if the order does not exist.
pub fn set_payment_status(
    db: &mut Database,
    id: OrderId,
    status: PaymentStatus,
    now: DateTime<Utc>,
) -> Result<Order, RepositoryError> {
    let order = db.find_mut::<Order>(id).ok_or(RepositoryError::NotFound)?;
    order.payment_status = status;
    order.updated_at = now;
    Ok(order.clone())
}

/// The order with `number` if `phone` matches its customer or recipient.
#[must_use]
pub fn track<'a>(db: &'a Database, number: &str, phone: &str) -> Option<&'a Order> {
    let phone = Phone::parse(phone).ok()?;
    let number = number.trim().to_uppercase();
    db.orders.iter().find(|o| {
        o.order_number == number
            && (o.customer.phone == phone || o.shipping_address.phone == phone)
    })
}
