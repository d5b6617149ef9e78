//! Customer orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Collection, Entity};
use crate::types::{
    Email, OrderId, OrderStatus, PaymentMethod, PaymentStatus, Phone, PostalCode, Price, ProductId,
    UserId,
};

/// Who placed the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub name: String,
    pub phone: Phone,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
}

/// A postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub full_name: String,
    pub phone: Phone,
    pub province: String,
    pub city: String,
    pub address: String,
    pub postal_code: PostalCode,
}

impl Address {
    /// Names the first empty required text field, if any.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("fullName", &self.full_name),
            ("province", &self.province),
            ("city", &self.city),
            ("address", &self.address),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

/// One product line, frozen at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Price,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub line_total: Price,
}

/// An entry in an order's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: OrderStatus,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// Human-facing number printed on invoices and used for tracking.
    pub order_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub customer: CustomerInfo,
    pub shipping_address: Address,
    pub items: Vec<OrderItem>,
    pub subtotal: Price,
    #[serde(default)]
    pub discount: Price,
    #[serde(default)]
    pub shipping_cost: Price,
    pub total: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub status_history: Vec<StatusChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

/// Rejected status change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("order cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl Order {
    /// Order number for the `id`-th order placed on `date`: `AK` + `yyMMdd` + id.
    #[must_use]
    pub fn number_for(id: OrderId, date: DateTime<Utc>) -> String {
        format!("AK{}{:04}", date.format("%y%m%d"), id.as_i64())
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |sum, item| sum.saturating_add(item.quantity))
    }

    /// Move to `next`, appending to the status history.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] if the lifecycle does not allow the move.
    pub fn transition(
        &mut self,
        next: OrderStatus,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.status_history.push(StatusChange {
            status: next,
            at: now,
            note,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Whether the order counts toward revenue.
    #[must_use]
    pub fn is_revenue(&self) -> bool {
        self.status != OrderStatus::Cancelled
            && (self.payment_status == PaymentStatus::Paid
                || self.status == OrderStatus::Delivered)
    }
}

impl Entity for Order {
    type Id = OrderId;
    const COLLECTION: Collection = Collection::Orders;

    fn id(&self) -> OrderId {
        self.id
    }

    fn set_id(&mut self, id: OrderId) {
        self.id = id;
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.order_number.clone())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    pub(crate) fn sample_order() -> Order {
        serde_json::from_value(json!({
            "id": 12,
            "orderNumber": "AK2601050012",
            "customer": { "name": "Maryam", "phone": "09121234567" },
            "shippingAddress": {
                "fullName": "Maryam Rahimi",
                "phone": "09121234567",
                "province": "Tehran",
                "city": "Tehran",
                "address": "Valiasr St. 10",
                "postalCode": "1234567890"
            },
            "items": [
                { "productId": 1, "name": "Pan", "unitPrice": 100, "quantity": 2, "lineTotal": 200 },
                { "productId": 2, "name": "Pot", "unitPrice": 50, "quantity": 1, "lineTotal": 50 }
            ],
            "subtotal": 250,
            "total": 250
        }))
        .unwrap()
    }

    #[test]
    fn test_number_for() {
        let date = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        assert_eq!(Order::number_for(OrderId::new(12), date), "AK2601050012");
    }

    #[test]
    fn test_defaults() {
        let order = sample_order();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_method, PaymentMethod::Online);
        assert_eq!(order.item_count(), 3);
    }

    #[test]
    fn test_item_count_saturates() {
        let mut order = sample_order();
        let line = order.items[0].clone();
        order.items = vec![
            OrderItem { quantity: u32::MAX, ..line.clone() },
            OrderItem { quantity: 5, ..line },
        ];
        assert_eq!(order.item_count(), u32::MAX);
    }

    #[test]
    fn test_transition_records_history() {
        let mut order = sample_order();
        let now = Utc::now();
        order
            .transition(OrderStatus::Processing, Some("packed".to_owned()), now)
            .unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.status_history.len(), 1);
        assert_eq!(order.updated_at, now);

        let err = order
            .transition(OrderStatus::Delivered, None, now)
            .unwrap_err();
        assert_eq!(err.from, OrderStatus::Processing);
        assert_eq!(order.status_history.len(), 1);
    }

    #[test]
    fn test_address_missing_field() {
        let mut order = sample_order();
        assert_eq!(order.shipping_address.missing_field(), None);
        order.shipping_address.city = " ".to_owned();
        assert_eq!(order.shipping_address.missing_field(), Some("city"));
    }

    #[test]
    fn test_revenue_rules() {
        let mut order = sample_order();
        assert!(!order.is_revenue());
        order.payment_status = PaymentStatus::Paid;
        assert!(order.is_revenue());
        order.status = OrderStatus::Cancelled;
        assert!(!order.is_revenue());
    }
}
