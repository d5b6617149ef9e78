//! Dashboard statistics.

use serde::Serialize;

use ashpazkhoone_core::models::Order;
use ashpazkhoone_core::{OrderStatus, Price, ProductId, ReviewStatus};

use crate::db::Database;

/// Products at or below this stock level are reported as low.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

/// How many recent orders the dashboard lists.
const RECENT_ORDERS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockProduct {
    pub id: ProductId,
    pub name: String,
    pub stock: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentOrder {
    pub id: ashpazkhoone_core::OrderId,
    pub order_number: String,
    pub customer_name: String,
    pub total: Price,
    pub status: OrderStatus,
}

impl From<&Order> for RecentOrder {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number.clone(),
            customer_name: order.customer.name.clone(),
            total: order.total,
            status: order.status,
        }
    }
}

/// Figures for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub products: usize,
    pub active_products: usize,
    pub categories: usize,
    pub orders: usize,
    pub pending_orders: usize,
    pub customers: usize,
    pub pending_reviews: usize,
    pub blog_posts: usize,
    /// Sum of paid or delivered orders that were not cancelled.
    pub revenue: Price,
    pub low_stock: Vec<LowStockProduct>,
    pub recent_orders: Vec<RecentOrder>,
}

impl DashboardStats {
    #[must_use]
    pub fn compute(db: &Database) -> Self {
        let mut low_stock: Vec<LowStockProduct> = db
            .products
            .iter()
            .filter(|p| p.active && p.stock <= LOW_STOCK_THRESHOLD)
            .map(|p| LowStockProduct {
                id: p.id,
                name: p.name.clone(),
                stock: p.stock,
            })
            .collect();
        low_stock.sort_by(|a, b| a.stock.cmp(&b.stock).then(a.id.cmp(&b.id)));

        let mut recent: Vec<&Order> = db.orders.iter().collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Self {
            products: db.products.len(),
            active_products: db.products.iter().filter(|p| p.active).count(),
            categories: db.categories.len(),
            orders: db.orders.len(),
            pending_orders: db
                .orders
                .iter()
                .filter(|o| o.status == OrderStatus::Pending)
                .count(),
            customers: db.users.iter().filter(|u| !u.is_admin()).count(),
            pending_reviews: db
                .reviews
                .iter()
                .filter(|r| r.status == ReviewStatus::Pending)
                .count(),
            blog_posts: db.blog_posts.len(),
            revenue: db
                .orders
                .iter()
                .filter(|o| o.is_revenue())
                .map(|o| o.total)
                .sum(),
            low_stock,
            recent_orders: recent.into_iter().take(RECENT_ORDERS).map(RecentOrder::from).collect(),
        }
    }
}
