use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::status::OrderStatus;

/// An order as returned by the order services. Prices are in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub comment: String,
    pub address: Option<String>,
    pub products_price: i64,
    pub shipping_price: i64,
    pub total_price: i64,
    pub status: OrderStatus,
    pub post_office: Option<String>,
    pub post_office_city: Option<String>,
    pub tracking_number: Option<String>,
    pub commission_settled: bool,
    pub items_count: u64,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

/// A line item. `title` and `price` are copied from the offer when the item
/// is added and do not follow later offer changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub offer_id: Uuid,
    pub farm_id: Uuid,
    pub title: String,
    pub price: i64,
    pub quantity: i32,
    pub total_price: i64,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

/// A requested line: which offer and how many units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewOrderItem {
    pub offer_id: Uuid,
    pub quantity: i32,
}

/// A validated line carrying the offer snapshot, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedItem {
    pub offer_id: Uuid,
    pub farm_id: Uuid,
    pub title: String,
    pub price: i64,
    pub quantity: i32,
    pub total_price: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PricedItems {
    pub items: Vec<PricedItem>,
    pub products_price: i64,
}

/// The order a split group would become once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderDraft {
    pub user_id: Uuid,
    pub comment: String,
    pub address: Option<String>,
    pub products_price: i64,
    pub shipping_price: i64,
    pub total_price: i64,
    pub status: OrderStatus,
    pub post_office: Option<String>,
    pub post_office_city: Option<String>,
    pub tracking_number: Option<String>,
}

/// One farm's share of an order.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SplitGroup {
    pub farm_id: Uuid,
    pub items: Vec<OrderItem>,
    /// Subtotal at current offer prices.
    pub products_price: i64,
    pub order: OrderDraft,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderCommission {
    pub order: Order,
    pub commission: i64,
}
