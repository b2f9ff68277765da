use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    models::{NewOrderItem, Order, OrderCommission, OrderItem, SplitGroup},
    status::OrderStatus,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub items: Vec<NewOrderItem>,
    #[serde(default)]
    pub shipping_price: i64,
    pub address: Option<String>,
    #[serde(default)]
    pub comment: String,
    pub post_office: Option<String>,
    pub post_office_city: Option<String>,
}

/// Fields left out keep their current value.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub comment: Option<String>,
    pub address: Option<String>,
    pub shipping_price: Option<i64>,
    pub post_office: Option<String>,
    pub post_office_city: Option<String>,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SplitGroupList {
    pub groups: Vec<SplitGroup>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommissionReport {
    pub orders: Vec<OrderCommission>,
    pub total_commission: i64,
}
