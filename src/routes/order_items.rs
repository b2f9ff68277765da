use axum::{
    Json, Router,
    extract::{Path, State},
    routing::put,
};
use uuid::Uuid;

use crate::{
    dto::order_items::UpdateOrderItemRequest,
    error::AppResult,
    middleware::auth::{AuthUser, ensure_buyer},
    models::OrderItem,
    response::{ApiResponse, Meta},
    services::{order_item_service, order_item_store, order_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", put(update_order_item).delete(delete_order_item))
}

/// Only the buyer of the item's order may change it.
async fn ensure_item_owner(state: &AppState, item_id: Uuid, user: &AuthUser) -> AppResult<()> {
    let item = order_item_store::find_by_id(&state.orm, item_id).await?;
    let order = order_service::find_order(&state.orm, item.order_id).await?;
    ensure_buyer(&order, user)
}

#[utoipa::path(
    put,
    path = "/api/order-items/{id}",
    params(("id" = Uuid, Path, description = "Order item ID")),
    request_body = UpdateOrderItemRequest,
    responses(
        (status = 200, description = "Quantity changed", body = ApiResponse<OrderItem>),
        (status = 400, description = "Invalid quantity or order is not a draft"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Insufficient stock"),
    ),
    security(("bearer_auth" = [])),
    tag = "Order items"
)]
pub async fn update_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderItemRequest>,
) -> AppResult<Json<ApiResponse<OrderItem>>> {
    ensure_item_owner(&state, id, &user).await?;
    let data = order_item_service::update_item(&state, id, payload).await?;
    Ok(Json(ApiResponse::success(
        "Item updated",
        data,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/order-items/{id}",
    params(("id" = Uuid, Path, description = "Order item ID")),
    responses(
        (status = 200, description = "Item deleted"),
        (status = 400, description = "Order is not a draft"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Order items"
)]
pub async fn delete_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    ensure_item_owner(&state, id, &user).await?;
    order_item_service::delete_item(&state, id).await?;
    Ok(Json(ApiResponse::success(
        "Item deleted",
        id,
        Some(Meta::empty()),
    )))
}
