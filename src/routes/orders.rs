use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        order_items::AddOrderItemRequest,
        orders::{
            CommissionReport, CreateOrderRequest, OrderList, OrderStatusRequest, OrderWithItems,
            SplitGroupList, UpdateOrderRequest,
        },
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_buyer, ensure_farmer, ensure_sole_farmer},
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, Pagination},
    services::{commission_service, order_item_service, order_service, split_service},
    state::AppState,
    status::ActorRole,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/farmer", get(list_farmer_orders))
        .route("/commission", get(outstanding_commission))
        .route(
            "/{id}",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/{id}/receiver-status", patch(set_receiver_status))
        .route("/{id}/farmer-status", patch(set_farmer_status))
        .route("/{id}/items", post(add_order_item))
        .route("/{id}/split", get(list_split_groups))
        .route(
            "/{id}/split/{farm_id}",
            post(submit_split).delete(delete_split),
        )
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Draft order created", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Offer not found"),
        (status = 409, description = "Buyer already has a draft order"),
        (status = 422, description = "Stock, self-purchase or duplicate offer"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let data = order_service::create_order(&state, user.user_id, payload).await?;
    Ok(Json(ApiResponse::success(
        "Order created",
        data,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Orders of the current buyer", body = ApiResponse<OrderList>),
        (status = 400, description = "Unknown status"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let (items, meta) = order_service::list_orders(&state, user.user_id, query).await?;
    Ok(Json(ApiResponse::success(
        "OK",
        OrderList { items },
        Some(meta),
    )))
}

#[utoipa::path(
    get,
    path = "/api/orders/farmer",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "Orders holding items of the caller's farms", body = ApiResponse<OrderList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_farmer_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let (items, meta) = order_service::list_farmer_orders(&state, user.user_id, pagination).await?;
    Ok(Json(ApiResponse::success(
        "OK",
        OrderList { items },
        Some(meta),
    )))
}

#[utoipa::path(
    get,
    path = "/api/orders/commission",
    responses(
        (status = 200, description = "Unsettled commission of the caller's farms", body = ApiResponse<CommissionReport>),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn outstanding_commission(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CommissionReport>>> {
    let data = commission_service::compute_outstanding(&state, user.user_id).await?;
    Ok(Json(ApiResponse::success("OK", data, Some(Meta::empty()))))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with its items", body = ApiResponse<OrderWithItems>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let data = order_service::get_order(&state, id).await?;
    // Farmers see orders that carry their items.
    if ensure_buyer(&data.order, &user).is_err() {
        ensure_farmer(&state, id, &user).await?;
    }
    Ok(Json(ApiResponse::success("OK", data, Some(Meta::empty()))))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<Order>),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = order_service::find_order(&state.orm, id).await?;
    ensure_buyer(&order, &user)?;
    let data = order_service::update_order(&state, id, payload).await?;
    Ok(Json(ApiResponse::success(
        "Order updated",
        data,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Uuid>>> {
    let order = order_service::find_order(&state.orm, id).await?;
    ensure_buyer(&order, &user)?;
    order_service::delete_order(&state, id).await?;
    Ok(Json(ApiResponse::success(
        "Order deleted",
        id,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/receiver-status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = OrderStatusRequest,
    responses(
        (status = 200, description = "Status changed by the buyer", body = ApiResponse<Order>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Transition not allowed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn set_receiver_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = order_service::find_order(&state.orm, id).await?;
    ensure_buyer(&order, &user)?;
    let data = order_service::set_status(&state, id, payload.status, ActorRole::Receiver).await?;
    Ok(Json(ApiResponse::success(
        "Order status updated",
        data,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/farmer-status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = OrderStatusRequest,
    responses(
        (status = 200, description = "Status changed by a farmer", body = ApiResponse<Order>),
        (status = 403, description = "Caller does not own every farm in the order"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Transition not allowed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn set_farmer_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    ensure_sole_farmer(&state, id, &user).await?;
    let data = order_service::set_status(&state, id, payload.status, ActorRole::Farmer).await?;
    Ok(Json(ApiResponse::success(
        "Order status updated",
        data,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/items",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = AddOrderItemRequest,
    responses(
        (status = 200, description = "Item added to the draft order", body = ApiResponse<OrderItem>),
        (status = 400, description = "Order is not a draft"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Stock, self-purchase or duplicate offer"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn add_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddOrderItemRequest>,
) -> AppResult<Json<ApiResponse<OrderItem>>> {
    let order = order_service::find_order(&state.orm, id).await?;
    ensure_buyer(&order, &user)?;
    let data = order_item_service::add_item(&state, id, payload).await?;
    Ok(Json(ApiResponse::success(
        "Item added",
        data,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/split",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Per-farm groups of the order", body = ApiResponse<SplitGroupList>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 422, description = "A group no longer passes stock or ownership checks"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_split_groups(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SplitGroupList>>> {
    let order = order_service::find_order(&state.orm, id).await?;
    ensure_buyer(&order, &user)?;
    let groups = split_service::group_by_farm(&state, id)
        .await?
        .into_values()
        .collect();
    Ok(Json(ApiResponse::success(
        "OK",
        SplitGroupList { groups },
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/split/{farm_id}",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("farm_id" = Uuid, Path, description = "Farm whose group is submitted")
    ),
    responses(
        (status = 200, description = "Sub-order created", body = ApiResponse<OrderWithItems>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Farm has no items in the order"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn submit_split(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, farm_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let order = order_service::find_order(&state.orm, id).await?;
    ensure_buyer(&order, &user)?;
    let data = split_service::submit_split(&state, id, farm_id).await?;
    Ok(Json(ApiResponse::success(
        "Split submitted",
        data,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}/split/{farm_id}",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("farm_id" = Uuid, Path, description = "Farm whose items are dropped")
    ),
    responses(
        (status = 200, description = "Farm's items removed from the order", body = ApiResponse<Order>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Farm has no items in the order"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn delete_split(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, farm_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = order_service::find_order(&state.orm, id).await?;
    ensure_buyer(&order, &user)?;
    split_service::delete_split(&state, id, farm_id).await?;
    let order = order_service::find_order(&state.orm, id).await?;
    Ok(Json(ApiResponse::success(
        "Split deleted",
        order,
        Some(Meta::empty()),
    )))
}
