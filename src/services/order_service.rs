use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderRequest, OrderWithItems, UpdateOrderRequest},
    entity::{
        order_items::Column as OrderItemCol,
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
            Relation as OrderRel,
        },
    },
    error::{AppError, AppResult},
    models::Order,
    response::Meta,
    routes::params::{OrderListQuery, Pagination, SortOrder},
    services::order_item_store,
    state::AppState,
    status::{ActorRole, OrderStatus},
};

/// Creates the buyer's DRAFT order together with its items.
///
/// The order row and the item rows are written in one transaction. A buyer
/// with a live DRAFT order gets [`AppError::DraftAlreadyExists`]; the partial
/// unique index on `orders` backs the check for concurrent callers.
pub async fn create_order(
    state: &AppState,
    buyer_id: Uuid,
    payload: CreateOrderRequest,
) -> AppResult<OrderWithItems> {
    if payload.items.is_empty() {
        return Err(AppError::Validation(
            "order must contain at least one item".into(),
        ));
    }
    ensure_shipping_price(payload.shipping_price)?;

    let priced =
        order_item_store::prepare_and_price(state.offers.as_ref(), &payload.items, buyer_id).await?;
    let total_price = order_total(priced.products_price, payload.shipping_price)?;

    let txn = state.orm.begin().await?;

    if has_draft(&txn, buyer_id).await? {
        return Err(AppError::DraftAlreadyExists);
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(buyer_id),
        comment: Set(payload.comment),
        address: Set(payload.address),
        products_price: Set(priced.products_price),
        shipping_price: Set(payload.shipping_price),
        total_price: Set(total_price),
        status: Set(OrderStatus::Draft),
        post_office: Set(payload.post_office),
        post_office_city: Set(payload.post_office_city),
        tracking_number: Set(None),
        commission_settled: Set(false),
        created_date: Set(now),
        updated_date: Set(now),
        deleted_date: Set(None),
    }
    .insert(&txn)
    .await
    .map_err(AppError::from_draft_insert)?;

    let items = order_item_store::persist(&txn, &priced.items, order.id).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %buyer_id,
        items = items.len(),
        total_price = order.total_price,
        "order created"
    );

    let items_count = items.len() as u64;
    Ok(OrderWithItems {
        order: order_from_entity(order, items_count),
        items,
    })
}

/// Rewrites `products_price` and `total_price` from the live items.
///
/// Calling it again without an item change leaves the row untouched.
pub async fn recalculate<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Order> {
    let order = find_order_model(conn, order_id, false).await?;
    let products_price = order_item_store::sum_total_for_order(conn, order_id).await?;
    let total_price = order_total(products_price, order.shipping_price)?;
    let items_count = order_item_store::count_for_order(conn, order_id).await?;

    if order.products_price == products_price && order.total_price == total_price {
        return Ok(order_from_entity(order, items_count));
    }

    let mut active: OrderActive = order.into();
    active.products_price = Set(products_price);
    active.total_price = Set(total_price);
    active.updated_date = Set(Utc::now().into());
    let order = active.update(conn).await?;

    tracing::debug!(order_id = %order.id, products_price, total_price, "order recalculated");

    Ok(order_from_entity(order, items_count))
}

/// Typed lookup of a live order.
pub async fn find_order<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Order> {
    let order = find_order_model(conn, order_id, false).await?;
    let items_count = order_item_store::count_for_order(conn, order_id).await?;
    Ok(order_from_entity(order, items_count))
}

pub async fn get_order(state: &AppState, order_id: Uuid) -> AppResult<OrderWithItems> {
    let order = find_order(&state.orm, order_id).await?;
    let items = order_item_store::find_all_for_order(&state.orm, order_id).await?;
    Ok(OrderWithItems { order, items })
}

/// Changes the buyer-editable fields. A new shipping price moves the total
/// by the difference; items are not touched.
pub async fn update_order(
    state: &AppState,
    order_id: Uuid,
    patch: UpdateOrderRequest,
) -> AppResult<Order> {
    if let Some(shipping_price) = patch.shipping_price {
        ensure_shipping_price(shipping_price)?;
    }

    let txn = state.orm.begin().await?;
    let order = find_order_model(&txn, order_id, true).await?;
    let products_price = order.products_price;
    let old_shipping = order.shipping_price;

    let mut active: OrderActive = order.into();
    if let Some(comment) = patch.comment {
        active.comment = Set(comment);
    }
    if let Some(address) = patch.address {
        active.address = Set(Some(address));
    }
    if let Some(post_office) = patch.post_office {
        active.post_office = Set(Some(post_office));
    }
    if let Some(city) = patch.post_office_city {
        active.post_office_city = Set(Some(city));
    }
    if let Some(tracking_number) = patch.tracking_number {
        active.tracking_number = Set(Some(tracking_number));
    }
    if let Some(shipping_price) = patch.shipping_price.filter(|price| *price != old_shipping) {
        active.shipping_price = Set(shipping_price);
        active.total_price = Set(order_total(products_price, shipping_price)?);
    }
    active.updated_date = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    let items_count = order_item_store::count_for_order(&txn, order_id).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, "order updated");
    Ok(order_from_entity(order, items_count))
}

/// Moves the order to `new_status` if the transition table allows it for
/// `role`. On rejection the order is left as it was.
pub async fn set_status(
    state: &AppState,
    order_id: Uuid,
    new_status: OrderStatus,
    role: ActorRole,
) -> AppResult<Order> {
    let txn = state.orm.begin().await?;
    let order = find_order_model(&txn, order_id, true).await?;
    let from = order.status;
    let to = from.transition(new_status, role)?;

    let mut active: OrderActive = order.into();
    active.status = Set(to);
    active.updated_date = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    let items_count = order_item_store::count_for_order(&txn, order_id).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, %from, %to, %role, "order status changed");
    Ok(order_from_entity(order, items_count))
}

/// Soft-deletes the order and its items. If the items cannot be deleted
/// the order stays.
pub async fn delete_order(state: &AppState, order_id: Uuid) -> AppResult<()> {
    let txn = state.orm.begin().await?;
    let order = find_order_model(&txn, order_id, true).await?;

    let removed = order_item_store::delete_all_for_order(&txn, order.id).await?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    let mut active: OrderActive = order.into();
    active.deleted_date = Set(Some(now));
    active.updated_date = Set(now);
    active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order_id, items = removed, "order deleted");
    Ok(())
}

pub async fn list_orders(
    state: &AppState,
    buyer_id: Uuid,
    query: OrderListQuery,
) -> AppResult<(Vec<Order>, Meta)> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all()
        .add(OrderCol::UserId.eq(buyer_id))
        .add(OrderCol::DeletedDate.is_null());
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.parse::<OrderStatus>()?));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedDate),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedDate),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let orders = with_item_counts(&state.orm, models).await?;

    Ok((orders, Meta::new(page, limit, total)))
}

/// Submitted orders holding at least one live item from a farm of
/// `owner_id`, newest first.
pub async fn list_farmer_orders(
    state: &AppState,
    owner_id: Uuid,
    pagination: Pagination,
) -> AppResult<(Vec<Order>, Meta)> {
    let (page, limit, offset) = pagination.normalize();
    let farm_ids = state.farms.farms_owned_by(owner_id).await?;
    if farm_ids.is_empty() {
        return Ok((Vec::new(), Meta::new(page, limit, 0)));
    }

    let finder = Orders::find()
        .join(JoinType::InnerJoin, OrderRel::OrderItems.def())
        .filter(OrderItemCol::FarmId.is_in(farm_ids))
        .filter(OrderItemCol::DeletedDate.is_null())
        .filter(OrderCol::DeletedDate.is_null())
        .filter(OrderCol::Status.ne(OrderStatus::Draft))
        .distinct()
        .order_by_desc(OrderCol::CreatedDate);

    let total = finder.clone().count(&state.orm).await? as i64;
    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let orders = with_item_counts(&state.orm, models).await?;

    Ok((orders, Meta::new(page, limit, total)))
}

pub(crate) async fn find_order_model<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    for_update: bool,
) -> AppResult<OrderModel> {
    let mut finder = Orders::find_by_id(order_id).filter(OrderCol::DeletedDate.is_null());
    if for_update {
        finder = finder.lock(LockType::Update);
    }
    finder.one(conn).await?.ok_or(AppError::NotFound)
}

async fn has_draft<C: ConnectionTrait>(conn: &C, buyer_id: Uuid) -> AppResult<bool> {
    let drafts = Orders::find()
        .filter(OrderCol::UserId.eq(buyer_id))
        .filter(OrderCol::Status.eq(OrderStatus::Draft))
        .filter(OrderCol::DeletedDate.is_null())
        .count(conn)
        .await?;
    Ok(drafts > 0)
}

pub(crate) async fn with_item_counts<C: ConnectionTrait>(
    conn: &C,
    models: Vec<OrderModel>,
) -> AppResult<Vec<Order>> {
    let mut orders = Vec::with_capacity(models.len());
    for model in models {
        let items_count = order_item_store::count_for_order(conn, model.id).await?;
        orders.push(order_from_entity(model, items_count));
    }
    Ok(orders)
}

pub(crate) fn order_total(products_price: i64, shipping_price: i64) -> AppResult<i64> {
    products_price
        .checked_add(shipping_price)
        .ok_or_else(|| AppError::Validation("order total is too large".into()))
}

fn ensure_shipping_price(shipping_price: i64) -> AppResult<()> {
    if shipping_price < 0 {
        return Err(AppError::Validation(
            "shipping_price must not be negative".into(),
        ));
    }
    Ok(())
}

pub(crate) fn order_from_entity(model: OrderModel, items_count: u64) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        comment: model.comment,
        address: model.address,
        products_price: model.products_price,
        shipping_price: model.shipping_price,
        total_price: model.total_price,
        status: model.status,
        post_office: model.post_office,
        post_office_city: model.post_office_city,
        tracking_number: model.tracking_number,
        commission_settled: model.commission_settled,
        items_count,
        created_date: model.created_date.with_timezone(&Utc),
        updated_date: model.updated_date.with_timezone(&Utc),
    }
}
