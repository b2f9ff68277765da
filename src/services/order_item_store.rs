//! Line-item persistence and pricing.
//!
//! Every price written to `order_items` goes through [`price_items`], and
//! every order total is derived from [`sum_total_for_order`]. The write
//! helpers take any [`ConnectionTrait`] so callers can run them inside their
//! own transaction.

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    catalog::OfferLookup,
    entity::order_items::{
        ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
        Model as OrderItemModel,
    },
    error::{AppError, AppResult},
    models::{NewOrderItem, OrderItem, PricedItem, PricedItems},
};

/// Validates the requested lines against the current offers and captures
/// their title and price. Nothing is written.
///
/// Fails on the first offending line, so a batch is accepted whole or not at all.
pub async fn prepare_and_price(
    offers: &dyn OfferLookup,
    items: &[NewOrderItem],
    buyer_id: Uuid,
) -> AppResult<PricedItems> {
    price_items(offers, items, buyer_id, HashSet::new()).await
}

/// Same as [`prepare_and_price`], treating `taken` as offers the order
/// already contains.
pub(crate) async fn price_items(
    offers: &dyn OfferLookup,
    items: &[NewOrderItem],
    buyer_id: Uuid,
    mut taken: HashSet<Uuid>,
) -> AppResult<PricedItems> {
    let mut priced = PricedItems::default();

    for item in items {
        if item.quantity <= 0 {
            return Err(AppError::Validation(
                "quantity must be greater than 0".into(),
            ));
        }
        if !taken.insert(item.offer_id) {
            return Err(AppError::DuplicateOfferInOrder {
                offer_id: item.offer_id,
            });
        }

        let offer = offers.get_offer(item.offer_id).await?;
        if item.quantity > offer.stock {
            return Err(AppError::InsufficientStock {
                offer_id: offer.id,
                requested: item.quantity,
                available: offer.stock,
            });
        }
        if offer.owner_user_id == buyer_id {
            return Err(AppError::SelfPurchase { offer_id: offer.id });
        }

        let total_price = line_total(offer.price, item.quantity)?;
        priced.products_price = priced
            .products_price
            .checked_add(total_price)
            .ok_or_else(|| AppError::Validation("order total is too large".into()))?;
        priced.items.push(PricedItem {
            offer_id: offer.id,
            farm_id: offer.farm_id,
            title: offer.title,
            price: offer.price,
            quantity: item.quantity,
            total_price,
        });
    }

    Ok(priced)
}

/// `price * quantity` in cents.
pub fn line_total(price: i64, quantity: i32) -> AppResult<i64> {
    price
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| AppError::Validation("line total is too large".into()))
}

/// Writes all items under `order_id` with a single insert.
pub async fn persist<C: ConnectionTrait>(
    conn: &C,
    items: &[PricedItem],
    order_id: Uuid,
) -> AppResult<Vec<OrderItem>> {
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    let models: Vec<OrderItemModel> = items
        .iter()
        .map(|item| OrderItemModel {
            id: Uuid::new_v4(),
            order_id,
            offer_id: item.offer_id,
            farm_id: item.farm_id,
            title: item.title.clone(),
            price: item.price,
            quantity: item.quantity,
            total_price: item.total_price,
            created_date: now,
            updated_date: now,
            deleted_date: None,
        })
        .collect();

    OrderItems::insert_many(models.iter().cloned().map(OrderItemActive::from))
        .exec_without_returning(conn)
        .await?;

    Ok(models.into_iter().map(order_item_from_entity).collect())
}

/// Sum of `total_price` over the live items of an order.
pub async fn sum_total_for_order<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<i64> {
    let total = OrderItems::find()
        .select_only()
        .column_as(
            Expr::cust("COALESCE(CAST(SUM(total_price) AS BIGINT), 0)"),
            "total",
        )
        .filter(OrderItemCol::OrderId.eq(order_id))
        .filter(OrderItemCol::DeletedDate.is_null())
        .into_tuple::<i64>()
        .one(conn)
        .await?;
    Ok(total.unwrap_or(0))
}

pub async fn count_for_order<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<u64> {
    let count = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .filter(OrderItemCol::DeletedDate.is_null())
        .count(conn)
        .await?;
    Ok(count)
}

/// Live items of an order, oldest first. Each item carries its farm id.
pub async fn find_all_for_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Vec<OrderItem>> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .filter(OrderItemCol::DeletedDate.is_null())
        .order_by_asc(OrderItemCol::CreatedDate)
        .order_by_asc(OrderItemCol::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();
    Ok(items)
}

pub async fn find_by_id<C: ConnectionTrait>(conn: &C, item_id: Uuid) -> AppResult<OrderItem> {
    find_model(conn, item_id).await.map(order_item_from_entity)
}

/// Distinct farms with live items in the order.
pub async fn farms_in_order<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Vec<Uuid>> {
    let farms = OrderItems::find()
        .select_only()
        .column(OrderItemCol::FarmId)
        .distinct()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .filter(OrderItemCol::DeletedDate.is_null())
        .into_tuple::<Uuid>()
        .all(conn)
        .await?;
    Ok(farms)
}

/// Changes the quantity of an item, keeping its snapshot unit price.
pub async fn update_quantity<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
    quantity: i32,
) -> AppResult<OrderItem> {
    let model = find_model(conn, item_id).await?;
    let total_price = line_total(model.price, quantity)?;

    let mut active: OrderItemActive = model.into();
    active.quantity = Set(quantity);
    active.total_price = Set(total_price);
    active.updated_date = Set(Utc::now().into());
    let updated = active.update(conn).await?;

    Ok(order_item_from_entity(updated))
}

/// Moves items to another order. Returns the number of rows moved.
pub async fn rehome<C: ConnectionTrait>(
    conn: &C,
    item_ids: &[Uuid],
    order_id: Uuid,
) -> AppResult<u64> {
    if item_ids.is_empty() {
        return Ok(0);
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = OrderItems::update_many()
        .col_expr(OrderItemCol::OrderId, Expr::value(order_id))
        .col_expr(OrderItemCol::UpdatedDate, Expr::value(now))
        .filter(OrderItemCol::Id.is_in(item_ids.iter().copied()))
        .filter(OrderItemCol::DeletedDate.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Soft-deletes one item.
pub async fn delete<C: ConnectionTrait>(conn: &C, item_id: Uuid) -> AppResult<()> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = OrderItems::update_many()
        .col_expr(OrderItemCol::DeletedDate, Expr::value(Some(now)))
        .filter(OrderItemCol::Id.eq(item_id))
        .filter(OrderItemCol::DeletedDate.is_null())
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Soft-deletes every live item of an order.
pub async fn delete_all_for_order<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<u64> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = OrderItems::update_many()
        .col_expr(OrderItemCol::DeletedDate, Expr::value(Some(now)))
        .filter(OrderItemCol::OrderId.eq(order_id))
        .filter(OrderItemCol::DeletedDate.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

async fn find_model<C: ConnectionTrait>(conn: &C, item_id: Uuid) -> AppResult<OrderItemModel> {
    OrderItems::find_by_id(item_id)
        .filter(OrderItemCol::DeletedDate.is_null())
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

pub(crate) fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        offer_id: model.offer_id,
        farm_id: model.farm_id,
        title: model.title,
        price: model.price,
        quantity: model.quantity,
        total_price: model.total_price,
        created_date: model.created_date.with_timezone(&Utc),
        updated_date: model.updated_date.with_timezone(&Utc),
    }
}
