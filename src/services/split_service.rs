//! Per-farm decomposition of a multi-farm order.
//!
//! Groups are computed on demand and never stored. Submitting a group
//! creates a SUBMITTED sub-order and moves the farm's items onto it;
//! deleting a group drops those items from the parent order.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, TransactionTrait};
use uuid::Uuid;

use crate::{
    catalog::OfferLookup,
    dto::orders::OrderWithItems,
    entity::orders::{ActiveModel as OrderActive, Model as OrderModel},
    error::{AppError, AppResult},
    models::{NewOrderItem, OrderDraft, OrderItem, SplitGroup},
    services::{order_item_store, order_service},
    state::AppState,
    status::OrderStatus,
};

/// Buckets the order's items by farm. Each bucket is re-priced against the
/// current offers, so stock and self-purchase are checked again.
pub async fn group_by_farm(
    state: &AppState,
    order_id: Uuid,
) -> AppResult<BTreeMap<Uuid, SplitGroup>> {
    let order = order_service::find_order_model(&state.orm, order_id, false).await?;
    split_groups(&state.orm, state.offers.as_ref(), &order).await
}

/// Turns one farm's group into a SUBMITTED sub-order.
///
/// The group is priced against the catalog first. The write then runs in a
/// single transaction with the parent row locked and only goes ahead if the
/// farm's items are still the ones that were priced, so two concurrent
/// submits for the same farm cannot both move them; the second one gets
/// [`AppError::FarmNotInOrder`].
pub async fn submit_split(
    state: &AppState,
    order_id: Uuid,
    farm_id: Uuid,
) -> AppResult<OrderWithItems> {
    let group = priced_group(state, order_id, farm_id).await?;

    let txn = state.orm.begin().await?;
    let parent = order_service::find_order_model(&txn, order_id, true).await?;
    let item_ids = ensure_group_unchanged(&txn, &parent, &group).await?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    let total_price = order_service::order_total(group.products_price, parent.shipping_price)?;
    let sub_order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(parent.user_id),
        comment: Set(parent.comment.clone()),
        address: Set(parent.address.clone()),
        products_price: Set(group.products_price),
        shipping_price: Set(parent.shipping_price),
        total_price: Set(total_price),
        status: Set(OrderStatus::Submitted),
        post_office: Set(parent.post_office.clone()),
        post_office_city: Set(parent.post_office_city.clone()),
        tracking_number: Set(parent.tracking_number.clone()),
        commission_settled: Set(false),
        created_date: Set(now),
        updated_date: Set(now),
        deleted_date: Set(None),
    }
    .insert(&txn)
    .await?;

    let moved = order_item_store::rehome(&txn, &item_ids, sub_order.id).await?;
    if moved != item_ids.len() as u64 {
        return Err(AppError::FarmNotInOrder { farm_id });
    }

    let order = order_service::recalculate(&txn, sub_order.id).await?;
    let parent = order_service::recalculate(&txn, parent.id).await?;
    let items = order_item_store::find_all_for_order(&txn, sub_order.id).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %parent.id,
        sub_order_id = %order.id,
        farm_id = %farm_id,
        items = items.len(),
        "split submitted"
    );

    Ok(OrderWithItems { order, items })
}

/// Drops one farm's items from the order and recalculates it.
pub async fn delete_split(state: &AppState, order_id: Uuid, farm_id: Uuid) -> AppResult<()> {
    let group = priced_group(state, order_id, farm_id).await?;

    let txn = state.orm.begin().await?;
    let parent = order_service::find_order_model(&txn, order_id, true).await?;
    let item_ids = ensure_group_unchanged(&txn, &parent, &group).await?;

    for item_id in &item_ids {
        order_item_store::delete(&txn, *item_id).await?;
    }
    order_service::recalculate(&txn, parent.id).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order_id, farm_id = %farm_id, items = item_ids.len(), "split deleted");
    Ok(())
}

/// The farm's group as of now. Catalog reads happen here, before any
/// transaction holds a connection.
async fn priced_group(state: &AppState, order_id: Uuid, farm_id: Uuid) -> AppResult<SplitGroup> {
    let order = order_service::find_order_model(&state.orm, order_id, false).await?;
    split_groups(&state.orm, state.offers.as_ref(), &order)
        .await?
        .remove(&farm_id)
        .ok_or(AppError::FarmNotInOrder { farm_id })
}

/// Re-reads the farm's live items under the parent lock and compares them
/// with the priced group.
async fn ensure_group_unchanged<C: ConnectionTrait>(
    conn: &C,
    parent: &OrderModel,
    group: &SplitGroup,
) -> AppResult<Vec<Uuid>> {
    let current: BTreeSet<Uuid> = order_item_store::find_all_for_order(conn, parent.id)
        .await?
        .into_iter()
        .filter(|item| item.farm_id == group.farm_id)
        .map(|item| item.id)
        .collect();
    if current.is_empty() {
        return Err(AppError::FarmNotInOrder {
            farm_id: group.farm_id,
        });
    }

    let priced: BTreeSet<Uuid> = group.items.iter().map(|item| item.id).collect();
    if current != priced {
        return Err(AppError::Validation(
            "order items changed while splitting, try again".into(),
        ));
    }
    Ok(current.into_iter().collect())
}

async fn split_groups<C: ConnectionTrait>(
    conn: &C,
    offers: &dyn OfferLookup,
    order: &OrderModel,
) -> AppResult<BTreeMap<Uuid, SplitGroup>> {
    let items = order_item_store::find_all_for_order(conn, order.id).await?;

    let mut buckets: BTreeMap<Uuid, Vec<OrderItem>> = BTreeMap::new();
    for item in items {
        buckets.entry(item.farm_id).or_default().push(item);
    }

    let mut groups = BTreeMap::new();
    for (farm_id, items) in buckets {
        let requested: Vec<NewOrderItem> = items
            .iter()
            .map(|item| NewOrderItem {
                offer_id: item.offer_id,
                quantity: item.quantity,
            })
            .collect();
        let priced =
            order_item_store::price_items(offers, &requested, order.user_id, HashSet::new())
                .await?;
        let total_price = order_service::order_total(priced.products_price, order.shipping_price)?;

        groups.insert(
            farm_id,
            SplitGroup {
                farm_id,
                items,
                products_price: priced.products_price,
                order: OrderDraft {
                    user_id: order.user_id,
                    comment: order.comment.clone(),
                    address: order.address.clone(),
                    products_price: priced.products_price,
                    shipping_price: order.shipping_price,
                    total_price,
                    status: OrderStatus::Draft,
                    post_office: order.post_office.clone(),
                    post_office_city: order.post_office_city.clone(),
                    tracking_number: order.tracking_number.clone(),
                },
            },
        );
    }

    Ok(groups)
}
