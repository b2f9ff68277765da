use std::collections::HashSet;

use sea_orm::{ConnectionTrait, TransactionTrait};
use uuid::Uuid;

use crate::{
    dto::order_items::{AddOrderItemRequest, UpdateOrderItemRequest},
    entity::orders::Model as OrderModel,
    error::{AppError, AppResult},
    models::{NewOrderItem, OrderItem},
    services::{order_item_store, order_service},
    state::AppState,
    status::OrderStatus,
};

/// Adds one offer to a DRAFT order and recalculates the order.
///
/// The offer is priced before the transaction opens. Under the order lock the
/// draft status and the duplicate check are repeated against the stored items.
pub async fn add_item(
    state: &AppState,
    order_id: Uuid,
    payload: AddOrderItemRequest,
) -> AppResult<OrderItem> {
    let order = order_service::find_order_model(&state.orm, order_id, false).await?;
    ensure_draft(&order)?;
    let taken = offers_in_order(&state.orm, order.id).await?;
    let priced = order_item_store::price_items(
        state.offers.as_ref(),
        &[NewOrderItem {
            offer_id: payload.offer_id,
            quantity: payload.quantity,
        }],
        order.user_id,
        taken,
    )
    .await?;

    let txn = state.orm.begin().await?;
    let order = order_service::find_order_model(&txn, order_id, true).await?;
    ensure_draft(&order)?;
    if offers_in_order(&txn, order.id).await?.contains(&payload.offer_id) {
        return Err(AppError::DuplicateOfferInOrder {
            offer_id: payload.offer_id,
        });
    }

    let item = order_item_store::persist(&txn, &priced.items, order.id)
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("order item was not written")))?;
    order_service::recalculate(&txn, order.id).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, item_id = %item.id, offer_id = %item.offer_id, "order item added");
    Ok(item)
}

/// Changes an item's quantity. Stock is checked against the current offer,
/// the unit price stays the one captured when the item was added.
pub async fn update_item(
    state: &AppState,
    item_id: Uuid,
    payload: UpdateOrderItemRequest,
) -> AppResult<OrderItem> {
    if payload.quantity <= 0 {
        return Err(AppError::Validation(
            "quantity must be greater than 0".into(),
        ));
    }

    let item = order_item_store::find_by_id(&state.orm, item_id).await?;
    let order = order_service::find_order_model(&state.orm, item.order_id, false).await?;
    ensure_draft(&order)?;

    let offer = state.offers.get_offer(item.offer_id).await?;
    if payload.quantity > offer.stock {
        return Err(AppError::InsufficientStock {
            offer_id: offer.id,
            requested: payload.quantity,
            available: offer.stock,
        });
    }

    let txn = state.orm.begin().await?;
    let item = order_item_store::find_by_id(&txn, item_id).await?;
    let order = order_service::find_order_model(&txn, item.order_id, true).await?;
    ensure_draft(&order)?;

    let item = order_item_store::update_quantity(&txn, item.id, payload.quantity).await?;
    order_service::recalculate(&txn, order.id).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, item_id = %item.id, quantity = item.quantity, "order item updated");
    Ok(item)
}

/// Soft-deletes an item and recalculates its order.
pub async fn delete_item(state: &AppState, item_id: Uuid) -> AppResult<()> {
    let txn = state.orm.begin().await?;
    let item = order_item_store::find_by_id(&txn, item_id).await?;
    let order = order_service::find_order_model(&txn, item.order_id, true).await?;
    ensure_draft(&order)?;

    order_item_store::delete(&txn, item.id).await?;
    order_service::recalculate(&txn, order.id).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, item_id = %item_id, "order item deleted");
    Ok(())
}

async fn offers_in_order<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<HashSet<Uuid>> {
    Ok(order_item_store::find_all_for_order(conn, order_id)
        .await?
        .into_iter()
        .map(|item| item.offer_id)
        .collect())
}

fn ensure_draft(order: &OrderModel) -> AppResult<()> {
    if order.status != OrderStatus::Draft {
        return Err(AppError::Validation(format!(
            "items of a {} order cannot be changed",
            order.status
        )));
    }
    Ok(())
}
