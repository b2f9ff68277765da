use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ColumnTrait, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};
use uuid::Uuid;

use crate::{
    dto::orders::CommissionReport,
    entity::{
        order_items::Column as OrderItemCol,
        orders::{Column as OrderCol, Entity as Orders, Relation as OrderRel},
    },
    error::{AppError, AppResult},
    models::OrderCommission,
    services::order_service,
    state::AppState,
    status::OrderStatus,
};

/// Platform share owed by a farm owner: every COMPLETED order holding one
/// of the owner's farms' items and not settled yet, each charged
/// `total_price * rate` rounded to the cent.
///
/// Read-only. Settling is done elsewhere.
pub async fn compute_outstanding(state: &AppState, owner_id: Uuid) -> AppResult<CommissionReport> {
    let farm_ids = state.farms.farms_owned_by(owner_id).await?;
    if farm_ids.is_empty() {
        return Ok(CommissionReport {
            orders: Vec::new(),
            total_commission: 0,
        });
    }

    let models = Orders::find()
        .join(JoinType::InnerJoin, OrderRel::OrderItems.def())
        .filter(OrderItemCol::FarmId.is_in(farm_ids))
        .filter(OrderItemCol::DeletedDate.is_null())
        .filter(OrderCol::DeletedDate.is_null())
        .filter(OrderCol::Status.eq(OrderStatus::Completed))
        .filter(OrderCol::CommissionSettled.eq(false))
        .distinct()
        .order_by_asc(OrderCol::CreatedDate)
        .all(&state.orm)
        .await?;
    let orders = order_service::with_item_counts(&state.orm, models).await?;

    let rate = state.settings.commission_rate;
    let mut total_commission: i64 = 0;
    let mut annotated = Vec::with_capacity(orders.len());
    for order in orders {
        let commission = commission_for(order.total_price, rate)?;
        total_commission = total_commission
            .checked_add(commission)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("commission total overflow")))?;
        annotated.push(OrderCommission { order, commission });
    }

    tracing::debug!(
        owner_id = %owner_id,
        orders = annotated.len(),
        total_commission,
        "outstanding commission computed"
    );

    Ok(CommissionReport {
        orders: annotated,
        total_commission,
    })
}

/// `total_price * rate` in cents, half away from zero.
pub fn commission_for(total_price: i64, rate: Decimal) -> AppResult<i64> {
    let amount = (Decimal::from(total_price) * rate)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    i64::try_from(amount)
        .map_err(|err| AppError::Internal(anyhow::anyhow!("commission out of range: {err}")))
}
