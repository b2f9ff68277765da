use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::Order,
    services::order_item_store,
    state::AppState,
};

/// Claims of the bearer tokens issued by the auth service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

pub fn decode_token(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Validation("Invalid or expired token".into()))?;

    let user_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::Validation("Invalid user id in token".into()))?;

    Ok(AuthUser { user_id })
}

/// Only the buyer may act on an order as its receiver.
pub fn ensure_buyer(order: &Order, user: &AuthUser) -> Result<(), AppError> {
    if order.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// The user must own at least one farm with items in the order. Enough to
/// read it.
pub async fn ensure_farmer(state: &AppState, order_id: Uuid, user: &AuthUser) -> AppResult<()> {
    let (owned, in_order) = farms_of(state, order_id, user).await?;
    if in_order.iter().any(|farm_id| owned.contains(farm_id)) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// The user must own every farm with items in the order. Required to move
/// it through the farmer side of the status table; a multi-farm order has
/// to be split per farm first.
pub async fn ensure_sole_farmer(
    state: &AppState,
    order_id: Uuid,
    user: &AuthUser,
) -> AppResult<()> {
    let (owned, in_order) = farms_of(state, order_id, user).await?;
    if !in_order.is_empty() && in_order.iter().all(|farm_id| owned.contains(farm_id)) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

async fn farms_of(
    state: &AppState,
    order_id: Uuid,
    user: &AuthUser,
) -> AppResult<(Vec<Uuid>, Vec<Uuid>)> {
    let owned = state.farms.farms_owned_by(user.user_id).await?;
    let in_order = order_item_store::farms_in_order(&state.orm, order_id).await?;
    Ok((owned, in_order))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Validation("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Validation("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Validation("Invalid Authorization scheme".into()))?
            .trim();

        decode_token(token, &state.jwt_secret)
    }
}
