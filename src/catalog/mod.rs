//! Read-only view of the marketplace catalog used by the order core.
//!
//! Offers and farms are managed elsewhere; orders only need a price/stock
//! snapshot of an offer and the owner of a farm.

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppResult;

pub mod memory;
pub mod orm;

pub use memory::InMemoryCatalog;
pub use orm::OrmCatalog;

/// Current state of an offer at the moment it is looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OfferSnapshot {
    pub id: Uuid,
    pub title: String,
    /// Unit price in cents.
    pub price: i64,
    pub stock: i32,
    pub farm_id: Uuid,
    pub owner_user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FarmSnapshot {
    pub id: Uuid,
    pub owner_user_id: Uuid,
}

#[async_trait]
pub trait OfferLookup: Send + Sync {
    /// Fails with `NotFound` when the offer is missing or soft-deleted.
    async fn get_offer(&self, offer_id: Uuid) -> AppResult<OfferSnapshot>;
}

#[async_trait]
pub trait FarmLookup: Send + Sync {
    async fn get_farm(&self, farm_id: Uuid) -> AppResult<FarmSnapshot>;

    /// Ids of every live farm owned by `user_id`.
    async fn farms_owned_by(&self, user_id: Uuid) -> AppResult<Vec<Uuid>>;
}
