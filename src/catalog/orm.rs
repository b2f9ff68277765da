use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::{
    catalog::{FarmLookup, FarmSnapshot, OfferLookup, OfferSnapshot},
    entity::{
        farms::{Column as FarmCol, Entity as Farms},
        offers::{Column as OfferCol, Entity as Offers},
    },
    error::{AppError, AppResult},
};

/// Catalog backed by the `offers` and `farms` tables.
#[derive(Debug, Clone)]
pub struct OrmCatalog {
    orm: DatabaseConnection,
}

impl OrmCatalog {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }
}

#[async_trait]
impl OfferLookup for OrmCatalog {
    async fn get_offer(&self, offer_id: Uuid) -> AppResult<OfferSnapshot> {
        let offer = Offers::find_by_id(offer_id)
            .filter(OfferCol::DeletedDate.is_null())
            .one(&self.orm)
            .await?
            .ok_or(AppError::NotFound)?;

        Ok(OfferSnapshot {
            id: offer.id,
            title: offer.title,
            price: offer.price,
            stock: offer.stock,
            farm_id: offer.farm_id,
            owner_user_id: offer.user_id,
        })
    }
}

#[async_trait]
impl FarmLookup for OrmCatalog {
    async fn get_farm(&self, farm_id: Uuid) -> AppResult<FarmSnapshot> {
        let farm = Farms::find_by_id(farm_id)
            .filter(FarmCol::DeletedDate.is_null())
            .one(&self.orm)
            .await?
            .ok_or(AppError::NotFound)?;

        Ok(FarmSnapshot {
            id: farm.id,
            owner_user_id: farm.user_id,
        })
    }

    async fn farms_owned_by(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids = Farms::find()
            .select_only()
            .column(FarmCol::Id)
            .filter(FarmCol::UserId.eq(user_id))
            .filter(FarmCol::DeletedDate.is_null())
            .into_tuple::<Uuid>()
            .all(&self.orm)
            .await?;
        Ok(ids)
    }
}
