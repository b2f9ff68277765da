use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    catalog::{FarmLookup, FarmSnapshot, OfferLookup, OfferSnapshot},
    error::{AppError, AppResult},
};

/// In-memory catalog for tests and local runs.
///
/// Clones share the same storage, so a test can keep a handle and change
/// stock or prices after the state has been built.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    farms: Arc<RwLock<HashMap<Uuid, FarmSnapshot>>>,
    offers: Arc<RwLock<HashMap<Uuid, OfferSnapshot>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a farm for `owner_user_id` and returns its id.
    pub async fn add_farm(&self, owner_user_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.farms.write().await.insert(
            id,
            FarmSnapshot {
                id,
                owner_user_id,
            },
        );
        id
    }

    /// Registers an offer on an existing farm. The offer owner is the farm owner.
    pub async fn add_offer(
        &self,
        farm_id: Uuid,
        title: &str,
        price: i64,
        stock: i32,
    ) -> AppResult<Uuid> {
        let owner_user_id = self
            .farms
            .read()
            .await
            .get(&farm_id)
            .map(|farm| farm.owner_user_id)
            .ok_or(AppError::NotFound)?;

        let id = Uuid::new_v4();
        self.offers.write().await.insert(
            id,
            OfferSnapshot {
                id,
                title: title.to_string(),
                price,
                stock,
                farm_id,
                owner_user_id,
            },
        );
        Ok(id)
    }

    pub async fn set_stock(&self, offer_id: Uuid, stock: i32) -> AppResult<()> {
        let mut offers = self.offers.write().await;
        let offer = offers.get_mut(&offer_id).ok_or(AppError::NotFound)?;
        offer.stock = stock;
        Ok(())
    }

    pub async fn set_price(&self, offer_id: Uuid, price: i64) -> AppResult<()> {
        let mut offers = self.offers.write().await;
        let offer = offers.get_mut(&offer_id).ok_or(AppError::NotFound)?;
        offer.price = price;
        Ok(())
    }

    pub async fn remove_offer(&self, offer_id: Uuid) {
        self.offers.write().await.remove(&offer_id);
    }
}

#[async_trait]
impl OfferLookup for InMemoryCatalog {
    async fn get_offer(&self, offer_id: Uuid) -> AppResult<OfferSnapshot> {
        self.offers
            .read()
            .await
            .get(&offer_id)
            .cloned()
            .ok_or(AppError::NotFound)
    }
}

#[async_trait]
impl FarmLookup for InMemoryCatalog {
    async fn get_farm(&self, farm_id: Uuid) -> AppResult<FarmSnapshot> {
        self.farms
            .read()
            .await
            .get(&farm_id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn farms_owned_by(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self
            .farms
            .read()
            .await
            .values()
            .filter(|farm| farm.owner_user_id == user_id)
            .map(|farm| farm.id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}
