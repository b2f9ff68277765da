use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    catalog::{FarmLookup, OfferLookup},
    config::OrderSettings,
};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub offers: Arc<dyn OfferLookup>,
    pub farms: Arc<dyn FarmLookup>,
    pub settings: OrderSettings,
    pub jwt_secret: Arc<str>,
}
