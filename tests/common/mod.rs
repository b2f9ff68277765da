#![allow(dead_code)]

use std::sync::Arc;

use farm_market_api::{
    catalog::InMemoryCatalog,
    config::OrderSettings,
    db::run_migrations,
    dto::orders::{CreateOrderRequest, OrderWithItems},
    models::NewOrderItem,
    services::order_service,
    state::AppState,
};
use sea_orm::{ConnectOptions, Database};
use uuid::Uuid;

/// State over a fresh in-memory SQLite database with the migrations applied.
///
/// One connection only, so every test sees the same database.
pub async fn setup() -> anyhow::Result<(AppState, InMemoryCatalog)> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let orm = Database::connect(options).await?;
    run_migrations(&orm).await?;

    let catalog = InMemoryCatalog::new();
    let state = AppState {
        orm,
        offers: Arc::new(catalog.clone()),
        farms: Arc::new(catalog.clone()),
        settings: OrderSettings::default(),
        jwt_secret: Arc::from("test-secret"),
    };
    Ok((state, catalog))
}

/// A farm with a fresh owner.
pub async fn farm(catalog: &InMemoryCatalog) -> (Uuid, Uuid) {
    let owner = Uuid::new_v4();
    let farm_id = catalog.add_farm(owner).await;
    (owner, farm_id)
}

pub fn line(offer_id: Uuid, quantity: i32) -> NewOrderItem {
    NewOrderItem { offer_id, quantity }
}

pub fn create_request(items: Vec<NewOrderItem>, shipping_price: i64) -> CreateOrderRequest {
    CreateOrderRequest {
        items,
        shipping_price,
        address: Some("12 Orchard Lane".into()),
        comment: "leave at the gate".into(),
        post_office: Some("7".into()),
        post_office_city: Some("Poltava".into()),
    }
}

pub async fn create_order(
    state: &AppState,
    buyer: Uuid,
    items: Vec<NewOrderItem>,
    shipping_price: i64,
) -> anyhow::Result<OrderWithItems> {
    let order =
        order_service::create_order(state, buyer, create_request(items, shipping_price)).await?;
    Ok(order)
}
