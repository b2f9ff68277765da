use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use farm_market_api::{
    catalog::{FarmLookup, OfferLookup, OrmCatalog},
    config::OrderSettings,
    db::run_migrations,
    dto::{
        order_items::{AddOrderItemRequest, UpdateOrderItemRequest},
        orders::CreateOrderRequest,
    },
    entity::{farms::ActiveModel as FarmActive, offers::ActiveModel as OfferActive},
    error::AppError,
    models::NewOrderItem,
    services::{order_item_service, order_service, split_service},
    state::AppState,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use uuid::Uuid;

async fn connect() -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let orm = Database::connect(options).await?;
    run_migrations(&orm).await?;
    Ok(orm)
}

fn orm_state(orm: DatabaseConnection) -> AppState {
    let catalog = Arc::new(OrmCatalog::new(orm.clone()));
    AppState {
        orm,
        offers: catalog.clone(),
        farms: catalog,
        settings: OrderSettings::default(),
        jwt_secret: Arc::from("test-secret"),
    }
}

fn create_request(items: Vec<NewOrderItem>) -> CreateOrderRequest {
    CreateOrderRequest {
        items,
        shipping_price: 150,
        address: None,
        comment: String::new(),
        post_office: None,
        post_office_city: None,
    }
}

fn line(offer_id: Uuid, quantity: i32) -> NewOrderItem {
    NewOrderItem { offer_id, quantity }
}

/// Fails the test instead of hanging when a call waits on the only pooled connection.
async fn within<T>(call: impl Future<Output = Result<T, AppError>>) -> anyhow::Result<T> {
    Ok(tokio::time::timeout(Duration::from_secs(5), call).await??)
}

async fn insert_farm(orm: &DatabaseConnection, owner: Uuid, deleted: bool) -> anyhow::Result<Uuid> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let farm = FarmActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(owner),
        name: Set("Green Acres".into()),
        city: Set(Some("Lviv".into())),
        created_date: Set(now),
        updated_date: Set(now),
        deleted_date: Set(deleted.then_some(now)),
    }
    .insert(orm)
    .await?;
    Ok(farm.id)
}

async fn insert_offer(
    orm: &DatabaseConnection,
    farm_id: Uuid,
    owner: Uuid,
    price: i64,
    deleted: bool,
) -> anyhow::Result<Uuid> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let offer = OfferActive {
        id: Set(Uuid::new_v4()),
        farm_id: Set(farm_id),
        user_id: Set(owner),
        title: Set("Potatoes".into()),
        price: Set(price),
        stock: Set(20),
        created_date: Set(now),
        updated_date: Set(now),
        deleted_date: Set(deleted.then_some(now)),
    }
    .insert(orm)
    .await?;
    Ok(offer.id)
}

#[tokio::test]
async fn reads_live_offers_and_farms() -> anyhow::Result<()> {
    let orm = connect().await?;
    let owner = Uuid::new_v4();
    let farm_id = insert_farm(&orm, owner, false).await?;
    let closed_farm = insert_farm(&orm, owner, true).await?;
    let offer_id = insert_offer(&orm, farm_id, owner, 450, false).await?;
    let withdrawn = insert_offer(&orm, farm_id, owner, 450, true).await?;

    let catalog = OrmCatalog::new(orm.clone());

    let offer = catalog.get_offer(offer_id).await?;
    assert_eq!(offer.price, 450);
    assert_eq!(offer.stock, 20);
    assert_eq!(offer.farm_id, farm_id);
    assert_eq!(offer.owner_user_id, owner);
    assert!(matches!(
        catalog.get_offer(withdrawn).await,
        Err(AppError::NotFound)
    ));

    let farm = catalog.get_farm(farm_id).await?;
    assert_eq!(farm.owner_user_id, owner);
    assert!(matches!(
        catalog.get_farm(closed_farm).await,
        Err(AppError::NotFound)
    ));

    assert_eq!(catalog.farms_owned_by(owner).await?, vec![farm_id]);
    assert!(catalog.farms_owned_by(Uuid::new_v4()).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn creates_orders_from_stored_offers() -> anyhow::Result<()> {
    let orm = connect().await?;
    let owner = Uuid::new_v4();
    let farm_id = insert_farm(&orm, owner, false).await?;
    let offer_id = insert_offer(&orm, farm_id, owner, 450, false).await?;

    let state = orm_state(orm);

    let created = order_service::create_order(
        &state,
        Uuid::new_v4(),
        create_request(vec![line(offer_id, 4)]),
    )
    .await?;

    assert_eq!(created.order.products_price, 1800);
    assert_eq!(created.order.total_price, 1950);
    assert_eq!(created.items[0].farm_id, farm_id);
    assert_eq!(created.items[0].title, "Potatoes");
    Ok(())
}

#[tokio::test]
async fn item_and_split_writes_with_one_pooled_connection() -> anyhow::Result<()> {
    let orm = connect().await?;
    let (owner_a, owner_b) = (Uuid::new_v4(), Uuid::new_v4());
    let farm_a = insert_farm(&orm, owner_a, false).await?;
    let farm_b = insert_farm(&orm, owner_b, false).await?;
    let potatoes = insert_offer(&orm, farm_a, owner_a, 450, false).await?;
    let onions = insert_offer(&orm, farm_a, owner_a, 200, false).await?;
    let carrots = insert_offer(&orm, farm_b, owner_b, 300, false).await?;
    let state = orm_state(orm);

    let buyer = Uuid::new_v4();
    let created = within(order_service::create_order(
        &state,
        buyer,
        create_request(vec![line(potatoes, 1)]),
    ))
    .await?;
    let order_id = created.order.id;

    let added = within(order_item_service::add_item(
        &state,
        order_id,
        AddOrderItemRequest {
            offer_id: carrots,
            quantity: 2,
        },
    ))
    .await?;
    assert_eq!(added.farm_id, farm_b);
    within(order_item_service::add_item(
        &state,
        order_id,
        AddOrderItemRequest {
            offer_id: onions,
            quantity: 1,
        },
    ))
    .await?;

    let updated = within(order_item_service::update_item(
        &state,
        created.items[0].id,
        UpdateOrderItemRequest { quantity: 3 },
    ))
    .await?;
    assert_eq!(updated.total_price, 1350);

    let sub = within(split_service::submit_split(&state, order_id, farm_a)).await?;
    assert_eq!(sub.items.len(), 2);
    assert_eq!(sub.order.products_price, 1550);

    within(split_service::delete_split(&state, order_id, farm_b)).await?;
    let parent = within(order_service::find_order(&state.orm, order_id)).await?;
    assert_eq!(parent.products_price, 0);
    assert_eq!(parent.items_count, 0);

    assert!(matches!(
        within(split_service::submit_split(&state, order_id, farm_a)).await,
        Err(err) if matches!(err.downcast_ref::<AppError>(), Some(AppError::FarmNotInOrder { .. }))
    ));
    Ok(())
}
