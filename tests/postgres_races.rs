use std::sync::Arc;

use chrono::Utc;
use farm_market_api::{
    catalog::OrmCatalog,
    config::OrderSettings,
    db::{create_orm_conn, run_migrations},
    dto::orders::CreateOrderRequest,
    entity::{farms::ActiveModel as FarmActive, offers::ActiveModel as OfferActive},
    error::AppError,
    models::NewOrderItem,
    services::{order_service, split_service},
    state::AppState,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

// Races that only a real Postgres can show: row locks and the partial
// unique index under concurrent writers.
#[tokio::test]
async fn concurrent_creates_and_splits_on_postgres() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL to run the Postgres flow.");
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;
    let owner_a = Uuid::new_v4();
    let owner_b = Uuid::new_v4();
    let farm_a = insert_farm(&state, owner_a).await?;
    let farm_b = insert_farm(&state, owner_b).await?;
    let apples = insert_offer(&state, farm_a, owner_a, 1000).await?;
    let honey = insert_offer(&state, farm_b, owner_b, 750).await?;

    let buyer = Uuid::new_v4();
    let lines = vec![
        NewOrderItem {
            offer_id: apples,
            quantity: 3,
        },
        NewOrderItem {
            offer_id: honey,
            quantity: 2,
        },
    ];

    // Two carts for one buyer at once: exactly one wins.
    let (first, second) = tokio::join!(
        order_service::create_order(&state, buyer, request(lines.clone())),
        order_service::create_order(&state, buyer, request(lines.clone())),
    );
    let (created, lost) = match (first, second) {
        (Ok(created), Err(err)) | (Err(err), Ok(created)) => (created, err),
        (first, second) => anyhow::bail!("expected one winner, got {first:?} and {second:?}"),
    };
    assert!(matches!(lost, AppError::DraftAlreadyExists));
    assert_eq!(created.order.products_price, 4500);
    assert_eq!(created.order.total_price, 5000);

    // Two submits of the same farm at once: one sub-order, never two.
    let order_id = created.order.id;
    let (first, second) = tokio::join!(
        split_service::submit_split(&state, order_id, farm_a),
        split_service::submit_split(&state, order_id, farm_a),
    );
    let (sub, lost) = match (first, second) {
        (Ok(sub), Err(err)) | (Err(err), Ok(sub)) => (sub, err),
        (first, second) => anyhow::bail!("expected one winner, got {first:?} and {second:?}"),
    };
    assert!(matches!(lost, AppError::FarmNotInOrder { .. }));
    assert_eq!(sub.order.products_price, 3000);

    let parent = order_service::find_order(&state.orm, order_id).await?;
    assert_eq!(parent.products_price, 1500);
    assert_eq!(parent.total_price, 2000);

    Ok(())
}

fn request(items: Vec<NewOrderItem>) -> CreateOrderRequest {
    CreateOrderRequest {
        items,
        shipping_price: 500,
        address: Some("Somewhere".into()),
        comment: String::new(),
        post_office: None,
        post_office_city: None,
    }
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url, 5).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, offers, farms CASCADE",
    ))
    .await?;

    let catalog = Arc::new(OrmCatalog::new(orm.clone()));
    Ok(AppState {
        orm,
        offers: catalog.clone(),
        farms: catalog,
        settings: OrderSettings::default(),
        jwt_secret: Arc::from("test-secret"),
    })
}

async fn insert_farm(state: &AppState, owner: Uuid) -> anyhow::Result<Uuid> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let farm = FarmActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(owner),
        name: Set("Test farm".into()),
        city: Set(None),
        created_date: Set(now),
        updated_date: Set(now),
        deleted_date: Set(None),
    }
    .insert(&state.orm)
    .await?;
    Ok(farm.id)
}

async fn insert_offer(
    state: &AppState,
    farm_id: Uuid,
    owner: Uuid,
    price: i64,
) -> anyhow::Result<Uuid> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let offer = OfferActive {
        id: Set(Uuid::new_v4()),
        farm_id: Set(farm_id),
        user_id: Set(owner),
        title: Set("Test offer".into()),
        price: Set(price),
        stock: Set(100),
        created_date: Set(now),
        updated_date: Set(now),
        deleted_date: Set(None),
    }
    .insert(&state.orm)
    .await?;
    Ok(offer.id)
}
