mod common;

use std::collections::HashSet;

use farm_market_api::{
    error::AppError,
    services::{order_item_store, order_service, split_service},
    status::OrderStatus,
};
use uuid::Uuid;

use common::{create_order, farm, line, setup};

#[tokio::test]
async fn groups_partition_the_order_by_farm() -> anyhow::Result<()> {
    let (state, catalog) = setup().await?;
    let (_, farm_a) = farm(&catalog).await;
    let (_, farm_b) = farm(&catalog).await;
    let apples = catalog.add_offer(farm_a, "Apples", 1000, 10).await?;
    let pears = catalog.add_offer(farm_a, "Pears", 400, 10).await?;
    let honey = catalog.add_offer(farm_b, "Honey", 750, 10).await?;
    let buyer = Uuid::new_v4();
    let created = create_order(
        &state,
        buyer,
        vec![line(apples, 3), line(pears, 1), line(honey, 2)],
        500,
    )
    .await?;

    let groups = split_service::group_by_farm(&state, created.order.id).await?;
    assert_eq!(groups.len(), 2);

    let group_a = &groups[&farm_a];
    let group_b = &groups[&farm_b];
    assert_eq!(group_a.items.len(), 2);
    assert_eq!(group_b.items.len(), 1);
    assert!(group_a.items.iter().all(|item| item.farm_id == farm_a));
    assert!(group_b.items.iter().all(|item| item.farm_id == farm_b));
    assert_eq!(group_a.products_price, 3400);
    assert_eq!(group_b.products_price, 1500);
    assert_eq!(
        group_a.products_price + group_b.products_price,
        created.order.products_price
    );

    let all: HashSet<Uuid> = created.items.iter().map(|item| item.id).collect();
    let grouped: HashSet<Uuid> = groups
        .values()
        .flat_map(|group| group.items.iter().map(|item| item.id))
        .collect();
    assert_eq!(all, grouped);

    assert_eq!(group_a.order.status, OrderStatus::Draft);
    assert_eq!(group_a.order.shipping_price, 500);
    assert_eq!(group_a.order.total_price, 3900);
    assert_eq!(group_a.order.comment, created.order.comment);
    assert_eq!(group_a.order.address, created.order.address);
    Ok(())
}

#[tokio::test]
async fn single_farm_order_is_one_group() -> anyhow::Result<()> {
    let (state, catalog) = setup().await?;
    let (_, farm_a) = farm(&catalog).await;
    let apples = catalog.add_offer(farm_a, "Apples", 1000, 10).await?;
    let created = create_order(&state, Uuid::new_v4(), vec![line(apples, 2)], 100).await?;

    let groups = split_service::group_by_farm(&state, created.order.id).await?;
    assert_eq!(groups.len(), 1);
    let group = &groups[&farm_a];
    assert_eq!(group.products_price, created.order.products_price);
    assert_eq!(group.order.total_price, created.order.total_price);
    Ok(())
}

#[tokio::test]
async fn grouping_rechecks_current_stock() -> anyhow::Result<()> {
    let (state, catalog) = setup().await?;
    let (_, farm_a) = farm(&catalog).await;
    let apples = catalog.add_offer(farm_a, "Apples", 1000, 10).await?;
    let created = create_order(&state, Uuid::new_v4(), vec![line(apples, 5)], 0).await?;

    catalog.set_stock(apples, 4).await?;

    let err = split_service::group_by_farm(&state, created.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { available: 4, .. }));

    let err = split_service::submit_split(&state, created.order.id, farm_a)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));
    let parent = order_service::get_order(&state, created.order.id).await?;
    assert_eq!(parent.items.len(), 1);
    assert_eq!(parent.order.products_price, 5000);
    Ok(())
}

#[tokio::test]
async fn submit_split_moves_farm_items_to_a_submitted_sub_order() -> anyhow::Result<()> {
    let (state, catalog) = setup().await?;
    let (_, farm_a) = farm(&catalog).await;
    let (_, farm_b) = farm(&catalog).await;
    let apples = catalog.add_offer(farm_a, "Apples", 1000, 10).await?;
    let honey = catalog.add_offer(farm_b, "Honey", 750, 10).await?;
    let buyer = Uuid::new_v4();
    let created = create_order(&state, buyer, vec![line(apples, 3), line(honey, 2)], 500).await?;
    assert_eq!(created.order.products_price, 4500);
    assert_eq!(created.order.total_price, 5000);

    let sub = split_service::submit_split(&state, created.order.id, farm_a).await?;
    assert_ne!(sub.order.id, created.order.id);
    assert_eq!(sub.order.user_id, buyer);
    assert_eq!(sub.order.status, OrderStatus::Submitted);
    assert_eq!(sub.order.products_price, 3000);
    assert_eq!(sub.order.total_price, 3500);
    assert_eq!(sub.items.len(), 1);
    assert_eq!(sub.items[0].offer_id, apples);
    assert_eq!(sub.items[0].order_id, sub.order.id);

    let parent = order_service::get_order(&state, created.order.id).await?;
    assert_eq!(parent.order.status, OrderStatus::Draft);
    assert_eq!(parent.order.products_price, 1500);
    assert_eq!(parent.order.total_price, 2000);
    assert_eq!(parent.items.len(), 1);
    assert_eq!(parent.items[0].offer_id, honey);
    Ok(())
}

#[tokio::test]
async fn every_farm_is_submitted_once() -> anyhow::Result<()> {
    let (state, catalog) = setup().await?;
    let (_, farm_a) = farm(&catalog).await;
    let (_, farm_b) = farm(&catalog).await;
    let apples = catalog.add_offer(farm_a, "Apples", 1000, 10).await?;
    let pears = catalog.add_offer(farm_a, "Pears", 400, 10).await?;
    let honey = catalog.add_offer(farm_b, "Honey", 750, 10).await?;
    let created = create_order(
        &state,
        Uuid::new_v4(),
        vec![line(apples, 1), line(pears, 2), line(honey, 3)],
        0,
    )
    .await?;
    let order_id = created.order.id;

    let sub_a = split_service::submit_split(&state, order_id, farm_a).await?;
    let sub_b = split_service::submit_split(&state, order_id, farm_b).await?;

    let ids_a: HashSet<Uuid> = sub_a.items.iter().map(|item| item.id).collect();
    let ids_b: HashSet<Uuid> = sub_b.items.iter().map(|item| item.id).collect();
    assert!(ids_a.is_disjoint(&ids_b));
    let union: HashSet<Uuid> = ids_a.union(&ids_b).copied().collect();
    let original: HashSet<Uuid> = created.items.iter().map(|item| item.id).collect();
    assert_eq!(union, original);

    let err = split_service::submit_split(&state, order_id, farm_a)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::FarmNotInOrder { farm_id } if farm_id == farm_a));

    // The parent is now empty.
    assert!(split_service::group_by_farm(&state, order_id).await?.is_empty());
    let parent = order_service::find_order(&state.orm, order_id).await?;
    assert_eq!(parent.products_price, 0);
    assert_eq!(parent.total_price, parent.shipping_price);
    assert_eq!(parent.items_count, 0);

    let err = split_service::delete_split(&state, order_id, farm_b)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::FarmNotInOrder { .. }));
    Ok(())
}

#[tokio::test]
async fn unknown_farm_is_rejected() -> anyhow::Result<()> {
    let (state, catalog) = setup().await?;
    let (_, farm_a) = farm(&catalog).await;
    let apples = catalog.add_offer(farm_a, "Apples", 1000, 10).await?;
    let created = create_order(&state, Uuid::new_v4(), vec![line(apples, 1)], 0).await?;

    let err = split_service::submit_split(&state, created.order.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::FarmNotInOrder { .. }));

    let err = split_service::submit_split(&state, Uuid::new_v4(), farm_a)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn delete_split_drops_farm_items() -> anyhow::Result<()> {
    let (state, catalog) = setup().await?;
    let (_, farm_a) = farm(&catalog).await;
    let (_, farm_b) = farm(&catalog).await;
    let apples = catalog.add_offer(farm_a, "Apples", 1000, 10).await?;
    let honey = catalog.add_offer(farm_b, "Honey", 750, 10).await?;
    let created =
        create_order(&state, Uuid::new_v4(), vec![line(apples, 3), line(honey, 2)], 500).await?;

    split_service::delete_split(&state, created.order.id, farm_b).await?;

    let parent = order_service::get_order(&state, created.order.id).await?;
    assert_eq!(parent.order.products_price, 3000);
    assert_eq!(parent.order.total_price, 3500);
    assert_eq!(parent.items.len(), 1);
    assert_eq!(parent.items[0].farm_id, farm_a);

    let farms = order_item_store::farms_in_order(&state.orm, created.order.id).await?;
    assert_eq!(farms, vec![farm_a]);
    Ok(())
}
