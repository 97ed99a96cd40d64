mod common;

use shopfront_api::{
    dto::products::{CreateProductRequest, UpdateProductRequest},
    error::AppError,
    routes::params::ProductQuery,
    services::product_service,
};

#[tokio::test]
async fn creating_an_existing_name_restocks_it() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let name = common::unique("lamp");
    let category = common::unique("lighting");

    let request = || CreateProductRequest {
        name: name.clone(),
        price: 2_500,
        category: Some(category.clone()),
    };

    let (first, created) = product_service::create_product(&state, request()).await?;
    let first = first.into_data().expect("product");
    assert!(created);
    assert_eq!(first.stock, 1);

    let (second, created) = product_service::create_product(&state, request()).await?;
    let second = second.into_data().expect("product");
    assert!(!created);
    assert_eq!(second.id, first.id);
    assert_eq!(second.stock, 2);

    let listed = product_service::list_products(
        &state,
        ProductQuery {
            category: Some(category),
            ..Default::default()
        },
    )
    .await?
    .into_data()
    .expect("list");
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].stock, 2);

    Ok(())
}

#[tokio::test]
async fn deleting_a_missing_product_returns_nothing() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let deleted = product_service::delete_product(&state, i32::MAX)
        .await?
        .into_data()
        .expect("rows");
    assert!(deleted.is_empty());
    Ok(())
}

#[tokio::test]
async fn updating_a_missing_product_is_not_found() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let result = product_service::update_product(
        &state,
        i32::MAX,
        UpdateProductRequest {
            price: Some(10),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn delete_returns_the_removed_row() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let id = common::product_with_stock(&state, 900, 4).await?;

    let deleted = product_service::delete_product(&state, id)
        .await?
        .into_data()
        .expect("rows");
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].id, id);

    let again = product_service::get_product(&state, id).await;
    assert!(matches!(again, Err(AppError::NotFound)));
    Ok(())
}
