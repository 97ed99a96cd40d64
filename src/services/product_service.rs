use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use sqlx::FromRow;

use crate::{
    audit,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::products::{Column, Entity as Products},
    error::{AppError, AppResult},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

#[derive(FromRow)]
struct UpsertedProduct {
    #[sqlx(flatten)]
    product: Product,
    inserted: bool,
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(category) = query.category.as_ref().filter(|c| !c.is_empty()) {
        condition = condition.add(Column::Category.eq(category.clone()));
    }

    let sort_col = match query.sort_by.unwrap_or(ProductSortBy::CreatedAt) {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
        ProductSortBy::Stock => Column::Stock,
    };

    let mut finder = Products::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Asc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };
    finder = finder.order_by_asc(Column::Id);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: i32) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(Product::from)
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Product", product, None))
}

/// Insert a product, or add one unit of stock if the name is taken.
/// The boolean is `true` when a new row was created.
pub async fn create_product(
    state: &AppState,
    payload: CreateProductRequest,
) -> AppResult<(ApiResponse<Product>, bool)> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    if payload.price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }

    // xmax is 0 only for a freshly inserted tuple.
    let row = sqlx::query_as::<_, UpsertedProduct>(
        r#"
        INSERT INTO products (name, price, category, stock)
        VALUES ($1, $2, $3, 1)
        ON CONFLICT (name) DO UPDATE SET stock = products.stock + 1
        RETURNING *, (xmax = 0) AS inserted
        "#,
    )
    .bind(name)
    .bind(payload.price)
    .bind(payload.category.as_deref())
    .fetch_one(&state.pool)
    .await?;

    let UpsertedProduct { product, inserted } = row;
    let action = if inserted { "product_create" } else { "product_restock" };
    audit::record(
        &state.pool,
        None,
        action,
        "products",
        serde_json::json!({ "product_id": product.id, "stock": product.stock }),
    )
    .await;

    let message = if inserted {
        "Product created"
    } else {
        "Product stock incremented"
    };
    Ok((
        ApiResponse::success(message, product, Some(Meta::empty())),
        inserted,
    ))
}

pub async fn update_product(
    state: &AppState,
    id: i32,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    if payload.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    if payload.price.is_some_and(|p| p < 0) {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if payload.stock.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest("stock must not be negative".into()));
    }

    let product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET name = COALESCE($2, name),
            price = COALESCE($3, price),
            stock = COALESCE($4, stock),
            category = COALESCE($5, category)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.price)
    .bind(payload.stock)
    .bind(payload.category)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "Updated",
        product,
        Some(Meta::empty()),
    ))
}

/// Deleting an unknown id succeeds with an empty list.
pub async fn delete_product(state: &AppState, id: i32) -> AppResult<ApiResponse<Vec<Product>>> {
    let deleted = sqlx::query_as::<_, Product>("DELETE FROM products WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_all(&state.pool)
        .await?;

    let meta = Meta::total_only(deleted.len());
    Ok(ApiResponse::success("Deleted", deleted, Some(meta)))
}
