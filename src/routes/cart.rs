use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};

use crate::{
    dto::cart::{AddCartItemRequest, CartList, CartWithItems, CheckoutRequest, CheckoutSummary, CreateCartRequest},
    error::AppResult,
    models::{Cart, CartItem},
    response::ApiResponse,
    routes::params::CartListQuery,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_carts).post(create_cart))
        .route("/{id}", get(get_cart).delete(delete_cart))
        .route("/{id}/items", post(add_item))
        .route("/{id}/items/{item_id}", delete(remove_item))
        .route("/{id}/checkout", post(checkout))
}

#[utoipa::path(
    get,
    path = "/carts",
    params(
        ("user_id" = Option<i32>, Query, description = "Only carts owned by this user"),
        ("status" = Option<String>, Query, description = "open or checked_out"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "List carts", body = ApiResponse<CartList>)
    ),
    tag = "Carts"
)]
pub async fn list_carts(
    State(state): State<AppState>,
    Query(query): Query<CartListQuery>,
) -> AppResult<Json<ApiResponse<CartList>>> {
    let resp = cart_service::list_carts(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/carts/{id}",
    params(
        ("id" = i32, Path, description = "Cart ID")
    ),
    responses(
        (status = 200, description = "Cart with its line items", body = ApiResponse<CartWithItems>),
        (status = 404, description = "Cart not found"),
    ),
    tag = "Carts"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<CartWithItems>>> {
    let resp = cart_service::get_cart(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/carts",
    request_body = CreateCartRequest,
    responses(
        (status = 201, description = "Cart created", body = ApiResponse<Cart>),
        (status = 400, description = "Unknown user"),
    ),
    tag = "Carts"
)]
pub async fn create_cart(
    State(state): State<AppState>,
    Json(payload): Json<CreateCartRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Cart>>)> {
    let resp = cart_service::create_cart(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/carts/{id}",
    params(
        ("id" = i32, Path, description = "Cart ID")
    ),
    responses(
        (status = 200, description = "Deleted rows, empty when nothing matched", body = ApiResponse<Vec<Cart>>),
    ),
    tag = "Carts"
)]
pub async fn delete_cart(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<Cart>>>> {
    let resp = cart_service::delete_cart(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/carts/{id}/items",
    params(
        ("id" = i32, Path, description = "Cart ID")
    ),
    request_body = AddCartItemRequest,
    responses(
        (status = 200, description = "Line added or quantity increased", body = ApiResponse<CartItem>),
        (status = 400, description = "Invalid quantity or unknown product"),
        (status = 404, description = "Cart not found"),
        (status = 409, description = "Cart already checked out"),
    ),
    tag = "Carts"
)]
pub async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<AddCartItemRequest>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    let resp = cart_service::add_item(&state, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/carts/{id}/items/{item_id}",
    params(
        ("id" = i32, Path, description = "Cart ID"),
        ("item_id" = i32, Path, description = "Cart item ID")
    ),
    responses(
        (status = 200, description = "Deleted rows, empty when nothing matched", body = ApiResponse<Vec<CartItem>>),
        (status = 409, description = "Cart already checked out"),
    ),
    tag = "Carts"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(i32, i32)>,
) -> AppResult<Json<ApiResponse<Vec<CartItem>>>> {
    let resp = cart_service::remove_item(&state, id, item_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/carts/{id}/checkout",
    params(
        ("id" = i32, Path, description = "Cart ID")
    ),
    request_body(content = CheckoutRequest, description = "Optional shipping and payment details"),
    responses(
        (status = 200, description = "Order created from the cart", body = ApiResponse<CheckoutSummary>),
        (status = 400, description = "Empty cart or insufficient stock"),
        (status = 404, description = "Cart not found"),
        (status = 409, description = "Cart already checked out"),
    ),
    tag = "Carts"
)]
pub async fn checkout(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    payload: Option<Json<CheckoutRequest>>,
) -> AppResult<Json<ApiResponse<CheckoutSummary>>> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let resp = cart_service::checkout(&state, id, payload).await?;
    Ok(Json(resp))
}
