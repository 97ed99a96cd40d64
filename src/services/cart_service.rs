use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, FromQueryResult,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, LockType};

use crate::{
    audit,
    dto::cart::{AddCartItemRequest, CartList, CartWithItems, CheckoutRequest, CheckoutSummary, CreateCartRequest},
    entity::{
        cart_items::{self, Column as CartItemCol, Entity as CartItems},
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts},
        orders::ActiveModel as OrderActive,
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    models::{CART_CHECKED_OUT, CART_OPEN, Cart, CartItem, DEFAULT_ORDER_STATUS, Order},
    response::{ApiResponse, Meta},
    routes::params::CartListQuery,
    state::AppState,
};

pub async fn list_carts(
    state: &AppState,
    query: CartListQuery,
) -> AppResult<ApiResponse<CartList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(user_id) = query.user_id {
        condition = condition.add(CartCol::UserId.eq(user_id));
    }
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(CartCol::Status.eq(status.clone()));
    }

    let finder = Carts::find().filter(condition).order_by_asc(CartCol::Id);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Cart::from)
        .collect();

    Ok(ApiResponse::success(
        "Carts",
        CartList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_cart(state: &AppState, id: i32) -> AppResult<ApiResponse<CartWithItems>> {
    let cart = Carts::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(Cart::from)
        .ok_or(AppError::NotFound)?;

    let items = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .order_by_asc(CartItemCol::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(CartItem::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        CartWithItems { cart, items },
        Some(Meta::empty()),
    ))
}

pub async fn create_cart(
    state: &AppState,
    payload: CreateCartRequest,
) -> AppResult<ApiResponse<Cart>> {
    let cart = sqlx::query_as::<_, Cart>(
        "INSERT INTO carts (user_id, status) VALUES ($1, $2) RETURNING *",
    )
    .bind(payload.user_id)
    .bind(CART_OPEN)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success("Cart created", cart, Some(Meta::empty())))
}

pub async fn delete_cart(state: &AppState, id: i32) -> AppResult<ApiResponse<Vec<Cart>>> {
    let deleted = sqlx::query_as::<_, Cart>("DELETE FROM carts WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_all(&state.pool)
        .await?;

    let meta = Meta::total_only(deleted.len());
    Ok(ApiResponse::success("Deleted", deleted, Some(meta)))
}

/// Add a product to an open cart. A product already in the cart has the
/// new quantity added to its line.
///
/// The cart row is share-locked, so a concurrent checkout either finishes
/// first (and this sees `checked_out`) or waits for this insert.
pub async fn add_item(
    state: &AppState,
    cart_id: i32,
    payload: AddCartItemRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let item = sqlx::query_as::<_, CartItem>(
        r#"
        INSERT INTO cart_items (cart_id, product_id, quantity)
        SELECT c.id, $2, $3 FROM carts c WHERE c.id = $1 AND c.status = $4
        FOR SHARE
        ON CONFLICT (cart_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
        RETURNING *
        "#,
    )
    .bind(cart_id)
    .bind(payload.product_id)
    .bind(payload.quantity)
    .bind(CART_OPEN)
    .fetch_optional(&state.pool)
    .await?;

    match item {
        Some(item) => Ok(ApiResponse::success("OK", item, None)),
        None => Err(closed_cart_error(state, cart_id).await?),
    }
}

/// Remove one line from an open cart. An unknown item id yields an empty list.
pub async fn remove_item(
    state: &AppState,
    cart_id: i32,
    item_id: i32,
) -> AppResult<ApiResponse<Vec<CartItem>>> {
    let deleted = sqlx::query_as::<_, CartItem>(
        r#"
        DELETE FROM cart_items ci
        WHERE ci.id = $2
          AND ci.cart_id IN (SELECT id FROM carts WHERE id = $1 AND status = $3 FOR SHARE)
        RETURNING ci.*
        "#,
    )
    .bind(cart_id)
    .bind(item_id)
    .bind(CART_OPEN)
    .fetch_all(&state.pool)
    .await?;

    if deleted.is_empty() {
        let status: Option<(String,)> = sqlx::query_as("SELECT status FROM carts WHERE id = $1")
            .bind(cart_id)
            .fetch_optional(&state.pool)
            .await?;
        if matches!(status, Some((ref s,)) if s != CART_OPEN) {
            return Err(AppError::Conflict("cart is already checked out".into()));
        }
    }

    let meta = Meta::total_only(deleted.len());
    Ok(ApiResponse::success("Removed from cart", deleted, Some(meta)))
}

/// Turn an open cart into a pending order in one transaction: the order row
/// is created, product stock is reduced by each line's quantity, and the cart
/// is marked checked out. Its lines stay attached as the order's contents.
pub async fn checkout(
    state: &AppState,
    cart_id: i32,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutSummary>> {
    let txn = state.orm.begin().await?;

    let cart = Carts::find_by_id(cart_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if cart.status != CART_OPEN {
        return Err(AppError::Conflict("cart is already checked out".into()));
    }

    let lines = locked_lines(&txn, cart.id).await?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let mut total_amount: i64 = 0;
    for line in &lines {
        if line.stock < line.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for product {}",
                line.product_id
            )));
        }
        total_amount = line
            .price
            .checked_mul(i64::from(line.quantity))
            .and_then(|amount| total_amount.checked_add(amount))
            .ok_or_else(|| AppError::BadRequest("order total is too large".into()))?;
    }

    let order = OrderActive {
        id: NotSet,
        user_id: Set(cart.user_id),
        cart_id: Set(Some(cart.id)),
        status: Set(DEFAULT_ORDER_STATUS.into()),
        total_amount: Set(total_amount),
        shipping_address: Set(payload.shipping_address),
        payment_method: Set(payload.payment_method),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for line in &lines {
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(line.quantity))
            .filter(ProdCol::Id.eq(line.product_id))
            .exec(&txn)
            .await?;
    }

    let user_id = cart.user_id;
    let mut active: CartActive = cart.into();
    active.status = Set(CART_CHECKED_OUT.into());
    active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(cart_id, order_id = order.id, total_amount, "cart checked out");
    audit::record(
        &state.pool,
        Some(user_id),
        "checkout",
        "orders",
        serde_json::json!({ "order_id": order.id, "cart_id": cart_id }),
    )
    .await;

    let items = lines.into_iter().map(CartItem::from).collect();
    Ok(ApiResponse::success(
        "Checkout success",
        CheckoutSummary {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

#[derive(Debug, FromQueryResult)]
struct CheckoutLine {
    id: i32,
    cart_id: i32,
    product_id: i32,
    quantity: i32,
    created_at: DateTimeWithTimeZone,
    price: i64,
    stock: i32,
}

impl From<CheckoutLine> for CartItem {
    fn from(line: CheckoutLine) -> Self {
        CartItem {
            id: line.id,
            cart_id: line.cart_id,
            product_id: line.product_id,
            quantity: line.quantity,
            created_at: line.created_at.with_timezone(&Utc),
        }
    }
}

// Locks both the cart lines and their product rows until commit.
async fn locked_lines(txn: &DatabaseTransaction, cart_id: i32) -> AppResult<Vec<CheckoutLine>> {
    let lines = CartItems::find()
        .select_only()
        .column(CartItemCol::Id)
        .column(CartItemCol::CartId)
        .column(CartItemCol::ProductId)
        .column(CartItemCol::Quantity)
        .column(CartItemCol::CreatedAt)
        .column(ProdCol::Price)
        .column(ProdCol::Stock)
        .join(JoinType::InnerJoin, cart_items::Relation::Products.def())
        .filter(CartItemCol::CartId.eq(cart_id))
        .order_by_asc(CartItemCol::Id)
        .lock(LockType::Update)
        .into_model::<CheckoutLine>()
        .all(txn)
        .await?;
    Ok(lines)
}

// Explains why a conditional insert into a cart matched nothing.
async fn closed_cart_error(state: &AppState, cart_id: i32) -> AppResult<AppError> {
    let cart = Carts::find_by_id(cart_id).one(&state.orm).await?;
    Ok(match cart {
        None => AppError::NotFound,
        Some(_) => AppError::Conflict("cart is already checked out".into()),
    })
}
