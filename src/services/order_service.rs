use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, UpdateOrderRequest},
    entity::orders::{Column as OrderCol, Entity as Orders},
    error::{AppError, AppResult},
    models::{DEFAULT_ORDER_STATUS, ORDER_STATUSES, Order},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

pub async fn list_orders(
    state: &AppState,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(user_id) = query.user_id {
        condition = condition.add(OrderCol::UserId.eq(user_id));
    }
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(state: &AppState, id: i32) -> AppResult<ApiResponse<Order>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(Order::from)
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("OK", order, Some(Meta::empty())))
}

pub async fn create_order(
    state: &AppState,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let status = payload
        .status
        .unwrap_or_else(|| DEFAULT_ORDER_STATUS.to_string());
    validate_order_status(&status)?;
    if payload.total_amount < 0 {
        return Err(AppError::BadRequest("total_amount must not be negative".into()));
    }

    let order = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (user_id, cart_id, status, total_amount, shipping_address, payment_method)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(payload.user_id)
    .bind(payload.cart_id)
    .bind(status)
    .bind(payload.total_amount)
    .bind(payload.shipping_address)
    .bind(payload.payment_method)
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Order created",
        order,
        Some(Meta::empty()),
    ))
}

pub async fn update_order(
    state: &AppState,
    id: i32,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    if let Some(status) = payload.status.as_deref() {
        validate_order_status(status)?;
    }
    if payload.total_amount.is_some_and(|t| t < 0) {
        return Err(AppError::BadRequest("total_amount must not be negative".into()));
    }

    let order = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders
        SET user_id = COALESCE($2, user_id),
            cart_id = COALESCE($3, cart_id),
            status = COALESCE($4, status),
            total_amount = COALESCE($5, total_amount),
            shipping_address = COALESCE($6, shipping_address),
            payment_method = COALESCE($7, payment_method),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.user_id)
    .bind(payload.cart_id)
    .bind(payload.status)
    .bind(payload.total_amount)
    .bind(payload.shipping_address)
    .bind(payload.payment_method)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound)?;

    tracing::debug!(order_id = order.id, status = %order.status, "order updated");
    Ok(ApiResponse::success(
        "Order updated",
        order,
        Some(Meta::empty()),
    ))
}

pub async fn delete_order(state: &AppState, id: i32) -> AppResult<ApiResponse<Vec<Order>>> {
    let deleted = sqlx::query_as::<_, Order>("DELETE FROM orders WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_all(&state.pool)
        .await?;

    let meta = Meta::total_only(deleted.len());
    Ok(ApiResponse::success("Deleted", deleted, Some(meta)))
}

pub fn validate_order_status(status: &str) -> Result<(), AppError> {
    if ORDER_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid order status".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_statuses() {
        for status in ORDER_STATUSES {
            assert!(validate_order_status(status).is_ok());
        }
    }

    #[test]
    fn rejects_unknown_status() {
        let err = validate_order_status("lost-in-transit").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(validate_order_status("PENDING").is_err());
    }
}
