use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::{
    audit,
    dto::users::{UpdateUserRequest, UserList},
    entity::users::{Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{User, UserRecord},
    response::{ApiResponse, Meta},
    routes::params::UserListQuery,
    services::auth_service::{normalize_email, validate_email, validate_password},
    state::AppState,
};

pub async fn list_users(
    state: &AppState,
    query: UserListQuery,
) -> AppResult<ApiResponse<UserList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(role) = query.role.as_ref().filter(|r| !r.is_empty()) {
        condition = condition.add(UserCol::Role.eq(role.clone()));
    }

    let finder = Users::find().filter(condition).order_by_asc(UserCol::Id);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_user(state: &AppState, id: i32) -> AppResult<ApiResponse<User>> {
    let user = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(User::from)
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("User", user, Some(Meta::empty())))
}

pub async fn current_user(state: &AppState, auth: &AuthUser) -> AppResult<ApiResponse<User>> {
    get_user(state, auth.user_id).await
}

/// Users may edit or delete their own account; admins may act on any.
pub fn ensure_can_modify(auth: &AuthUser, id: i32) -> AppResult<()> {
    if auth.is_admin() || auth.user_id == id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not allowed to modify this user".into()))
    }
}

/// Partial update. A new password gets a fresh salt. Only admins can
/// change a role.
pub async fn update_user(
    state: &AppState,
    auth: &AuthUser,
    id: i32,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_can_modify(auth, id)?;
    if payload.role.is_some() && !auth.is_admin() {
        return Err(AppError::Forbidden("Only admins can change roles".into()));
    }

    let email = payload.email.as_deref().map(normalize_email);
    if let Some(email) = email.as_deref() {
        validate_email(email)?;
    }
    if payload.role.as_deref().is_some_and(|r| r.trim().is_empty()) {
        return Err(AppError::BadRequest("role must not be empty".into()));
    }

    let (hash, salt) = match payload.password {
        Some(password) => {
            validate_password(&password)?;
            let hashed = state.kdf.hash_blocking(password).await?;
            (Some(hashed.hash), Some(hashed.salt))
        }
        None => (None, None),
    };

    let record = sqlx::query_as::<_, UserRecord>(
        r#"
        UPDATE users
        SET email = COALESCE($2, email),
            name = COALESCE($3, name),
            role = COALESCE($4, role),
            hashed_password = COALESCE($5, hashed_password),
            salt = COALESCE($6, salt)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(email)
    .bind(payload.name)
    .bind(payload.role)
    .bind(hash)
    .bind(salt)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "User updated",
        record.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_user(
    state: &AppState,
    auth: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<Vec<User>>> {
    ensure_can_modify(auth, id)?;
    let deleted: Vec<User> =
        sqlx::query_as::<_, UserRecord>("DELETE FROM users WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_all(&state.pool)
            .await?
            .into_iter()
            .map(User::from)
            .collect();

    if !deleted.is_empty() {
        audit::record(
            &state.pool,
            Some(auth.user_id),
            "user_delete",
            "users",
            serde_json::json!({ "user_id": id }),
        )
        .await;
    }

    let meta = Meta::total_only(deleted.len());
    Ok(ApiResponse::success("Deleted", deleted, Some(meta)))
}
