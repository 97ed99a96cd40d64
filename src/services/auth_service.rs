use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::{
    audit,
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
    entity::users::{Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    models::{DEFAULT_ROLE, User, UserRecord},
    password::HashedPassword,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 8;
const TOKEN_TTL_HOURS: i64 = 24;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> AppResult<()> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest("email is not valid".into()))
    }
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Create an account. The email's uniqueness is checked by the insert
/// itself, so two concurrent registrations cannot both succeed.
pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let RegisterRequest {
        email,
        password,
        name,
    } = payload;
    let email = normalize_email(&email);
    validate_email(&email)?;
    validate_password(&password)?;

    let HashedPassword { hash, salt } = state.kdf.hash_blocking(password).await?;

    let record: Option<UserRecord> = sqlx::query_as(
        r#"
        INSERT INTO users (email, name, hashed_password, salt, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(email.as_str())
    .bind(name)
    .bind(hash)
    .bind(salt)
    .bind(DEFAULT_ROLE)
    .fetch_optional(&state.pool)
    .await?;

    let Some(record) = record else {
        return Err(AppError::Conflict("Email is already taken".to_string()));
    };

    tracing::info!(user_id = record.id, "user registered");
    audit::record(
        &state.pool,
        Some(record.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": record.id }),
    )
    .await;

    Ok(ApiResponse::success("User created", record.into(), None))
}

/// Check an email/password pair. Unknown emails and wrong passwords both end
/// in `InvalidCredentials` after the same amount of hashing work; datastore
/// faults come back as server errors.
pub async fn verify_credentials(
    state: &AppState,
    email: &str,
    password: &str,
) -> AppResult<UserRecord> {
    let email = normalize_email(email);
    let record: Option<UserRecord> = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(&state.orm)
        .await?
        .map(UserRecord::from);

    let stored = record.as_ref().map(|r| HashedPassword {
        hash: r.hashed_password.clone(),
        salt: r.salt.clone(),
    });
    let matched = state
        .kdf
        .verify_blocking(password.to_string(), stored)
        .await?;

    match record {
        Some(record) if matched => Ok(record),
        _ => Err(AppError::InvalidCredentials),
    }
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let record = match verify_credentials(state, &payload.email, &payload.password).await {
        Ok(record) => record,
        Err(AppError::InvalidCredentials) => {
            tracing::info!("login rejected");
            return Err(AppError::InvalidCredentials);
        }
        Err(err) => return Err(err),
    };

    let token = issue_token(&state.jwt_secret, &record)?;

    audit::record(
        &state.pool,
        Some(record.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": record.id }),
    )
    .await;

    let resp = LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        user: record.into(),
    };

    Ok(ApiResponse::success(
        "Logged in",
        resp,
        Some(Meta::empty()),
    ))
}

pub fn issue_token(secret: &str, user: &UserRecord) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(TOKEN_TTL_HOURS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn decode_token(secret: &str, token: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> UserRecord {
        UserRecord {
            id: 7,
            email: "ada@example.com".into(),
            name: Some("Ada".into()),
            hashed_password: vec![0; 32],
            salt: vec![0; 16],
            role: "customer".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_round_trips_subject_and_role() {
        let token = issue_token("test-secret", &record()).unwrap();
        let claims = decode_token("test-secret", &token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, "customer");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token("test-secret", &record()).unwrap();
        let err = decode_token("another-secret", &token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn email_validation() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("ada.example.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ada@").is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }
}
