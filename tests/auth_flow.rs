mod common;

use shopfront_api::{
    dto::auth::{LoginRequest, RegisterRequest},
    error::AppError,
    services::auth_service,
};

const PASSWORD: &str = "correct horse battery";

#[tokio::test]
async fn duplicate_email_is_a_conflict() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (_, email) = common::register(&state, PASSWORD).await?;

    // Case and surrounding whitespace do not make a new address.
    let result = auth_service::register_user(
        &state,
        RegisterRequest {
            email: format!("  {}  ", email.to_uppercase()),
            password: PASSWORD.into(),
            name: None,
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    Ok(())
}

#[tokio::test]
async fn credentials_are_checked_against_the_stored_hash() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (user_id, email) = common::register(&state, PASSWORD).await?;

    let record = auth_service::verify_credentials(&state, &email, PASSWORD).await?;
    assert_eq!(record.id, user_id);

    let wrong = auth_service::verify_credentials(&state, &email, "correct horse battery!").await;
    assert!(matches!(wrong, Err(AppError::InvalidCredentials)));

    let unknown = auth_service::verify_credentials(
        &state,
        &format!("{}@example.com", common::unique("nobody")),
        PASSWORD,
    )
    .await;
    assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
    Ok(())
}

#[tokio::test]
async fn login_issues_a_token_for_the_user() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (user_id, email) = common::register(&state, PASSWORD).await?;

    let resp = auth_service::login_user(
        &state,
        LoginRequest {
            email,
            password: PASSWORD.into(),
        },
    )
    .await?
    .into_data()
    .expect("login data");
    assert_eq!(resp.token_type, "Bearer");
    assert_eq!(resp.user.id, user_id);

    let claims = auth_service::decode_token(common::TEST_SECRET, &resp.token)?;
    assert_eq!(claims.sub, user_id.to_string());
    assert_eq!(claims.role, "customer");
    Ok(())
}
