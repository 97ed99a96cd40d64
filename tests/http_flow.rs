mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use shopfront_api::{routes::create_app_router, state::AppState};
use tower::ServiceExt;

async fn send(state: &AppState, request: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
    let app = create_app_router().with_state(state.clone());
    let response = app.oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

fn get(uri: &str) -> anyhow::Result<Request<Body>> {
    Ok(Request::get(uri).body(Body::empty())?)
}

fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> anyhow::Result<Request<Body>> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    Ok(builder.body(Body::from(body.to_string()))?)
}

async fn login(state: &AppState, email: &str, password: &str) -> anyhow::Result<String> {
    let (status, body) = send(
        state,
        json_request("POST", "/login", json!({ "email": email, "password": password }), None)?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(body["data"]["token"].as_str().expect("token").to_string())
}

#[tokio::test]
async fn unknown_path_gets_json_404() -> anyhow::Result<()> {
    let state = common::unreachable_state()?;

    let (status, body) = send(&state, get("/nowhere/at/all")?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found");
    assert_eq!(body["data"]["path"], "/nowhere/at/all");
    Ok(())
}

#[tokio::test]
async fn readiness_reports_an_unreachable_database() -> anyhow::Result<()> {
    let state = common::unreachable_state()?;

    let (status, body) = send(&state, get("/health/ready")?).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["data"]["status"], "unavailable");

    let (status, body) = send(&state, get("/health")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn readiness_is_ok_with_a_database() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let (status, body) = send(&state, get("/health/ready")?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn product_create_answers_201_then_200() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let payload = json!({ "name": common::unique("kettle"), "price": 4_000 });

    let (status, body) = send(&state, json_request("POST", "/products", payload.clone(), None)?).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["stock"], 1);

    let (status, body) = send(&state, json_request("POST", "/products", payload, None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock"], 2);
    Ok(())
}

#[tokio::test]
async fn missing_rows_and_invalid_input_use_the_error_envelope() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let (status, body) = send(&state, get("/products/2147483647")?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found");
    assert_eq!(body["data"]["error"], "not_found");

    let (status, body) = send(
        &state,
        json_request("POST", "/products", json!({ "name": "   ", "price": 1 }), None)?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["error"], "bad_request");
    Ok(())
}

#[tokio::test]
async fn checkout_accepts_an_empty_or_json_body() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (user_id, _) = common::register(&state, "password123").await?;
    let product = common::product_with_stock(&state, 800, 10).await?;

    let mut carts = Vec::new();
    for _ in 0..2 {
        let (status, body) = send(
            &state,
            json_request("POST", "/carts", json!({ "userId": user_id }), None)?,
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
        let cart_id = body["data"]["id"].as_i64().expect("cart id");

        let (status, _) = send(
            &state,
            json_request(
                "POST",
                &format!("/carts/{cart_id}/items"),
                json!({ "productId": product, "quantity": 2 }),
                None,
            )?,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        carts.push(cart_id);
    }

    let bare = Request::post(format!("/carts/{}/checkout", carts[0])).body(Body::empty())?;
    let (status, body) = send(&state, bare).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["order"]["total_amount"], 1_600);
    assert_eq!(body["data"]["order"]["shipping_address"], Value::Null);

    let (status, body) = send(
        &state,
        json_request(
            "POST",
            &format!("/carts/{}/checkout", carts[1]),
            json!({ "shippingAddress": "2 Side St", "payment_method": "card" }),
            None,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["order"]["shipping_address"], "2 Side St");
    assert_eq!(body["data"]["order"]["payment_method"], "card");

    let (status, body) = send(
        &state,
        json_request(
            "POST",
            &format!("/carts/{}/items", carts[1]),
            json!({ "productId": product, "quantity": 1 }),
            None,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["data"]["error"], "conflict");

    // Lists share one shape: a bare array in `data`.
    let (status, body) = send(&state, get(&format!("/orders?user_id={user_id}"))?).await?;
    assert_eq!(status, StatusCode::OK);
    let orders = body["data"].as_array().expect("orders array");
    assert_eq!(orders.len(), 2);
    Ok(())
}

#[tokio::test]
async fn huge_page_number_returns_an_empty_page() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let (status, body) = send(&state, get(&format!("/products?page={}", i64::MAX))?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn user_changes_need_the_owner_or_an_admin() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let (user_id, email) = common::register(&state, "password123").await?;
    let (other_id, _) = common::register(&state, "password123").await?;
    let uri = format!("/users/{user_id}");

    let (status, body) = send(&state, json_request("PUT", &uri, json!({ "name": "X" }), None)?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["data"]["error"], "unauthorized");

    let token = login(&state, &email, "password123").await?;

    let (status, body) = send(
        &state,
        json_request("PUT", &uri, json!({ "role": "admin" }), Some(&token))?,
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["data"]["error"], "forbidden");

    let (status, _) = send(
        &state,
        json_request("PUT", &format!("/users/{other_id}"), json!({ "name": "X" }), Some(&token))?,
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &state,
        json_request("PUT", &uri, json!({ "name": "Renamed" }), Some(&token))?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Renamed");
    assert_eq!(body["data"]["role"], "customer");

    let delete_other = Request::delete(format!("/users/{other_id}"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())?;
    let (status, _) = send(&state, delete_other).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}
