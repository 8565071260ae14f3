mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{TestApp, TestRequest, sydney};
use eatery::{
    auth::{Role, TokenVerifier},
    config::AuthConfig,
};

#[tokio::test]
async fn test_expired_and_foreign_tokens_are_unauthorized() {
    let app = TestApp::new();
    let seeded = sydney();
    app.seed(&seeded).await;
    let uri = format!("/api/restaurants/{}", seeded[0].id);

    let expired = TokenVerifier::new(&AuthConfig {
        jwt_secret: "test_secret_key_for_testing_only".to_string(),
        issuer: "eatery-tests".to_string(),
        token_ttl_minutes: -10,
    })
    .unwrap()
    .issue(Uuid::new_v4(), Role::Admin)
    .unwrap();

    let res = app.send(TestRequest::delete(&uri).bearer(&expired)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["message"], "Your token has expired! Please log in again.");

    let foreign = TokenVerifier::new(&AuthConfig {
        issuer: "someone-else".to_string(),
        ..AuthConfig::default()
    })
    .unwrap()
    .issue(Uuid::new_v4(), Role::Admin)
    .unwrap();

    let res = app.send(TestRequest::delete(&uri).bearer(&foreign)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_owner_may_update_and_delete() {
    let app = TestApp::new();
    let seeded = sydney();
    app.seed(&seeded).await;
    let uri = format!("/api/restaurants/{}", seeded[0].id);
    let owner = app.token(Role::Owner);

    let res = app
        .send(TestRequest::patch(&uri).bearer(&owner).json(json!({ "description": "Pool-side dining" })))
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.send(TestRequest::delete(&uri).bearer(&owner)).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_reads_are_public() {
    let app = TestApp::new();
    app.seed(&sydney()).await;

    for uri in [
        "/api/restaurants",
        "/api/restaurants/stats-by-suburb",
        "/api/restaurants/distances-from/-33.8908,151.2767/unit/km",
    ] {
        assert_eq!(app.send(TestRequest::get(uri)).await.status, StatusCode::OK, "{uri}");
    }
}
