mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{TestApp, TestRequest, sydney};
use eatery::{
    auth::Role,
    error::ApiError,
    indexes::ensure_indexes,
    models::review::{NewReview, Review},
    prelude::DocumentStoreError,
};

#[tokio::test]
async fn test_reviews_update_ratings_and_populate_detail() {
    let app = TestApp::new();
    let seeded = sydney();
    app.seed(&seeded).await;
    let id = seeded[0].id;
    let reviews_uri = format!("/api/restaurants/{id}/reviews");

    for (rating, text) in [(5, "Best view in Sydney"), (4, "Pricey but worth it")] {
        let res = app
            .send(
                TestRequest::post(&reviews_uri)
                    .bearer(&app.token(Role::User))
                    .json(json!({ "review": text, "rating": rating })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.data()["restaurant"], id.to_string());
    }

    let res = app.send(TestRequest::get(&format!("/api/restaurants/{id}"))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["ratingsQuantity"], 2);
    assert_eq!(res.data()["ratingsAverage"], 4.5);

    let reviews = res.data()["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 2);
    let mut keys: Vec<&String> = reviews[0].as_object().unwrap().keys().collect();
    keys.sort();
    assert_eq!(keys, vec!["id", "rating", "review"]);

    let res = app.send(TestRequest::get(&reviews_uri)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["count"], 2);
}

#[tokio::test]
async fn test_one_review_per_user() {
    let app = TestApp::new();
    let seeded = sydney();
    app.seed(&seeded).await;
    let uri = format!("/api/restaurants/{}/reviews", seeded[2].id);
    let token = app.token_for(Uuid::new_v4(), Role::User);

    let first = app
        .send(TestRequest::post(&uri).bearer(&token).json(json!({ "review": "Great larb", "rating": 4 })))
        .await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = app
        .send(TestRequest::post(&uri).bearer(&token).json(json!({ "review": "Changed my mind", "rating": 2 })))
        .await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_eq!(second.body["message"], "You have already reviewed this restaurant");
}

#[tokio::test]
async fn test_review_validation_and_roles() {
    let app = TestApp::new();
    let seeded = sydney();
    app.seed(&seeded).await;
    let uri = format!("/api/restaurants/{}/reviews", seeded[0].id);

    let res = app
        .send(TestRequest::post(&uri).bearer(&app.token(Role::Staff)).json(json!({ "review": "ok", "rating": 3 })))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .send(TestRequest::post(&uri).bearer(&app.token(Role::User)).json(json!({ "review": "ok", "rating": 6 })))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let missing = format!("/api/restaurants/{}/reviews", Uuid::new_v4());
    let res = app
        .send(TestRequest::post(&missing).bearer(&app.token(Role::User)).json(json!({ "review": "ok", "rating": 3 })))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.send(TestRequest::get(&missing)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_a_restaurant_removes_its_reviews() {
    let app = TestApp::new();
    let seeded = sydney();
    app.seed(&seeded).await;
    let id = seeded[3].id;

    let res = app
        .send(
            TestRequest::post(&format!("/api/restaurants/{id}/reviews"))
                .bearer(&app.token(Role::User))
                .json(json!({ "review": "Lovely on a sunny day", "rating": 5 })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);

    let res = app
        .send(TestRequest::delete(&format!("/api/restaurants/{id}")).bearer(&app.token(Role::Admin)))
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let remaining = app
        .state
        .store
        .typed_collection::<Review>()
        .count(None)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn test_unique_index_rejects_a_second_review_with_bad_request() {
    let app = TestApp::new();
    ensure_indexes(&app.state.store).await.unwrap();
    let seeded = sydney();
    app.seed(&seeded).await;
    let (restaurant, user) = (seeded[1].id, Uuid::new_v4());

    let res = app
        .send(
            TestRequest::post(&format!("/api/restaurants/{restaurant}/reviews"))
                .bearer(&app.token_for(user, Role::User))
                .json(json!({ "review": "Worth the view", "rating": 5 })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);

    // Written past the handler's own check, as a racing request would be.
    let racing = NewReview { review: "Second thoughts".to_string(), rating: 2 }.into_review(restaurant, user);
    let err = app
        .state
        .store
        .typed_collection::<Review>()
        .insert(vec![racing])
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::DocumentAlreadyExists(_, _)));
    assert_eq!(ApiError::from(err).status_code(), StatusCode::BAD_REQUEST);

    let res = app.send(TestRequest::get(&format!("/api/restaurants/{restaurant}/reviews"))).await;
    assert_eq!(res.body["count"], 1);
}
