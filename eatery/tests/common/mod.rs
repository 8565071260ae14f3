//! Router test harness over the in-memory backend.

#![allow(dead_code)]

use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, SubsecRound, Utc};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use eatery::{
    auth::Role,
    config::AuthConfig,
    memory::InMemoryStore,
    models::restaurant::{Location, Restaurant},
    prelude::GeoPoint,
    routes,
    state::AppState,
    store::DocumentStore,
};

pub struct TestApp {
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let store = DocumentStore::new(InMemoryStore::new());
        let auth = AuthConfig {
            jwt_secret: "test_secret_key_for_testing_only".to_string(),
            issuer: "eatery-tests".to_string(),
            token_ttl_minutes: 15,
        };

        Self { state: AppState::new(store, &auth).expect("valid auth config") }
    }

    pub fn token(&self, role: Role) -> String {
        self.token_for(Uuid::new_v4(), role)
    }

    pub fn token_for(&self, user: Uuid, role: Role) -> String {
        self.state.tokens.issue(user, role).expect("issue token")
    }

    pub async fn seed(&self, restaurants: &[Restaurant]) {
        self.state
            .store
            .typed_collection::<Restaurant>()
            .insert(restaurants.to_vec())
            .await
            .expect("seed restaurants");
    }

    pub async fn send(&self, request: TestRequest) -> TestResponse {
        let mut builder = Request::builder().method(request.method).uri(request.uri);

        for (key, value) in request.headers {
            builder = builder.header(key, value);
        }

        let request = builder
            .body(Body::from(request.body.unwrap_or_default()))
            .expect("build request");

        let response = routes::router(self.state.clone())
            .oneshot(request)
            .await
            .expect("execute request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };

        TestResponse { status, body }
    }
}

pub struct TestRequest {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
    body: Option<String>,
}

impl TestRequest {
    fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_owned(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn patch(uri: &str) -> Self {
        Self::new(Method::PATCH, uri)
    }

    pub fn delete(uri: &str) -> Self {
        Self::new(Method::DELETE, uri)
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.headers.push((header::AUTHORIZATION.as_str().to_owned(), format!("Bearer {token}")));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body.to_string());
        self.headers.push((header::CONTENT_TYPE.as_str().to_owned(), "application/json".to_owned()));
        self
    }
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn items(&self) -> &Vec<Value> {
        self.body["data"].as_array().expect("data array")
    }
}

/// An unreviewed restaurant created now.
pub fn restaurant(name: &str, suburb: &str, cuisine: &[&str], lng: f64, lat: f64) -> Restaurant {
    Restaurant {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        suburb: suburb.to_string(),
        cuisine: cuisine.iter().map(|c| c.to_string()).collect(),
        location: Location::new(GeoPoint::new(lng, lat)),
        ratings_average: 4.5,
        ratings_quantity: 0,
        owner: None,
        created_at: Utc::now().trunc_subsecs(3),
    }
}

/// Sets a restaurant's creation time relative to now.
pub fn created_minutes_ago(mut restaurant: Restaurant, minutes: i64) -> Restaurant {
    restaurant.created_at = (Utc::now() - Duration::minutes(minutes)).trunc_subsecs(3);
    restaurant
}

pub fn rated(mut restaurant: Restaurant, average: f64, quantity: i64) -> Restaurant {
    restaurant.ratings_average = average;
    restaurant.ratings_quantity = quantity;
    restaurant
}

/// Bondi ×3 and Manly ×1, around Sydney's eastern beaches.
pub fn sydney() -> Vec<Restaurant> {
    vec![
        created_minutes_ago(rated(restaurant("Icebergs", "Bondi", &["Italian"], 151.2743, -33.8915), 4.4, 120), 40),
        created_minutes_ago(rated(restaurant("Sean's", "Bondi", &["Modern Australian"], 151.2822, -33.8940), 4.6, 80), 30),
        created_minutes_ago(rated(restaurant("Bondi Thai", "bondi", &["Thai", "Asian"], 151.2700, -33.8900), 3.9, 40), 20),
        created_minutes_ago(rated(restaurant("Manly Pavilion", "Manly", &["Italian"], 151.2870, -33.7990), 4.2, 60), 10),
    ]
}
