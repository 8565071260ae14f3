mod common;

use axum::http::StatusCode;

use common::{TestApp, TestRequest, restaurant, sydney};
use eatery::prelude::GeoPoint;

const BONDI_BEACH: &str = "-33.8908,151.2767";

fn point_of(row: &serde_json::Value) -> GeoPoint {
    let coordinates = row["location"]["coordinates"].as_array().unwrap();
    GeoPoint::new(coordinates[0].as_f64().unwrap(), coordinates[1].as_f64().unwrap())
}

#[tokio::test]
async fn test_within_radius_km_and_mi() {
    let app = TestApp::new();
    app.seed(&sydney()).await;
    app.seed(&[restaurant("Parramatta Thai", "Parramatta", &["Thai"], 151.0036, -33.8150)]).await;
    let center = GeoPoint::new(151.2767, -33.8908);

    let res = app
        .send(TestRequest::get(&format!("/api/restaurants/within/2/km/near/{BONDI_BEACH}")))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["count"], 3);
    for row in res.items() {
        assert_eq!(row["suburb"].as_str().unwrap().to_lowercase(), "bondi");
        assert!(center.central_angle(&point_of(row)) * 6378.16 <= 2.0);
    }

    let res = app
        .send(TestRequest::get(&format!("/api/restaurants/within/10/mi/near/{BONDI_BEACH}")))
        .await;
    assert_eq!(res.body["count"], 4);
    for row in res.items() {
        assert!(center.central_angle(&point_of(row)) * 3963.2 <= 10.0);
    }

    let res = app
        .send(TestRequest::get(&format!("/api/restaurants/within/0.01/km/near/{BONDI_BEACH}")))
        .await;
    assert_eq!(res.body["count"], 0);
}

#[tokio::test]
async fn test_invalid_geo_parameters_halt_with_bad_request() {
    let app = TestApp::new();
    app.seed(&sydney()).await;

    for uri in [
        format!("/api/restaurants/within/2/miles/near/{BONDI_BEACH}"),
        "/api/restaurants/within/2/km/near/-33.8908".to_string(),
        "/api/restaurants/within/2/km/near/north,south".to_string(),
        format!("/api/restaurants/within/far/km/near/{BONDI_BEACH}"),
        format!("/api/restaurants/distances-from/{BONDI_BEACH}/unit/m"),
        "/api/restaurants/distances-from/151.2767/unit/km".to_string(),
    ] {
        let res = app.send(TestRequest::get(&uri)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(res.body["status"], "fail");
        assert!(res.body.get("data").is_none());
    }
}

#[tokio::test]
async fn test_distances_are_sorted_and_scale_with_unit() {
    let app = TestApp::new();
    app.seed(&sydney()).await;

    let km = app
        .send(TestRequest::get(&format!("/api/restaurants/distances-from/{BONDI_BEACH}/unit/km")))
        .await;
    let mi = app
        .send(TestRequest::get(&format!("/api/restaurants/distances-from/{BONDI_BEACH}/unit/mi")))
        .await;
    assert_eq!(km.status, StatusCode::OK);
    assert_eq!(km.body["count"], 4);

    let km_distances: Vec<f64> = km.items().iter().map(|r| r["distance"].as_f64().unwrap()).collect();
    let mi_distances: Vec<f64> = mi.items().iter().map(|r| r["distance"].as_f64().unwrap()).collect();

    assert!(km_distances.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(km.items()[3]["name"], "Manly Pavilion");

    for (k, m) in km_distances.iter().zip(&mi_distances) {
        assert!((k - m * 1.609344).abs() <= 1e-6 * k.max(1.0), "{k} km vs {m} mi");
    }

    let keys: Vec<&String> = km.items()[0].as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 3);
    for key in ["id", "name", "distance"] {
        assert!(km.items()[0].get(key).is_some());
    }
}
