// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shop directory loading and nearby-shop API tests.

use axum::http::StatusCode;
use shop_challenge::geodistance::Coordinates;
use shop_challenge::models::Shop;
use shop_challenge::services::ShopDirectory;

mod common;
use common::{get, send, KM_PER_DEGREE, ORIGIN};

fn bundled_directory() -> ShopDirectory {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/shops.geojson");
    ShopDirectory::load_from_file(path).expect("bundled shop data should load")
}

#[test]
fn test_bundled_shop_data() {
    let directory = bundled_directory();

    assert_eq!(directory.shops().len(), 7);

    let market = directory.get_shop(101).expect("shop 101");
    assert_eq!(market.name, "Han Market Coffee");
    assert!(market.has_location());

    let stall = directory.get_shop(107).expect("shop 107");
    assert!(!stall.has_location());
}

#[test]
fn test_bundled_nearby_ordering() {
    let directory = bundled_directory();
    let han_market = Coordinates {
        lat: 16.0678,
        lon: 108.2208,
    };

    let nearby = directory.nearby(&han_market, None);
    assert_eq!(nearby[0].0.shop_id, 101);
    assert!(nearby[0].1 < 0.01);

    // The unlocated stall sorts last
    let (last, distance) = nearby.last().unwrap();
    assert_eq!(last.shop_id, 107);
    assert!(distance.is_infinite());

    // Hoi An is ~25 km away
    let within_5km = directory.nearby(&han_market, Some(5.0));
    assert!(within_5km.iter().all(|(shop, _)| shop.shop_id != 106));
    assert!(within_5km.iter().all(|(shop, _)| shop.shop_id != 107));
}

fn grid_directory(count: u64) -> ShopDirectory {
    let shops = (1..=count)
        .map(|id| Shop {
            shop_id: id,
            name: format!("Shop {}", id),
            address: None,
            lat: Some(ORIGIN.0 + id as f64 / KM_PER_DEGREE),
            lon: Some(ORIGIN.1),
            rating: None,
        })
        .collect();
    ShopDirectory::from_shops(shops).unwrap()
}

fn nearby_uri(query: &str) -> String {
    format!(
        "/api/shops/nearby?lat={}&lon={}{}",
        ORIGIN.0, ORIGIN.1, query
    )
}

#[tokio::test]
async fn test_nearby_pagination() {
    let (app, state, _) = common::create_test_app_with_directory(grid_directory(30));
    let token = common::create_test_jwt(1, &state.config.jwt_signing_key);

    let (status, body) = send(&app, get(&nearby_uri(""), &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 30);
    assert_eq!(body["total_pages"], 3);
    assert_eq!(body["current_page"], 1);
    assert_eq!(body["shops"].as_array().unwrap().len(), 12);
    assert_eq!(body["shops"][0]["shop_id"], 1);
    assert_eq!(body["shops"][0]["distance_km"], 1.0);

    let (_, body) = send(&app, get(&nearby_uri("&page=3"), &token)).await;
    assert_eq!(body["current_page"], 3);
    assert_eq!(body["shops"].as_array().unwrap().len(), 6);
    assert_eq!(body["shops"][0]["shop_id"], 25);

    let (_, body) = send(&app, get(&nearby_uri("&page=9"), &token)).await;
    assert!(body["shops"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_nearby_radius_filter() {
    let (app, state, _) = common::create_test_app_with_directory(grid_directory(30));
    let token = common::create_test_jwt(1, &state.config.jwt_signing_key);

    let (status, body) = send(&app, get(&nearby_uri("&radius_km=5.5"), &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 5);
    assert_eq!(body["total_pages"], 1);
}

#[tokio::test]
async fn test_nearby_excludes_unlocated_with_radius() {
    let (app, state, _) = common::create_test_app();
    let token = common::create_test_jwt(1, &state.config.jwt_signing_key);

    let (_, all) = send(&app, get(&nearby_uri(""), &token)).await;
    assert_eq!(all["total_count"], 5);
    assert_eq!(all["shops"][4]["shop_id"], common::shops::POPUP);
    assert!(all["shops"][4]["distance_km"].is_null());

    let (_, within) = send(&app, get(&nearby_uri("&radius_km=100"), &token)).await;
    assert_eq!(within["total_count"], 4);
}

#[tokio::test]
async fn test_nearby_rejects_bad_input() {
    let (app, state, _) = common::create_test_app();
    let token = common::create_test_jwt(1, &state.config.jwt_signing_key);

    let (status, _) = send(&app, get("/api/shops/nearby", &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get(&nearby_uri("&radius_km=-1"), &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
