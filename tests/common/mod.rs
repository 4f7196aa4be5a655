// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use shop_challenge::config::Config;
use shop_challenge::db::{FirestoreDb, MemoryDb};
use shop_challenge::middleware::auth::create_jwt;
use shop_challenge::models::{Shop, User, Voucher};
use shop_challenge::routes::create_router;
use shop_challenge::services::ShopDirectory;
use shop_challenge::AppState;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

// One degree of latitude is ~111.195 km at R = 6371 km.
#[allow(dead_code)]
pub const KM_PER_DEGREE: f64 = 111.19492664455873;

/// Reference position the test shops are laid out around.
#[allow(dead_code)]
pub const ORIGIN: (f64, f64) = (16.0, 108.0);

/// Shop IDs in the test directory, by distance due north of [`ORIGIN`].
#[allow(dead_code)]
pub mod shops {
    /// 0.3 km
    pub const CAFE: u64 = 1;
    /// 0.1 km
    pub const BAKERY: u64 = 2;
    /// 2.0 km
    pub const MARKET: u64 = 3;
    /// 5.0 km
    pub const HARBOR: u64 = 4;
    /// No known location
    pub const POPUP: u64 = 5;
}

fn shop_north(shop_id: u64, name: &str, km: f64) -> Shop {
    Shop {
        shop_id,
        name: name.to_string(),
        address: Some(format!("{} Test Street", shop_id)),
        lat: Some(ORIGIN.0 + km / KM_PER_DEGREE),
        lon: Some(ORIGIN.1),
        rating: Some(4.0),
    }
}

/// The directory behind [`create_test_app`].
#[allow(dead_code)]
pub fn test_directory() -> ShopDirectory {
    ShopDirectory::from_shops(vec![
        shop_north(shops::CAFE, "Corner Cafe", 0.3),
        shop_north(shops::BAKERY, "Sunrise Bakery", 0.1),
        shop_north(shops::MARKET, "Central Market", 2.0),
        shop_north(shops::HARBOR, "Harbor Books", 5.0),
        Shop {
            shop_id: shops::POPUP,
            name: "Pop-up Stall".to_string(),
            address: None,
            lat: None,
            lon: None,
            rating: None,
        },
    ])
    .expect("test directory")
}

/// Create a test app over an in-memory store and the test directory.
/// Returns the router, the shared state, and the store for direct setup.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>, MemoryDb) {
    create_test_app_with_directory(test_directory())
}

/// Create a test app with a custom shop directory.
#[allow(dead_code)]
pub fn create_test_app_with_directory(directory: ShopDirectory) -> (Router, Arc<AppState>, MemoryDb) {
    let config = Config::test_default();
    let db = MemoryDb::new();
    let state = Arc::new(AppState::new(config, Arc::new(db.clone()), directory));

    (create_router(state.clone()), state, db)
}

/// Create a test JWT token.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: u64, signing_key: &[u8]) -> String {
    create_jwt(user_id, signing_key).expect("token")
}

/// Build a catalog voucher.
#[allow(dead_code)]
pub fn voucher(voucher_id: u64, code: &str, point_cost: u64) -> Voucher {
    Voucher {
        voucher_id,
        code: code.to_string(),
        description: format!("{} voucher", code),
        point_cost,
        image_url: None,
    }
}

/// Store a user with the given balance.
#[allow(dead_code)]
pub async fn give_points(db: &MemoryDb, user_id: u64, points: u64) {
    let mut user = User::new(user_id);
    user.points = Some(points);
    db.upsert_user(user).await;
}

#[allow(dead_code)]
pub fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn post_form(uri: &str, token: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// A `multipart/form-data` POST, as a browser sends a `FormData` object.
#[allow(dead_code)]
pub fn post_multipart(uri: &str, token: &str, fields: &[(&str, String)]) -> Request<Body> {
    const BOUNDARY: &str = "----shop-challenge-test";

    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Form body for a check-in `km` kilometres due north of [`ORIGIN`].
#[allow(dead_code)]
pub fn checkin_north_of_origin(km: f64) -> String {
    format!(
        "user_lat={}&user_lon={}",
        ORIGIN.0 + km / KM_PER_DEGREE,
        ORIGIN.1
    )
}

/// Send a request and decode the JSON body (`Null` when empty).
#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}
