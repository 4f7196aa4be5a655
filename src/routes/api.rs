// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::geodistance::{round_km, Coordinates};
use crate::middleware::auth::AuthUser;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const SHOPS_PER_PAGE: usize = 12;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/shops/nearby", get(get_nearby_shops))
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: u64,
    pub name: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points: u64,
}

/// Get current user profile. Users without a record have no points yet.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = state.db.get_user(user.user_id).await?;

    Ok(Json(UserResponse {
        user_id: user.user_id,
        points: profile.as_ref().map_or(0, |u| u.balance()),
        name: profile.and_then(|u| u.name),
    }))
}

// ─── Nearby Shops ────────────────────────────────────────────

/// Query parameters for nearby shops.
#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub radius_km: Option<f64>,
    /// 1-based page number
    pub page: Option<usize>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NearbyShop {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub shop_id: u64,
    pub name: String,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub distance_km: Option<f64>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NearbyShopsResponse {
    pub shops: Vec<NearbyShop>,
    pub total_count: usize,
    pub current_page: usize,
    pub total_pages: usize,
}

async fn get_nearby_shops(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<NearbyShopsResponse>> {
    let position = Coordinates::parse(query.lat.as_deref(), query.lon.as_deref())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if let Some(radius) = query.radius_km {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(AppError::BadRequest(
                "radius_km must be a positive number".to_string(),
            ));
        }
    }

    let matches = state.directory.nearby(&position, query.radius_km);
    let total_count = matches.len();
    let total_pages = total_count.div_ceil(SHOPS_PER_PAGE);
    let current_page = query.page.unwrap_or(1).max(1);

    let shops = matches
        .into_iter()
        .skip((current_page - 1).saturating_mul(SHOPS_PER_PAGE))
        .take(SHOPS_PER_PAGE)
        .map(|(shop, distance)| NearbyShop {
            shop_id: shop.shop_id,
            name: shop.name.clone(),
            address: shop.address.clone(),
            rating: shop.rating,
            lat: shop.lat,
            lon: shop.lon,
            distance_km: round_km(distance),
        })
        .collect();

    Ok(Json(NearbyShopsResponse {
        shops,
        total_count,
        current_page,
        total_pages,
    }))
}
