// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Challenge and voucher routes.
//!
//! The auth middleware is applied in routes/mod.rs for these routes.

use crate::error::{AppError, Result};
use crate::geodistance::{round_km, Coordinates};
use crate::middleware::auth::AuthUser;
use crate::services::{CheckinOutcome, RemoveOutcome, TargetView};
use crate::time_utils::format_redeemed_date;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Multipart, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/challenge/add", post(add_target))
        .route("/challenge/remove", post(remove_target))
        .route("/challenge/current", get(list_current))
        .route("/challenge/checkin", post(checkin))
        .route("/challenge/vouchers", get(list_vouchers))
        .route("/challenge/redeem", post(redeem_voucher))
        .route("/challenge/my-vouchers", get(my_vouchers))
}

fn bad_body(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

// ─── Targets ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ShopRequest {
    pub shop_id: Option<u64>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AddTargetResponse {
    pub success: bool,
    pub message: String,
    pub current_count: usize,
}

async fn add_target(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<ShopRequest>, JsonRejection>,
) -> Result<Json<AddTargetResponse>> {
    let Json(request) = body.map_err(bad_body)?;
    let shop_id = request
        .shop_id
        .ok_or_else(|| AppError::BadRequest("Missing shop ID".to_string()))?;

    let current_count = state
        .challenge_service
        .add_target(user.user_id, shop_id)
        .await?;

    let message = match state.directory.get_shop(shop_id) {
        Some(shop) => format!("Added {} to your challenges", shop.name),
        None => "Added shop to your challenges".to_string(),
    };

    Ok(Json(AddTargetResponse {
        success: true,
        message,
        current_count,
    }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

async fn remove_target(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<ShopRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>> {
    let Json(request) = body.map_err(bad_body)?;
    let shop_id = request
        .shop_id
        .ok_or_else(|| AppError::BadRequest("Missing shop ID".to_string()))?;

    let message = match state
        .challenge_service
        .remove_target(user.user_id, shop_id)
        .await?
    {
        RemoveOutcome::Removed { remaining } => {
            format!("Removed from your challenges ({} remaining)", remaining)
        }
        RemoveOutcome::SessionClosed => {
            "Removed from your challenges. Your challenge list is now empty".to_string()
        }
    };

    Ok(Json(SuccessResponse {
        success: true,
        message,
    }))
}

// ─── Current challenge ───────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PositionQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TargetShop {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub shop_id: u64,
    pub name: String,
    pub address: Option<String>,
    /// Kilometres, two decimals. `null` when the shop has no location.
    pub distance_km: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl From<TargetView> for TargetShop {
    fn from(view: TargetView) -> Self {
        Self {
            shop_id: view.shop.shop_id,
            name: view.shop.name,
            address: view.shop.address,
            distance_km: round_km(view.distance_km),
            lat: view.shop.lat,
            lon: view.shop.lon,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CurrentChallengeResponse {
    pub has_session: bool,
    pub count: usize,
    pub shops: Vec<TargetShop>,
}

async fn list_current(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<PositionQuery>,
) -> Result<Json<CurrentChallengeResponse>> {
    // A partial or unreadable position just means no distances.
    let position = Coordinates::parse_optional(query.lat.as_deref(), query.lon.as_deref())
        .unwrap_or_else(|e| {
            tracing::debug!(
                user_id = user.user_id,
                error = %e,
                "Ignoring position for target list"
            );
            None
        });

    let response = match state
        .challenge_service
        .list_current(user.user_id, position)
        .await?
    {
        Some(targets) => CurrentChallengeResponse {
            has_session: true,
            count: targets.len(),
            shops: targets.into_iter().map(TargetShop::from).collect(),
        },
        None => CurrentChallengeResponse {
            has_session: false,
            count: 0,
            shops: Vec::new(),
        },
    };

    Ok(Json(response))
}

// ─── Check-in ────────────────────────────────────────────────

/// Check-in position, posted as a urlencoded or multipart form.
#[derive(Debug, Default, Deserialize)]
pub struct CheckinForm {
    pub user_lat: Option<String>,
    pub user_lon: Option<String>,
}

impl CheckinForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;

            match name.as_str() {
                "user_lat" => form.user_lat = Some(value),
                "user_lon" => form.user_lon = Some(value),
                _ => {}
            }
        }

        Ok(form)
    }
}

impl<S> FromRequest<S> for CheckinForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Self::from_multipart(multipart).await;
        }

        let Form(form) = Form::<Self>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        Ok(form)
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CheckinResponse {
    pub success: bool,
    pub message: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points: u64,
}

/// Body of a check-in that did not reach any target.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CheckinMissResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_shop: Option<String>,
}

async fn checkin(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    form: CheckinForm,
) -> Result<Response> {
    let position = Coordinates::parse(form.user_lat.as_deref(), form.user_lon.as_deref())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let outcome = state.challenge_service.checkin(user.user_id, position).await?;

    let response = match outcome {
        CheckinOutcome::CheckedIn {
            shop_name,
            points_awarded,
            challenge_completed,
            ..
        } => {
            let mut message = format!(
                "Checked in at {}! You earned {} points",
                shop_name, points_awarded
            );
            if challenge_completed {
                message.push_str(". Congratulations, you completed your challenge!");
            }
            Json(CheckinResponse {
                success: true,
                message,
                points: points_awarded,
            })
            .into_response()
        }
        CheckinOutcome::NotYetArrived {
            nearest_shop,
            distance_km,
        } => {
            let distance = round_km(distance_km);
            (
                StatusCode::BAD_REQUEST,
                Json(CheckinMissResponse {
                    error: format!(
                        "You are not close enough to any challenge shop. {} is {:.2} km away",
                        nearest_shop, distance_km
                    ),
                    distance,
                    nearest_shop: Some(nearest_shop),
                }),
            )
                .into_response()
        }
        CheckinOutcome::NoShopData => (
            StatusCode::BAD_REQUEST,
            Json(CheckinMissResponse {
                error: "Location data is unavailable for your challenge shops".to_string(),
                distance: None,
                nearest_shop: None,
            }),
        )
            .into_response(),
    };

    Ok(response)
}

// ─── Vouchers ────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VoucherInfo {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub code: String,
    pub description: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub point_cost: u64,
    pub image_url: Option<String>,
}

impl From<crate::models::Voucher> for VoucherInfo {
    fn from(voucher: crate::models::Voucher) -> Self {
        Self {
            id: voucher.voucher_id,
            code: voucher.code,
            description: voucher.description,
            point_cost: voucher.point_cost,
            image_url: voucher.image_url,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VoucherListResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_points: u64,
    pub vouchers: Vec<VoucherInfo>,
}

async fn list_vouchers(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<VoucherListResponse>> {
    let catalog = state.voucher_service.catalog(user.user_id).await?;

    Ok(Json(VoucherListResponse {
        user_points: catalog.user_points,
        vouchers: catalog.vouchers.into_iter().map(VoucherInfo::from).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub voucher_id: Option<u64>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RedeemResponse {
    pub success: bool,
    pub message: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub new_points: u64,
}

async fn redeem_voucher(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<RedeemRequest>, JsonRejection>,
) -> Result<Json<RedeemResponse>> {
    let Json(request) = body.map_err(bad_body)?;
    let voucher_id = request
        .voucher_id
        .ok_or_else(|| AppError::BadRequest("No voucher selected".to_string()))?;

    let redemption = state
        .voucher_service
        .redeem(user.user_id, voucher_id)
        .await?;

    Ok(Json(RedeemResponse {
        success: true,
        message: format!("Redeemed voucher {}", redemption.voucher.code),
        new_points: redemption.new_points,
    }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OwnedVoucherResponse {
    pub transaction_id: String,
    pub status: String,
    pub redeemed_date: String,
    pub voucher_info: VoucherInfo,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MyVouchersResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<OwnedVoucherResponse>,
}

async fn my_vouchers(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MyVouchersResponse>> {
    let owned = state.voucher_service.list_owned(user.user_id).await?;

    let data: Vec<OwnedVoucherResponse> = owned
        .into_iter()
        .map(|owned| OwnedVoucherResponse {
            transaction_id: owned.record.transaction_id,
            status: owned.record.status.as_str().to_string(),
            redeemed_date: format_redeemed_date(owned.record.created_at),
            voucher_info: owned.voucher.into(),
        })
        .collect();

    Ok(Json(MyVouchersResponse {
        success: true,
        count: data.len(),
        data,
    }))
}
