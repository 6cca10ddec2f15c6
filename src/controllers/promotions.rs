use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{AdminUser, ApiJson};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/admin/promotions", get(list_promotions).post(create_promotion))
}

// POST /api/admin/promotions
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreatePromotionRequest {
    #[validate(length(min = 1, max = 64, message = "code must be 1-64 characters"))]
    code: String,
    #[validate(range(min = 1, max = 100, message = "discountPercent must be between 1 and 100"))]
    discount_percent: i32,
    valid_from: NaiveDate,
    valid_to: NaiveDate,
}

async fn create_promotion(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ApiJson(req): ApiJson<CreatePromotionRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate()?;
    let id = state
        .services
        .promotions
        .create_promotion(&req.code, req.discount_percent, req.valid_from, req.valid_to)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "promotionId": id })),
    ))
}

// GET /api/admin/promotions
async fn list_promotions(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    let promotions = state.services.promotions.all_promotions().await?;
    Ok(Json(json!({ "success": true, "promotions": promotions })))
}
