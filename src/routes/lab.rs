//! Lab Pricing Endpoints
//!
//! 가격/수수료 설정의 관리자 edge. `fee + lppm <= 100` 검증은
//! 여기(설정 시점)에서 일어난다 — 정산 산술은 이미 검증된 설정을
//! 전제하되, `RevenueSplit::compute`가 한 번 더 방어한다.
//!
//! 설정 변경은 기존 수강 신청의 동결된 몫에 소급 적용되지 않는다.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::LedgerStore;
use crate::error::ApiError;
use crate::services::{require_admin, validate_fee_config};
use crate::AppState;

// ============ Request/Response Types ============

/// 가격/수수료 설정 요청 (관리자)
#[derive(Debug, Deserialize)]
pub struct PricingRequest {
    pub actor_id: Uuid,
    /// 0 = 무료
    pub price: i64,
    pub fee_percentage: i64,
    pub lppm_fee_percentage: i64,
}

#[derive(Debug, Serialize)]
pub struct PricingResponse {
    pub lab_id: Uuid,
    pub price: i64,
    pub fee_percentage: i64,
    pub lppm_fee_percentage: i64,
    /// 잔여 플랫폼 퍼센트 (참고용)
    pub platform_percentage: i64,
}

// ============ Handlers ============

/// PUT /api/lab/:id/pricing
///
/// 실험실 가격/수수료 설정 변경 (관리자 전용)
pub async fn update_pricing(
    State(state): State<AppState>,
    Path(lab_id): Path<Uuid>,
    Json(req): Json<PricingRequest>,
) -> Result<Json<PricingResponse>, ApiError> {
    require_admin(state.store.as_ref(), req.actor_id).await?;

    if req.price < 0 {
        return Err(ApiError::ValidationError(format!(
            "price must be non-negative, got {}",
            req.price
        )));
    }
    validate_fee_config(req.fee_percentage, req.lppm_fee_percentage)?;

    state
        .store
        .update_lab_pricing(lab_id, req.price, req.fee_percentage, req.lppm_fee_percentage)
        .await?;

    tracing::info!(
        lab_id = %lab_id,
        price = req.price,
        fee = req.fee_percentage,
        lppm = req.lppm_fee_percentage,
        "lab pricing updated"
    );

    Ok(Json(PricingResponse {
        lab_id,
        price: req.price,
        fee_percentage: req.fee_percentage,
        lppm_fee_percentage: req.lppm_fee_percentage,
        platform_percentage: 100 - req.fee_percentage - req.lppm_fee_percentage,
    }))
}
