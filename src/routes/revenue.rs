//! Revenue Endpoints
//!
//! PAID 수강 신청 기준의 매출 집계. residual 분할 보장 덕분에
//! instructor + lppm + platform 부분합이 gross를 정확히 분할한다.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

// ============ Request/Response Types ============

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// 행위자 — 관리자는 전체, 강사는 본인 실험실만
    pub actor_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub total_gross: i64,
    pub total_instructor: i64,
    pub total_lppm: i64,
    pub total_platform: i64,
}

// ============ Handlers ============

/// GET /api/revenue/summary
///
/// 매출 집계 조회
pub async fn revenue_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let summary = state.ledger.revenue_summary(query.actor_id).await?;

    Ok(Json(SummaryResponse {
        total_gross: summary.total_gross,
        total_instructor: summary.total_instructor,
        total_lppm: summary.total_lppm,
        total_platform: summary.total_platform,
    }))
}
