//! Payout Endpoints
//!
//! 강사 잔액 조회와 출금 요청/승인/거절 워크플로우.
//! 잔액은 읽기 시점에 계산되며, PENDING 요청도 즉시 차감(hold)된다.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Payout as DbPayout;
use crate::error::ApiError;
use crate::types::Decision;
use crate::AppState;

use super::enrollment::Pagination;

// ============ Request/Response Types ============

/// 잔액 조회 응답
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub lecturer_id: Uuid,
    /// PAID 수강 신청에서 번 금액
    pub earned: i64,
    /// hold 중이거나 이미 지급된 금액 (REJECTED 제외)
    pub held: i64,
    /// 지금 출금 요청 가능한 금액
    pub available: i64,
}

/// 출금 요청
#[derive(Debug, Deserialize)]
pub struct RequestPayoutRequest {
    pub user_id: Uuid,
    pub amount: i64,
    /// 은행명/계좌번호/예금주
    pub bank_details: String,
}

/// 출금 응답
#[derive(Debug, Serialize)]
pub struct PayoutResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub status: String,
    pub bank_details: String,
    pub proof: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<DbPayout> for PayoutResponse {
    fn from(p: DbPayout) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            amount: p.amount,
            status: p.status,
            bank_details: p.bank_details,
            proof: p.proof,
            notes: p.notes,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

/// 출금 처리 요청 (관리자)
#[derive(Debug, Deserialize)]
pub struct ResolvePayoutRequest {
    pub actor_id: Uuid,
    pub decision: Decision,
    /// 이체 증빙 (승인 시)
    pub proof: Option<String>,
    /// 거절 사유 (거절 시)
    pub notes: Option<String>,
}

/// 출금 목록 쿼리
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: Option<Uuid>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub payouts: Vec<PayoutResponse>,
    pub pagination: Pagination,
}

// ============ Handlers ============

/// GET /api/payout/balance/:lecturer_id
///
/// 강사의 현재 출금 가능 잔액
///
/// # Response
///
/// ```json
/// {
///   "lecturer_id": "…",
///   "earned": 80000,
///   "held": 20000,
///   "available": 60000
/// }
/// ```
pub async fn available_balance(
    State(state): State<AppState>,
    Path(lecturer_id): Path<Uuid>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.ledger.available_balance(lecturer_id).await?;

    Ok(Json(BalanceResponse {
        lecturer_id,
        earned: balance.earned,
        held: balance.held,
        available: balance.available,
    }))
}

/// POST /api/payout
///
/// 출금 요청 (강사 전용). 성공 즉시 금액이 hold된다.
pub async fn request_payout(
    State(state): State<AppState>,
    Json(req): Json<RequestPayoutRequest>,
) -> Result<Json<PayoutResponse>, ApiError> {
    let payout = state
        .ledger
        .request_payout(req.user_id, req.amount, &req.bank_details)
        .await?;

    Ok(Json(payout.into()))
}

/// POST /api/payout/:id/resolve
///
/// 출금 처리 (관리자 전용). APPROVE → PAID, REJECT → REJECTED (hold 해제).
pub async fn resolve_payout(
    State(state): State<AppState>,
    Path(payout_id): Path<Uuid>,
    Json(req): Json<ResolvePayoutRequest>,
) -> Result<Json<PayoutResponse>, ApiError> {
    let payout = state
        .ledger
        .resolve_payout(
            req.actor_id,
            payout_id,
            req.decision,
            req.proof.as_deref(),
            req.notes.as_deref(),
        )
        .await?;

    Ok(Json(payout.into()))
}

/// GET /api/payout/list
///
/// 출금 요청 목록 (페이지네이션, 선택적 사용자 필터)
pub async fn list_payouts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let page = query.page.unwrap_or(0);
    let limit = query.limit.unwrap_or(20).min(100); // 최대 100개

    let (payouts, total) = state.ledger.list_payouts(query.user_id, page, limit).await?;

    Ok(Json(ListResponse {
        payouts: payouts.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}
