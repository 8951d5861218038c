//! Enrollment Endpoints
//!
//! 수강 신청 생성과 결제 검증. 정산 몫은 생성 시점에 동결되어
//! 응답에 그대로 노출된다 (리포팅 뷰가 읽어가는 값과 동일).

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Enrollment as DbEnrollment;
use crate::error::ApiError;
use crate::types::Decision;
use crate::AppState;

// ============ Request/Response Types ============

/// 수강 신청 요청
#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub user_id: Uuid,
    pub lab_id: Uuid,
    /// 결제 증빙 (유료 실험실 필수, 이체 영수증 URL 등)
    pub payment_proof: Option<String>,
}

/// 수강 신청 응답
#[derive(Debug, Serialize)]
pub struct EnrollmentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lab_id: Uuid,
    pub status: String,
    pub payment_status: String,
    /// 결제 증빙 — 관리자 검증 UI가 확인하는 값
    pub payment_proof: Option<String>,
    /// 동결된 3분할 몫 — 합은 항상 신청 시점의 price
    pub instructor_share: i64,
    pub lppm_share: i64,
    pub platform_share: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<DbEnrollment> for EnrollmentResponse {
    fn from(e: DbEnrollment) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            lab_id: e.lab_id,
            status: e.status,
            payment_status: e.payment_status,
            payment_proof: e.payment_proof,
            instructor_share: e.instructor_share,
            lppm_share: e.lppm_share,
            platform_share: e.platform_share,
            created_at: e.created_at.to_rfc3339(),
            updated_at: e.updated_at.to_rfc3339(),
        }
    }
}

/// 결제 검증 요청 (관리자)
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// 행위자 — 명시적 컨텍스트, 세션에서 가져오지 않음
    pub actor_id: Uuid,
    pub decision: Decision,
}

/// 검증 대기 목록 쿼리
#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    pub actor_id: Uuid,
    /// 페이지 (0부터 시작)
    pub page: Option<u32>,
    /// 페이지 크기 (기본 20, 최대 100)
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub enrollments: Vec<EnrollmentResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub has_next: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        // page/limit은 사용자 입력 — u32 곱셈은 page=u32::MAX에서
        // 오버플로우하므로 u64로 넓혀서 계산
        let total = total.max(0) as u64;
        let has_next = (page as u64 + 1) * (limit as u64) < total;
        Self {
            page,
            limit,
            total,
            has_next,
        }
    }
}

// ============ Handlers ============

/// POST /api/enrollment
///
/// 수강 신청 생성
///
/// # Response
///
/// ```json
/// {
///   "id": "…",
///   "status": "PENDING",
///   "payment_status": "PENDING",
///   "instructor_share": 50000,
///   "lppm_share": 10000,
///   "platform_share": 40000
/// }
/// ```
pub async fn enroll(
    State(state): State<AppState>,
    Json(req): Json<EnrollRequest>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let enrollment = state
        .settlement
        .enroll(req.user_id, req.lab_id, req.payment_proof)
        .await?;

    Ok(Json(enrollment.into()))
}

/// POST /api/enrollment/:id/verify
///
/// 결제 검증 (관리자 전용). APPROVE → PAID/ACTIVE, REJECT → REJECTED.
pub async fn verify_payment(
    State(state): State<AppState>,
    Path(enrollment_id): Path<Uuid>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let enrollment = state
        .settlement
        .verify_payment(req.actor_id, enrollment_id, req.decision)
        .await?;

    Ok(Json(enrollment.into()))
}

/// GET /api/enrollment/pending
///
/// 결제 검증 대기 목록 (관리자 전용, 페이지네이션)
pub async fn pending_enrollments(
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<PendingResponse>, ApiError> {
    let page = query.page.unwrap_or(0);
    let limit = query.limit.unwrap_or(20).min(100); // 최대 100개

    let (enrollments, total) = state
        .settlement
        .pending_enrollments(query.actor_id, page, limit)
        .await?;

    Ok(Json(PendingResponse {
        enrollments: enrollments.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_has_next_boundaries() {
        // 총 41건, 페이지 크기 20 → 0·1페이지 뒤에만 다음이 있음
        assert!(Pagination::new(0, 20, 41).has_next);
        assert!(Pagination::new(1, 20, 41).has_next);
        assert!(!Pagination::new(2, 20, 41).has_next);
        // 정확히 나누어떨어지는 경계: 2페이지째가 마지막
        assert!(!Pagination::new(1, 20, 40).has_next);
        assert!(!Pagination::new(0, 20, 0).has_next);
    }

    #[test]
    fn test_pagination_widens_before_multiplying() {
        // page는 사용자 입력 — u32::MAX여도 panic/wrap 없이 계산돼야 함
        let p = Pagination::new(u32::MAX, 20, 100);
        assert!(!p.has_next);
        assert_eq!(p.page, u32::MAX);

        // u32 범위를 넘는 total도 잘리지 않음
        let big = u32::MAX as i64 + 10;
        let p = Pagination::new(0, 20, big);
        assert!(p.has_next);
        assert_eq!(p.total, big as u64);
    }

    #[test]
    fn test_pagination_negative_total_treated_as_empty() {
        let p = Pagination::new(0, 20, -5);
        assert_eq!(p.total, 0);
        assert!(!p.has_next);
    }
}
