//! Database Models
//!
//! Row types for the settlement core: users, labs, enrollments, payouts.
//! Status columns are stored as TEXT and parsed into `types` enums at the
//! domain boundary.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// 사용자 (학생 / 강사 / 관리자)
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,

    /// 표시 이름 — 정산 매칭에는 사용하지 않음 (labs.instructor_id FK 사용)
    pub name: String,

    /// ADMIN | LECTURER | STUDENT
    pub role: String,

    pub created_at: DateTime<Utc>,
}

/// 가상 실험실 (강의 단위)
#[derive(Debug, Clone, FromRow)]
pub struct Lab {
    pub id: Uuid,

    pub title: String,

    /// 수강 가격 (루피아, 0 = 무료)
    pub price: i64,

    /// 강사 몫 퍼센트 (0~100)
    pub fee_percentage: i64,

    /// LPPM(기관) 몫 퍼센트 (0~100)
    /// fee_percentage + lppm_fee_percentage <= 100 은 설정 변경 시점에 검증됨
    pub lppm_fee_percentage: i64,

    /// 담당 강사 FK
    pub instructor_id: Uuid,

    pub created_at: DateTime<Utc>,
}

/// 수강 신청
///
/// (user_id, lab_id)당 1건 — 복합 unique 인덱스로 보장.
/// 몫 3개는 생성 시점에 동결되며 이후 실험실 수수료 설정이 바뀌어도
/// 절대 재계산하지 않는다.
#[derive(Debug, Clone, FromRow)]
pub struct Enrollment {
    pub id: Uuid,

    pub user_id: Uuid,

    pub lab_id: Uuid,

    /// 접근 상태: PENDING | ACTIVE | REJECTED
    pub status: String,

    /// 결제 상태: PENDING | PAID | REJECTED
    pub payment_status: String,

    /// 결제 증빙 (URL 등, 무료 실험실은 NULL)
    pub payment_proof: Option<String>,

    /// 동결된 3분할 몫 — 합은 항상 결제 시점의 price와 정확히 일치
    pub instructor_share: i64,
    pub lppm_share: i64,
    pub platform_share: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 출금 요청
///
/// PENDING 상태도 잔액 계산에서 차감(hold)된다.
#[derive(Debug, Clone, FromRow)]
pub struct Payout {
    pub id: Uuid,

    pub user_id: Uuid,

    /// 요청 금액 (> 0)
    pub amount: i64,

    /// PENDING | PAID | REJECTED
    pub status: String,

    /// 계좌 정보 (은행명/계좌번호/예금주)
    pub bank_details: String,

    /// 이체 증빙 (승인 시 저장)
    pub proof: Option<String>,

    /// 거절 사유
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 플랫폼 매출 집계 (PAID 수강 신청 기준)
#[derive(Debug, Clone, Default, FromRow)]
pub struct RevenueSummary {
    pub total_gross: i64,
    pub total_instructor: i64,
    pub total_lppm: i64,
    pub total_platform: i64,
}
