//! Repository Pattern Implementation
//!
//! # Interview Q&A
//!
//! Q: Repository 패턴이란?
//! A: 데이터 접근 로직을 추상화하는 패턴
//!
//!    장점:
//!    - 비즈니스 로직과 데이터 접근 분리
//!    - 테스트 시 Mock 구현 쉬움
//!    - DB 교체 시 영향 최소화
//!
//! Q: 이 프로젝트에서 trait 추상화를 실제로 사용하는 이유는?
//! A: 정산/출금 도메인 로직(상태 머신, 잔액 불변식)을 PostgreSQL 없이
//!    검증해야 하기 때문. 서비스 레이어는 `LedgerStore`에만 의존하고,
//!    프로덕션은 `Database`(PgPool), 테스트는 in-memory mock을 주입한다.
//!
//! Q: create_payout_with_hold가 trait 메서드인 이유는?
//! A: "잔액 재확인 + insert"는 하나의 원자적 연산이어야 함.
//!    원자성의 구현 수단(트랜잭션 + row lock vs 단일 mutex)은 스토어의
//!    책임이므로 경계를 여기에 둔다.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ApiError;
use crate::types::{EnrollmentStatus, PaymentStatus, PayoutStatus};

use super::models::{Enrollment, Lab, Payout, RevenueSummary, User};

/// 정산 코어의 영속성 인터페이스
///
/// 프로덕션 구현은 db/mod.rs의 `Database`.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // ============ Users / Labs ============

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, ApiError>;

    async fn find_lab(&self, id: Uuid) -> Result<Option<Lab>, ApiError>;

    /// 가격/수수료 설정 변경. 기존 수강 신청의 동결된 몫은 건드리지 않는다.
    async fn update_lab_pricing(
        &self,
        lab_id: Uuid,
        price: i64,
        fee_percentage: i64,
        lppm_fee_percentage: i64,
    ) -> Result<(), ApiError>;

    // ============ Enrollments ============

    /// (user_id, lab_id) 중복이면 `DuplicateEnrollment`.
    /// unique 인덱스 위반을 도메인 에러로 매핑 — 동시 요청에도 안전.
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), ApiError>;

    async fn find_enrollment(&self, id: Uuid) -> Result<Option<Enrollment>, ApiError>;

    /// PENDING 상태인 행에 한해 전이. 전이된 행이 없으면 false
    /// (동시 요청이 먼저 전이시킨 경우 포함).
    async fn transition_enrollment(
        &self,
        id: Uuid,
        payment_status: PaymentStatus,
        status: EnrollmentStatus,
    ) -> Result<bool, ApiError>;

    /// 결제 검증 대기 목록 (관리자용, 페이지네이션)
    async fn list_pending_enrollments(
        &self,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Enrollment>, i64), ApiError>;

    // ============ Payouts / Balance ============

    /// 강사가 번 금액: PAID 수강 신청의 instructor_share 합
    /// (labs.instructor_id FK 기준)
    async fn earned_total(&self, instructor_id: Uuid) -> Result<i64, ApiError>;

    /// hold 중이거나 지급된 금액: status != REJECTED 출금 요청의 amount 합
    async fn held_total(&self, user_id: Uuid) -> Result<i64, ApiError>;

    /// 잔액 재확인과 insert를 원자적으로 수행.
    /// 잔액 부족이면 `InsufficientBalance`, 음수 잔액 발견 시
    /// `DataIntegrityError`.
    async fn create_payout_with_hold(
        &self,
        user_id: Uuid,
        amount: i64,
        bank_details: &str,
    ) -> Result<Payout, ApiError>;

    async fn find_payout(&self, id: Uuid) -> Result<Option<Payout>, ApiError>;

    /// PENDING 상태인 행에 한해 전이. proof/notes는 전달된 경우에만 저장.
    async fn transition_payout(
        &self,
        id: Uuid,
        status: PayoutStatus,
        proof: Option<&str>,
        notes: Option<&str>,
    ) -> Result<bool, ApiError>;

    async fn list_payouts(
        &self,
        user_id: Option<Uuid>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Payout>, i64), ApiError>;

    /// PAID 수강 신청 기준 매출 집계. instructor_id가 주어지면
    /// 해당 강사의 실험실로 한정.
    async fn revenue_summary(
        &self,
        instructor_id: Option<Uuid>,
    ) -> Result<RevenueSummary, ApiError>;
}

// PostgreSQL 구현은 db/mod.rs의 Database 구조체에 있음
// 테스트용 in-memory 구현:
