//! Settlement Engine
//!
//! 유료 실험실 수강 신청 1건을 강사/LPPM/플랫폼 3분할 몫으로 변환하고,
//! 무료가 아닌 실험실의 접근을 결제 검증 워크플로우 뒤에 둔다.
//!
//! # Design Decision
//!
//! 몫은 수강 신청 생성 시점에 계산해 **동결**한다. 이후 실험실의
//! 수수료 설정이 바뀌어도 기존 신청의 몫은 재계산하지 않는다.
//! live join으로 "단순화"하면 과거 출금 금액이 소급 변경되는
//! 회계 버그가 된다.
//!
//! 반올림 처리: floor-then-residual.
//! 강사/LPPM 몫은 내림(floor), 플랫폼 몫은 잔여(residual)로 계산 —
//! 세 값의 합이 어떤 입력에서도 price와 정확히 일치한다.
//! 셋 다 독립적으로 내림하면 1루피아가 반올림으로 증발할 수 있음.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::db::{Enrollment, Lab, LedgerStore};
use crate::error::ApiError;
use crate::types::{Decision, EnrollmentStatus, PaymentStatus};

use super::require_admin;

/// 수수료 퍼센트 설정 검증
///
/// 설정 변경 edge(관리자 가격 설정)와 분할 계산 양쪽에서 호출된다.
/// 합이 100을 넘는 설정은 음수 플랫폼 몫을 만들므로 거부 —
/// clamp하지 않는다.
pub fn validate_fee_config(fee_percentage: i64, lppm_fee_percentage: i64) -> Result<(), ApiError> {
    if !(0..=100).contains(&fee_percentage) {
        return Err(ApiError::ValidationError(format!(
            "fee_percentage must be in 0..=100, got {}",
            fee_percentage
        )));
    }
    if !(0..=100).contains(&lppm_fee_percentage) {
        return Err(ApiError::ValidationError(format!(
            "lppm_fee_percentage must be in 0..=100, got {}",
            lppm_fee_percentage
        )));
    }
    if fee_percentage + lppm_fee_percentage > 100 {
        return Err(ApiError::ValidationError(format!(
            "fee_percentage + lppm_fee_percentage must not exceed 100, got {}",
            fee_percentage + lppm_fee_percentage
        )));
    }
    Ok(())
}

/// 동결된 3분할 몫
///
/// 불변식: instructor_share + lppm_share + platform_share == price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevenueSplit {
    pub instructor_share: i64,
    pub lppm_share: i64,
    pub platform_share: i64,
}

impl RevenueSplit {
    /// 무료 실험실: 모든 몫 0
    pub fn free() -> Self {
        Self {
            instructor_share: 0,
            lppm_share: 0,
            platform_share: 0,
        }
    }

    /// price를 퍼센트 설정에 따라 정확히 분할
    pub fn compute(
        price: i64,
        fee_percentage: i64,
        lppm_fee_percentage: i64,
    ) -> Result<Self, ApiError> {
        if price < 0 {
            return Err(ApiError::ValidationError(format!(
                "price must be non-negative, got {}",
                price
            )));
        }
        validate_fee_config(fee_percentage, lppm_fee_percentage)?;

        // i128 중간값 — price * 100이 i64를 넘는 입력에도 안전
        let instructor_share = (price as i128 * fee_percentage as i128 / 100) as i64;
        let lppm_share = (price as i128 * lppm_fee_percentage as i128 / 100) as i64;
        let platform_share = price - instructor_share - lppm_share;

        Ok(Self {
            instructor_share,
            lppm_share,
            platform_share,
        })
    }
}

/// 수강 신청 정산 엔진
pub struct SettlementEngine {
    store: Arc<dyn LedgerStore>,
}

impl SettlementEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// 수강 신청 생성
    ///
    /// - 무료 실험실: 즉시 ACTIVE/PAID, 몫 전부 0, 증빙 불필요
    /// - 유료 실험실: 증빙 필수(`MissingProof`), PENDING/PENDING으로 생성.
    ///   몫은 이 시점에 계산·동결되지만 paymentStatus가 PAID가 되기
    ///   전까지는 강사 잔액에 반영되지 않는다.
    /// - 동일 (user, lab) 재신청은 `DuplicateEnrollment`
    pub async fn enroll(
        &self,
        user_id: Uuid,
        lab_id: Uuid,
        payment_proof: Option<String>,
    ) -> Result<Enrollment, ApiError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;
        let lab = self
            .store
            .find_lab(lab_id)
            .await?
            .ok_or(ApiError::LabNotFound)?;

        let enrollment = if lab.price == 0 {
            Self::build_enrollment(
                user_id,
                &lab,
                EnrollmentStatus::Active,
                PaymentStatus::Paid,
                None,
                RevenueSplit::free(),
            )
        } else {
            let proof = payment_proof
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .ok_or(ApiError::MissingProof)?
                .to_string();

            let split =
                RevenueSplit::compute(lab.price, lab.fee_percentage, lab.lppm_fee_percentage)?;

            Self::build_enrollment(
                user_id,
                &lab,
                EnrollmentStatus::Pending,
                PaymentStatus::Pending,
                Some(proof),
                split,
            )
        };

        self.store.insert_enrollment(&enrollment).await?;

        tracing::info!(
            enrollment_id = %enrollment.id,
            lab_id = %lab_id,
            price = lab.price,
            payment_status = %enrollment.payment_status,
            "enrollment created"
        );

        Ok(enrollment)
    }

    /// 결제 검증 (관리자 전용)
    ///
    /// APPROVE: paymentStatus → PAID, status → ACTIVE — 동결된 몫이
    /// 이 시점부터 강사 잔액에 산입된다.
    /// REJECT: 양쪽 모두 REJECTED — 몫은 저장된 채로 영구 비활성
    /// (잔액 쿼리의 PAID 필터가 배제, 값을 0으로 덮지 않음).
    ///
    /// 이미 종결된 신청에 대한 재검증은 `InvalidStateTransition`.
    pub async fn verify_payment(
        &self,
        actor_id: Uuid,
        enrollment_id: Uuid,
        decision: Decision,
    ) -> Result<Enrollment, ApiError> {
        require_admin(self.store.as_ref(), actor_id).await?;

        let enrollment = self
            .store
            .find_enrollment(enrollment_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Enrollment".to_string()))?;

        let current = enrollment
            .payment_status
            .parse::<PaymentStatus>()
            .map_err(ApiError::DataIntegrityError)?;
        if current.is_terminal() {
            return Err(ApiError::InvalidStateTransition(format!(
                "enrollment {} is already {}",
                enrollment_id, enrollment.payment_status
            )));
        }

        let (payment_status, status) = match decision {
            Decision::Approve => (PaymentStatus::Paid, EnrollmentStatus::Active),
            Decision::Reject => (PaymentStatus::Rejected, EnrollmentStatus::Rejected),
        };

        let transitioned = self
            .store
            .transition_enrollment(enrollment_id, payment_status, status)
            .await?;
        if !transitioned {
            // 사전 조회와 update 사이에 다른 관리자가 먼저 종결시킨 경우
            return Err(ApiError::InvalidStateTransition(format!(
                "enrollment {} was resolved concurrently",
                enrollment_id
            )));
        }

        tracing::info!(
            enrollment_id = %enrollment_id,
            ?decision,
            "payment verified"
        );

        self.store
            .find_enrollment(enrollment_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Enrollment".to_string()))
    }

    /// 결제 검증 대기 목록 (관리자 전용)
    pub async fn pending_enrollments(
        &self,
        actor_id: Uuid,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Enrollment>, i64), ApiError> {
        require_admin(self.store.as_ref(), actor_id).await?;
        self.store.list_pending_enrollments(page, limit).await
    }

    fn build_enrollment(
        user_id: Uuid,
        lab: &Lab,
        status: EnrollmentStatus,
        payment_status: PaymentStatus,
        payment_proof: Option<String>,
        split: RevenueSplit,
    ) -> Enrollment {
        let now = Utc::now();
        Enrollment {
            id: Uuid::new_v4(),
            user_id,
            lab_id: lab.id,
            status: status.to_string(),
            payment_status: payment_status.to_string(),
            payment_proof,
            instructor_share: split.instructor_share,
            lppm_share: split.lppm_share,
            platform_share: split.platform_share,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::mock::MockLedgerStore;
    use crate::types::Role;

    // ============ RevenueSplit (순수 계산) ============

    #[test]
    fn test_split_reference_scenario() {
        // price=100000, fee=50%, lppm=10% → 50000 / 10000 / 40000
        let split = RevenueSplit::compute(100_000, 50, 10).unwrap();
        assert_eq!(split.instructor_share, 50_000);
        assert_eq!(split.lppm_share, 10_000);
        assert_eq!(split.platform_share, 40_000);
    }

    #[test]
    fn test_split_residual_absorbs_rounding() {
        // 101 * 33 / 100 = 33.33 → 33, 잔여가 플랫폼으로
        let split = RevenueSplit::compute(101, 33, 33).unwrap();
        assert_eq!(split.instructor_share, 33);
        assert_eq!(split.lppm_share, 33);
        assert_eq!(split.platform_share, 35);
    }

    #[test]
    fn test_split_partitions_price_exactly() {
        // 반올림 누수 없음: 어떤 유효 설정에서도 합 == price
        for price in [1, 3, 99, 101, 12_345, 100_000, 999_999_999] {
            for (fee, lppm) in [(0, 0), (1, 1), (33, 33), (50, 10), (70, 30), (100, 0)] {
                let split = RevenueSplit::compute(price, fee, lppm).unwrap();
                assert_eq!(
                    split.instructor_share + split.lppm_share + split.platform_share,
                    price,
                    "price={} fee={} lppm={}",
                    price,
                    fee,
                    lppm
                );
                assert!(split.platform_share >= 0);
            }
        }
    }

    #[test]
    fn test_split_rejects_bad_config() {
        assert!(RevenueSplit::compute(-1, 50, 10).is_err());
        assert!(RevenueSplit::compute(1000, 101, 0).is_err());
        assert!(RevenueSplit::compute(1000, 0, -1).is_err());
        // 합 > 100이면 음수 플랫폼 몫 — clamp 대신 거부
        assert!(RevenueSplit::compute(1000, 60, 50).is_err());
        assert!(validate_fee_config(60, 50).is_err());
        assert!(validate_fee_config(70, 30).is_ok());
    }

    #[test]
    fn test_split_free() {
        let split = RevenueSplit::free();
        assert_eq!(split.instructor_share, 0);
        assert_eq!(split.lppm_share, 0);
        assert_eq!(split.platform_share, 0);
    }

    // ============ 수강 신청 플로우 ============

    fn engine() -> (SettlementEngine, Arc<MockLedgerStore>) {
        let store = Arc::new(MockLedgerStore::new());
        (SettlementEngine::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_free_lab_enrolls_immediately() {
        let (engine, store) = engine();
        let lecturer = store.add_user("Dr. Sari", Role::Lecturer);
        let student = store.add_user("Budi", Role::Student);
        let lab = store.add_lab("Physics I", 0, 50, 10, lecturer);

        let enrollment = engine.enroll(student, lab, None).await.unwrap();
        assert_eq!(enrollment.status, "ACTIVE");
        assert_eq!(enrollment.payment_status, "PAID");
        assert_eq!(enrollment.instructor_share, 0);
        assert_eq!(enrollment.lppm_share, 0);
        assert_eq!(enrollment.platform_share, 0);
    }

    #[tokio::test]
    async fn test_paid_lab_requires_proof() {
        let (engine, store) = engine();
        let lecturer = store.add_user("Dr. Sari", Role::Lecturer);
        let student = store.add_user("Budi", Role::Student);
        let lab = store.add_lab("Chemistry I", 100_000, 50, 10, lecturer);

        let err = engine.enroll(student, lab, None).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingProof));

        // 공백만 있는 증빙도 없는 것으로 취급
        let err = engine
            .enroll(student, lab, Some("   ".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingProof));
    }

    #[tokio::test]
    async fn test_paid_lab_freezes_split_as_pending() {
        let (engine, store) = engine();
        let lecturer = store.add_user("Dr. Sari", Role::Lecturer);
        let student = store.add_user("Budi", Role::Student);
        let lab = store.add_lab("Chemistry I", 100_000, 50, 10, lecturer);

        let enrollment = engine
            .enroll(student, lab, Some("transfer-001.jpg".to_string()))
            .await
            .unwrap();
        assert_eq!(enrollment.status, "PENDING");
        assert_eq!(enrollment.payment_status, "PENDING");
        assert_eq!(enrollment.instructor_share, 50_000);
        assert_eq!(enrollment.lppm_share, 10_000);
        assert_eq!(enrollment.platform_share, 40_000);
    }

    #[tokio::test]
    async fn test_duplicate_enrollment_rejected() {
        let (engine, store) = engine();
        let lecturer = store.add_user("Dr. Sari", Role::Lecturer);
        let student = store.add_user("Budi", Role::Student);
        let lab = store.add_lab("Physics I", 0, 0, 0, lecturer);

        engine.enroll(student, lab, None).await.unwrap();
        let err = engine.enroll(student, lab, None).await.unwrap_err();
        assert!(matches!(err, ApiError::DuplicateEnrollment));
    }

    #[tokio::test]
    async fn test_enroll_unknown_user_or_lab() {
        let (engine, store) = engine();
        let lecturer = store.add_user("Dr. Sari", Role::Lecturer);
        let student = store.add_user("Budi", Role::Student);
        let lab = store.add_lab("Physics I", 0, 0, 0, lecturer);

        let err = engine.enroll(Uuid::new_v4(), lab, None).await.unwrap_err();
        assert!(matches!(err, ApiError::UserNotFound));

        let err = engine
            .enroll(student, Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::LabNotFound));
    }

    #[tokio::test]
    async fn test_verify_payment_approve_and_reject() {
        let (engine, store) = engine();
        let admin = store.add_user("Admin", Role::Admin);
        let lecturer = store.add_user("Dr. Sari", Role::Lecturer);
        let a = store.add_user("Budi", Role::Student);
        let b = store.add_user("Citra", Role::Student);
        let lab = store.add_lab("Chemistry I", 100_000, 50, 10, lecturer);

        let approved = engine
            .enroll(a, lab, Some("proof-a".to_string()))
            .await
            .unwrap();
        let rejected = engine
            .enroll(b, lab, Some("proof-b".to_string()))
            .await
            .unwrap();

        let approved = engine
            .verify_payment(admin, approved.id, Decision::Approve)
            .await
            .unwrap();
        assert_eq!(approved.payment_status, "PAID");
        assert_eq!(approved.status, "ACTIVE");

        let rejected = engine
            .verify_payment(admin, rejected.id, Decision::Reject)
            .await
            .unwrap();
        assert_eq!(rejected.payment_status, "REJECTED");
        assert_eq!(rejected.status, "REJECTED");
        // 거절돼도 동결된 몫은 0으로 덮지 않음 — PAID 필터가 배제
        assert_eq!(rejected.instructor_share, 50_000);
    }

    #[tokio::test]
    async fn test_verify_terminal_enrollment_fails() {
        let (engine, store) = engine();
        let admin = store.add_user("Admin", Role::Admin);
        let lecturer = store.add_user("Dr. Sari", Role::Lecturer);
        let student = store.add_user("Budi", Role::Student);
        let lab = store.add_lab("Chemistry I", 100_000, 50, 10, lecturer);

        let enrollment = engine
            .enroll(student, lab, Some("proof".to_string()))
            .await
            .unwrap();
        engine
            .verify_payment(admin, enrollment.id, Decision::Approve)
            .await
            .unwrap();

        // 종결 상태 재검증 — 승인이든 거절이든 불허
        for decision in [Decision::Approve, Decision::Reject] {
            let err = engine
                .verify_payment(admin, enrollment.id, decision)
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::InvalidStateTransition(_)));
        }
    }

    #[tokio::test]
    async fn test_verify_payment_requires_admin() {
        let (engine, store) = engine();
        let lecturer = store.add_user("Dr. Sari", Role::Lecturer);
        let student = store.add_user("Budi", Role::Student);
        let lab = store.add_lab("Chemistry I", 100_000, 50, 10, lecturer);

        let enrollment = engine
            .enroll(student, lab, Some("proof".to_string()))
            .await
            .unwrap();

        let err = engine
            .verify_payment(student, enrollment.id, Decision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
    }

    #[tokio::test]
    async fn test_shares_frozen_against_fee_change() {
        let (engine, store) = engine();
        let admin = store.add_user("Admin", Role::Admin);
        let lecturer = store.add_user("Dr. Sari", Role::Lecturer);
        let student = store.add_user("Budi", Role::Student);
        let lab = store.add_lab("Chemistry I", 100_000, 50, 10, lecturer);

        let enrollment = engine
            .enroll(student, lab, Some("proof".to_string()))
            .await
            .unwrap();

        // 수수료 설정 변경 후 승인 — 몫은 신청 시점 값 그대로
        store
            .update_lab_pricing(lab, 200_000, 80, 20)
            .await
            .unwrap();
        let approved = engine
            .verify_payment(admin, enrollment.id, Decision::Approve)
            .await
            .unwrap();
        assert_eq!(approved.instructor_share, 50_000);
        assert_eq!(approved.lppm_share, 10_000);
        assert_eq!(approved.platform_share, 40_000);
    }

    #[tokio::test]
    async fn test_pending_queue_is_admin_only() {
        let (engine, store) = engine();
        let admin = store.add_user("Admin", Role::Admin);
        let lecturer = store.add_user("Dr. Sari", Role::Lecturer);
        let student = store.add_user("Budi", Role::Student);
        let lab = store.add_lab("Chemistry I", 100_000, 50, 10, lecturer);

        engine
            .enroll(student, lab, Some("proof".to_string()))
            .await
            .unwrap();

        let (items, total) = engine.pending_enrollments(admin, 0, 20).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items.len(), 1);

        let err = engine
            .pending_enrollments(lecturer, 0, 20)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
    }
}
