//! Payout Ledger
//!
//! 강사의 출금 가능 잔액을 읽기 시점에 계산하고, 출금 요청의
//! 요청/승인/거절 상태 머신을 overdraw 없이 운영한다.
//!
//! # Balance Model
//!
//! ```text
//! earned    = Σ instructor_share  (PAID 수강 신청, labs.instructor_id 기준)
//! held      = Σ amount            (status != REJECTED 출금 요청)
//! available = earned - held
//! ```
//!
//! PENDING 출금도 held에 포함 — 요청 즉시 자금을 hold해서
//! 동시 요청으로 인한 이중 인출을 막는 보수적 설계.
//! 거절만이 hold를 해제한다.
//!
//! available이 음수로 계산되면 데이터 무결성 문제다. 불변식이 지켜지는 한
//! 발생할 수 없으므로 clamp하지 않고 에러로 수면 위에 올린다.

use std::sync::Arc;

use uuid::Uuid;

use crate::db::{LedgerStore, Payout, RevenueSummary};
use crate::error::ApiError;
use crate::types::{Decision, PayoutStatus, Role};

use super::{parse_role, require_admin, require_lecturer};

/// 잔액 내역
#[derive(Debug, Clone, Copy)]
pub struct BalanceBreakdown {
    pub earned: i64,
    pub held: i64,
    pub available: i64,
}

impl BalanceBreakdown {
    /// earned/held 합계로부터 잔액 도출. 음수면 무결성 에러.
    pub fn derive(lecturer_id: Uuid, earned: i64, held: i64) -> Result<Self, ApiError> {
        let available = earned - held;
        if available < 0 {
            return Err(ApiError::DataIntegrityError(format!(
                "negative balance for lecturer {}: earned={} held={}",
                lecturer_id, earned, held
            )));
        }
        Ok(Self {
            earned,
            held,
            available,
        })
    }
}

/// 출금 원장 서비스
pub struct PayoutLedger {
    store: Arc<dyn LedgerStore>,
}

impl PayoutLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// 강사의 현재 출금 가능 잔액 (저장하지 않고 매번 계산)
    pub async fn available_balance(&self, lecturer_id: Uuid) -> Result<BalanceBreakdown, ApiError> {
        require_lecturer(self.store.as_ref(), lecturer_id).await?;

        let earned = self.store.earned_total(lecturer_id).await?;
        let held = self.store.held_total(lecturer_id).await?;
        BalanceBreakdown::derive(lecturer_id, earned, held)
    }

    /// 출금 요청 (강사 전용)
    ///
    /// 검증 순서: 금액 → 계좌 정보 → 역할 → 잔액.
    /// 잔액 재확인과 insert는 스토어가 원자적으로 수행하므로
    /// 같은 강사의 동시 요청이 함께 overdraw할 수 없다.
    pub async fn request_payout(
        &self,
        user_id: Uuid,
        amount: i64,
        bank_details: &str,
    ) -> Result<Payout, ApiError> {
        if amount <= 0 {
            return Err(ApiError::InvalidAmount);
        }
        let bank_details = bank_details.trim();
        if bank_details.is_empty() {
            return Err(ApiError::MissingBankDetails);
        }
        require_lecturer(self.store.as_ref(), user_id).await?;

        let payout = self
            .store
            .create_payout_with_hold(user_id, amount, bank_details)
            .await?;

        tracing::info!(
            payout_id = %payout.id,
            user_id = %user_id,
            amount,
            "payout requested (funds held)"
        );

        Ok(payout)
    }

    /// 출금 요청 승인/거절 (관리자 전용)
    ///
    /// APPROVE: PAID + 이체 증빙 저장 — hold가 영구 지출로 확정.
    /// REJECT: REJECTED + 거절 사유 저장 — hold 해제, 잔액 복원.
    /// 종결된 요청의 재처리는 `InvalidStateTransition`.
    pub async fn resolve_payout(
        &self,
        actor_id: Uuid,
        payout_id: Uuid,
        decision: Decision,
        proof: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Payout, ApiError> {
        require_admin(self.store.as_ref(), actor_id).await?;

        let payout = self
            .store
            .find_payout(payout_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Payout".to_string()))?;

        let current = payout
            .status
            .parse::<PayoutStatus>()
            .map_err(ApiError::DataIntegrityError)?;
        if current.is_terminal() {
            return Err(ApiError::InvalidStateTransition(format!(
                "payout {} is already {}",
                payout_id, payout.status
            )));
        }

        let (status, proof, notes) = match decision {
            Decision::Approve => (PayoutStatus::Paid, proof, None),
            Decision::Reject => (PayoutStatus::Rejected, None, notes),
        };

        let transitioned = self
            .store
            .transition_payout(payout_id, status, proof, notes)
            .await?;
        if !transitioned {
            return Err(ApiError::InvalidStateTransition(format!(
                "payout {} was resolved concurrently",
                payout_id
            )));
        }

        tracing::info!(payout_id = %payout_id, ?decision, "payout resolved");

        self.store
            .find_payout(payout_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Payout".to_string()))
    }

    /// 출금 요청 목록 (페이지네이션, 선택적 사용자 필터)
    pub async fn list_payouts(
        &self,
        user_id: Option<Uuid>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Payout>, i64), ApiError> {
        self.store.list_payouts(user_id, page, limit).await
    }

    /// 매출 집계
    ///
    /// 관리자: 플랫폼 전체. 강사: 본인 실험실로 한정. 학생: 불허.
    /// PAID 수강 신청의 순수 합산 — residual 분할 덕분에
    /// 부분합들이 gross를 정확히 분할함이 보장된다.
    pub async fn revenue_summary(&self, actor_id: Uuid) -> Result<RevenueSummary, ApiError> {
        let actor = self
            .store
            .find_user(actor_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        let filter = match parse_role(&actor)? {
            Role::Admin => None,
            Role::Lecturer => Some(actor_id),
            Role::Student => return Err(ApiError::Forbidden),
        };

        self.store.revenue_summary(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::mock::MockLedgerStore;
    use crate::services::SettlementEngine;

    /// 강사 1명 + PAID 수강 신청 2건 (instructor_share 50000, 30000)
    async fn seeded_ledger() -> (PayoutLedger, Arc<MockLedgerStore>, Uuid, Uuid) {
        let store = Arc::new(MockLedgerStore::new());
        let engine = SettlementEngine::new(store.clone());

        let admin = store.add_user("Admin", Role::Admin);
        let lecturer = store.add_user("Dr. Sari", Role::Lecturer);
        let a = store.add_user("Budi", Role::Student);
        let b = store.add_user("Citra", Role::Student);
        // fee=50% → instructor_share 50000 / 30000
        let lab1 = store.add_lab("Chemistry I", 100_000, 50, 10, lecturer);
        let lab2 = store.add_lab("Biology I", 60_000, 50, 10, lecturer);

        for (student, lab) in [(a, lab1), (b, lab2)] {
            let e = engine
                .enroll(student, lab, Some("proof".to_string()))
                .await
                .unwrap();
            engine
                .verify_payment(admin, e.id, Decision::Approve)
                .await
                .unwrap();
        }

        (PayoutLedger::new(store.clone()), store, lecturer, admin)
    }

    #[tokio::test]
    async fn test_balance_counts_only_paid_enrollments() {
        let (ledger, store, lecturer, admin) = seeded_ledger().await;
        let engine = SettlementEngine::new(store.clone());

        // PENDING 신청 하나 추가 — 잔액에 반영되면 안 됨
        let c = store.add_user("Dewi", Role::Student);
        let lab = store.add_lab("Physics II", 40_000, 50, 10, lecturer);
        let pending = engine
            .enroll(c, lab, Some("proof".to_string()))
            .await
            .unwrap();

        let balance = ledger.available_balance(lecturer).await.unwrap();
        assert_eq!(balance.earned, 80_000);
        assert_eq!(balance.held, 0);
        assert_eq!(balance.available, 80_000);

        // 거절된 신청의 몫도 영구 비활성
        engine
            .verify_payment(admin, pending.id, Decision::Reject)
            .await
            .unwrap();
        let balance = ledger.available_balance(lecturer).await.unwrap();
        assert_eq!(balance.earned, 80_000);
    }

    #[tokio::test]
    async fn test_request_validation() {
        let (ledger, _store, lecturer, _admin) = seeded_ledger().await;

        let err = ledger
            .request_payout(lecturer, 0, "BCA 12345 Sari")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidAmount));

        let err = ledger
            .request_payout(lecturer, -5_000, "BCA 12345 Sari")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidAmount));

        let err = ledger.request_payout(lecturer, 10_000, "  ").await.unwrap_err();
        assert!(matches!(err, ApiError::MissingBankDetails));
    }

    #[tokio::test]
    async fn test_request_is_lecturer_only() {
        let (ledger, store, _lecturer, admin) = seeded_ledger().await;
        let student = store.add_user("Eko", Role::Student);

        let err = ledger
            .request_payout(student, 10_000, "BCA 12345")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));

        let err = ledger
            .request_payout(admin, 10_000, "BCA 12345")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
    }

    #[tokio::test]
    async fn test_pending_payout_holds_funds() {
        // 명세 시나리오: earned 80000, PENDING 20000 → available 60000;
        // 65000 요청은 실패, 60000 요청은 성공 후 available 0
        let (ledger, _store, lecturer, _admin) = seeded_ledger().await;

        ledger
            .request_payout(lecturer, 20_000, "BCA 12345 Sari")
            .await
            .unwrap();
        let balance = ledger.available_balance(lecturer).await.unwrap();
        assert_eq!(balance.available, 60_000);

        let err = ledger
            .request_payout(lecturer, 65_000, "BCA 12345 Sari")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InsufficientBalance));

        ledger
            .request_payout(lecturer, 60_000, "BCA 12345 Sari")
            .await
            .unwrap();
        let balance = ledger.available_balance(lecturer).await.unwrap();
        assert_eq!(balance.available, 0);
    }

    #[tokio::test]
    async fn test_reject_restores_balance() {
        // round-trip: 요청 후 거절 ⇒ 잔액 원복
        let (ledger, _store, lecturer, admin) = seeded_ledger().await;

        let before = ledger.available_balance(lecturer).await.unwrap().available;
        let payout = ledger
            .request_payout(lecturer, 20_000, "BCA 12345 Sari")
            .await
            .unwrap();
        assert_eq!(
            ledger.available_balance(lecturer).await.unwrap().available,
            before - 20_000
        );

        let rejected = ledger
            .resolve_payout(
                admin,
                payout.id,
                Decision::Reject,
                None,
                Some("account name mismatch"),
            )
            .await
            .unwrap();
        assert_eq!(rejected.status, "REJECTED");
        assert_eq!(rejected.notes.as_deref(), Some("account name mismatch"));

        assert_eq!(
            ledger.available_balance(lecturer).await.unwrap().available,
            before
        );
    }

    #[tokio::test]
    async fn test_approve_spends_hold_permanently() {
        let (ledger, _store, lecturer, admin) = seeded_ledger().await;

        let payout = ledger
            .request_payout(lecturer, 50_000, "BCA 12345 Sari")
            .await
            .unwrap();
        let paid = ledger
            .resolve_payout(
                admin,
                payout.id,
                Decision::Approve,
                Some("transfer-receipt.pdf"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(paid.status, "PAID");
        assert_eq!(paid.proof.as_deref(), Some("transfer-receipt.pdf"));

        // 승인 직후의 잔액 기준으로 overdraw 거부
        let balance = ledger.available_balance(lecturer).await.unwrap();
        assert_eq!(balance.available, 30_000);
        let err = ledger
            .request_payout(lecturer, 30_001, "BCA 12345 Sari")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InsufficientBalance));
    }

    #[tokio::test]
    async fn test_resolve_terminal_payout_fails() {
        let (ledger, _store, lecturer, admin) = seeded_ledger().await;

        let payout = ledger
            .request_payout(lecturer, 10_000, "BCA 12345 Sari")
            .await
            .unwrap();
        ledger
            .resolve_payout(admin, payout.id, Decision::Approve, None, None)
            .await
            .unwrap();

        for decision in [Decision::Approve, Decision::Reject] {
            let err = ledger
                .resolve_payout(admin, payout.id, decision, None, None)
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::InvalidStateTransition(_)));
        }
    }

    #[tokio::test]
    async fn test_resolve_requires_admin() {
        let (ledger, _store, lecturer, _admin) = seeded_ledger().await;

        let payout = ledger
            .request_payout(lecturer, 10_000, "BCA 12345 Sari")
            .await
            .unwrap();
        let err = ledger
            .resolve_payout(lecturer, payout.id, Decision::Approve, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
    }

    #[tokio::test]
    async fn test_revenue_summary_partitions_gross() {
        let (ledger, store, lecturer, admin) = seeded_ledger().await;

        let summary = ledger.revenue_summary(admin).await.unwrap();
        // 100000 + 60000 두 건, fee 50%/lppm 10%
        assert_eq!(summary.total_gross, 160_000);
        assert_eq!(summary.total_instructor, 80_000);
        assert_eq!(summary.total_lppm, 16_000);
        assert_eq!(summary.total_platform, 64_000);
        assert_eq!(
            summary.total_instructor + summary.total_lppm + summary.total_platform,
            summary.total_gross
        );

        // 강사는 본인 몫만, 학생은 불허
        let own = ledger.revenue_summary(lecturer).await.unwrap();
        assert_eq!(own.total_gross, 160_000);

        let student = store.add_user("Eko", Role::Student);
        let err = ledger.revenue_summary(student).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
    }

    #[tokio::test]
    async fn test_list_payouts_pages_through_results() {
        let (ledger, _store, lecturer, _admin) = seeded_ledger().await;

        // hold 합 60000 ≤ earned 80000 — 세 건 모두 성공
        for amount in [10_000, 20_000, 30_000] {
            ledger
                .request_payout(lecturer, amount, "BCA 12345 Sari")
                .await
                .unwrap();
        }

        let (page0, total) = ledger.list_payouts(Some(lecturer), 0, 2).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page0.len(), 2);

        let (page1, total) = ledger.list_payouts(Some(lecturer), 1, 2).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page1.len(), 1);

        let (page2, _) = ledger.list_payouts(Some(lecturer), 2, 2).await.unwrap();
        assert!(page2.is_empty());

        // 범위를 한참 벗어난 페이지도 panic 없이 빈 결과
        let (far, _) = ledger
            .list_payouts(Some(lecturer), u32::MAX, 100)
            .await
            .unwrap();
        assert!(far.is_empty());
    }

    #[tokio::test]
    async fn test_balance_breakdown_surfaces_negative() {
        let id = Uuid::new_v4();
        assert!(BalanceBreakdown::derive(id, 100, 50).is_ok());
        let err = BalanceBreakdown::derive(id, 100, 150).unwrap_err();
        assert!(matches!(err, ApiError::DataIntegrityError(_)));
    }
}
