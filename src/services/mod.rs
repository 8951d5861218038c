//! Services Module
//!
//! 비즈니스 로직을 담당하는 서비스 레이어
//!
//! # Services
//! - `SettlementEngine`: 수강 신청 시점의 3분할 정산 + 결제 검증 상태 머신
//! - `PayoutLedger`: 강사 출금 가능 잔액 계산 + 출금 요청/승인/거절 워크플로우

mod ledger;
mod settlement;

pub use ledger::{BalanceBreakdown, PayoutLedger};
pub use settlement::{validate_fee_config, RevenueSplit, SettlementEngine};

use uuid::Uuid;

use crate::db::{LedgerStore, User};
use crate::error::ApiError;
use crate::types::Role;

// ============ 공통 검증 헬퍼 ============

/// DB의 TEXT role을 타입 있는 enum으로. 알 수 없는 값은 무결성 에러.
pub(crate) fn parse_role(user: &User) -> Result<Role, ApiError> {
    user.role.parse::<Role>().map_err(ApiError::DataIntegrityError)
}

/// 행위자(actor)를 조회하고 관리자 권한을 요구한다.
///
/// 행위자는 항상 명시적 컨텍스트로 전달됨 — 암묵적 세션 상태 없음.
pub(crate) async fn require_admin(
    store: &dyn LedgerStore,
    actor_id: Uuid,
) -> Result<User, ApiError> {
    let actor = store
        .find_user(actor_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;
    if parse_role(&actor)? != Role::Admin {
        return Err(ApiError::Forbidden);
    }
    Ok(actor)
}

/// 강사 본인 확인 (출금/잔액 조회 주체)
pub(crate) async fn require_lecturer(
    store: &dyn LedgerStore,
    user_id: Uuid,
) -> Result<User, ApiError> {
    let user = store
        .find_user(user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;
    if parse_role(&user)? != Role::Lecturer {
        return Err(ApiError::Forbidden);
    }
    Ok(user)
}
