//! API Routes Module
//!
//! 모든 HTTP 엔드포인트 정의
//!
//! # Routes
//! - `/health` - 헬스 체크
//! - `/api/enrollment/*` - 수강 신청 + 결제 검증
//! - `/api/payout/*` - 잔액 조회 + 출금 워크플로우
//! - `/api/revenue/*` - 매출 집계
//! - `/api/lab/*` - 가격/수수료 설정 (관리자)

pub mod enrollment;
pub mod health;
pub mod lab;
pub mod payout;
pub mod revenue;
