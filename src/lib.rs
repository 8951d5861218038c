//! Virtual Lab Settlement & Payout API Library
//!
//! # Overview
//!
//! 이 라이브러리는 대학 가상 실험실(e-learning) 플랫폼의 수익 배분
//! 코어 — 수강 신청 정산과 강사 출금 원장 — 백엔드 API를 제공합니다.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                         API                              │
//! │                                                          │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐    │
//! │  │ Routes  │  │Services │  │   DB    │  │  Types  │    │
//! │  └────┬────┘  └────┬────┘  └────┬────┘  └────┬────┘    │
//! │       │            │            │            │          │
//! │       └────────────┴────────────┴────────────┘          │
//! │                         │                                │
//! └─────────────────────────┼────────────────────────────────┘
//!                           │
//!                           ▼
//!                  ┌────────────────┐
//!                  │   PostgreSQL   │
//!                  └────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: 환경 설정 관리
//! - `error`: 에러 타입 및 처리
//! - `routes`: HTTP 엔드포인트 핸들러
//! - `services`: 비즈니스 로직 (Settlement Engine, Payout Ledger)
//! - `db`: 데이터베이스 연동 (`LedgerStore` trait + PostgreSQL 구현)
//! - `types`: 공통 타입 정의 (상태 enum, 역할)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vlab_settlement_api::{config::Config, db::Database};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let db = Database::connect(&config.database_url).await?;
//!
//!     // ... 서버 시작
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod services;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use db::{Database, LedgerStore};
pub use error::ApiError;
pub use services::{PayoutLedger, SettlementEngine};

/// 애플리케이션 전역 상태
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    /// 서비스가 공유하는 스토어 핸들 (관리자 설정 edge에서도 사용)
    pub store: Arc<dyn LedgerStore>,
    pub settlement: Arc<SettlementEngine>,
    pub ledger: Arc<PayoutLedger>,
    pub config: Arc<Config>,
}
