//! Virtual Lab Settlement & Payout API Server
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Client (가상 실험실 웹 애플리케이션)              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum Web Server                         │
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                      Routes Layer                        ││
//! │  │  /health  /api/enrollment/*  /api/payout/*  /api/...    ││
//! │  └─────────────────────────────────────────────────────────┘│
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                    Services Layer                        ││
//! │  │  SettlementEngine          PayoutLedger                 ││
//! │  └─────────────────────────────────────────────────────────┘│
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                    Data Layer                            ││
//! │  │  LedgerStore trait → PostgreSQL (SQLx)                  ││
//! │  └─────────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// 라이브러리에서 가져오기
use vlab_settlement_api::{
    routes, AppState, Config, Database, LedgerStore, PayoutLedger, SettlementEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 환경변수 로드
    dotenvy::dotenv().ok();

    // 로깅 초기화
    // RUST_LOG=debug,sqlx=warn 형태로 레벨 제어 가능
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "vlab_settlement_api=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🚀 Starting Virtual Lab Settlement API Server");

    // 설정 로드
    let config = Config::from_env()?;
    tracing::info!("📋 Configuration loaded");

    // 데이터베이스 연결
    let db = Database::connect(&config.database_url).await?;
    tracing::info!("🗄️  Database connected");

    // 마이그레이션 실행
    db.run_migrations().await?;
    tracing::info!("📦 Migrations completed");

    // 서비스 초기화 — 스토어 하나를 정산 엔진과 출금 원장이 공유
    let db = Arc::new(db);
    let store: Arc<dyn LedgerStore> = db.clone();
    let settlement = SettlementEngine::new(store.clone());
    tracing::info!("⚖️  Settlement engine initialized");

    let ledger = PayoutLedger::new(store.clone());
    tracing::info!("💰 Payout ledger initialized");

    // 앱 상태 구성
    let state = AppState {
        db,
        store,
        settlement: Arc::new(settlement),
        ledger: Arc::new(ledger),
        config: Arc::new(config.clone()),
    };

    // 라우터 구성
    let app = create_router(state);

    // 서버 시작
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🌐 Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// 라우터 생성
///
/// # Route Structure
///
/// ```text
/// GET  /health                        - 서버 상태 확인
///
/// POST /api/enrollment                - 수강 신청 (정산 몫 동결)
/// POST /api/enrollment/:id/verify     - 결제 검증 (관리자)
/// GET  /api/enrollment/pending        - 검증 대기 목록 (관리자)
///
/// GET  /api/payout/balance/:id        - 강사 출금 가능 잔액
/// POST /api/payout                    - 출금 요청 (강사)
/// POST /api/payout/:id/resolve        - 출금 처리 (관리자)
/// GET  /api/payout/list               - 출금 목록
///
/// GET  /api/revenue/summary           - 매출 집계
/// PUT  /api/lab/:id/pricing           - 가격/수수료 설정 (관리자)
/// ```
fn create_router(state: AppState) -> Router {
    // CORS 설정
    // 프로덕션에서는 특정 도메인만 허용
    // 개발 환경에서는 localhost 허용
    let cors = if state.config.is_production() {
        // 프로덕션: 특정 도메인만 허용 (환경변수로 설정)
        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "https://yourdomain.com".to_string());
        let origins: Vec<_> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        // 개발: localhost 허용
        CorsLayer::new()
            .allow_origin([
                "http://localhost:5173".parse().unwrap(),  // Vite dev server
                "http://localhost:3000".parse().unwrap(),  // Alternative
                "http://127.0.0.1:5173".parse().unwrap(),
            ])
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        // Health check
        .route("/health", get(routes::health::health_check))

        // Enrollment settlement
        .route("/api/enrollment", post(routes::enrollment::enroll))
        .route("/api/enrollment/:id/verify", post(routes::enrollment::verify_payment))
        .route("/api/enrollment/pending", get(routes::enrollment::pending_enrollments))

        // Payout ledger
        .route("/api/payout/balance/:lecturer_id", get(routes::payout::available_balance))
        .route("/api/payout", post(routes::payout::request_payout))
        .route("/api/payout/:id/resolve", post(routes::payout::resolve_payout))
        .route("/api/payout/list", get(routes::payout::list_payouts))

        // Revenue aggregates
        .route("/api/revenue/summary", get(routes::revenue::revenue_summary))

        // Lab pricing (admin)
        .route("/api/lab/:id/pricing", put(routes::lab::update_pricing))

        // 미들웨어
        .layer(TraceLayer::new_for_http())
        .layer(cors)

        // 상태 주입
        .with_state(state)
}
