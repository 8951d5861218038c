//! Health Check Endpoint
//!
//! "깊은 헬스체크"(deep health check) 패턴: 프로세스 생존만이 아니라
//! DB 연결까지 확인한다. 이 서비스는 잔액을 저장하지 않고 매 요청마다
//! enrollments/payouts에서 파생 계산하므로, DB가 죽으면 정산·출금
//! 전부가 불가능하다 — 단순 200 OK는 의미가 없음.
//!
//! 용도: 로드밸런서 헬스체크, Kubernetes liveness/readiness probe,
//! 모니터링 연동. DB 장애 시 "degraded"를 반환해 트래픽을 차단할 수
//! 있게 한다.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

/// Health check 응답
#[derive(Serialize)]
pub struct HealthResponse {
    /// healthy | degraded
    pub status: String,
    pub version: String,
    pub database: DatabaseStatus,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct DatabaseStatus {
    pub connected: bool,
    /// SELECT 1 왕복 시간 — 커넥션 풀 포화의 조기 신호
    pub latency_ms: Option<u64>,
}

/// GET /health
///
/// 서버 및 DB 상태 확인
pub async fn health_check(
    State(state): State<AppState>,
) -> Json<HealthResponse> {
    let db_start = std::time::Instant::now();
    let db_status = match state.db.health_check().await {
        Ok(_) => DatabaseStatus {
            connected: true,
            latency_ms: Some(db_start.elapsed().as_millis() as u64),
        },
        Err(_) => DatabaseStatus {
            connected: false,
            latency_ms: None,
        },
    };

    // DB 없이는 잔액 계산 불가 → 서비스 가능 상태가 아님
    let status = if db_status.connected { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
