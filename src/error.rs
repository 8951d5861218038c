//! Error Handling Module
//!
//! Provides type-safe error handling with proper HTTP status code mapping.
//! Uses thiserror for domain errors and integrates with tracing for structured logging.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API 에러 타입
///
/// # Design Decision
///
/// 각 에러 variant는 적절한 HTTP 상태 코드에 매핑됨
/// - 도메인 에러: 4xx (사용자가 재시도/수정 가능한 결과)
/// - 서버 에러: 5xx (내부 오류)
///
/// 정산/출금 도메인 에러는 전부 복구 가능한 결과이며, 호출한 UI가
/// 메시지를 그대로 표시하고 재시도를 맡긴다. 민감한 내부 정보는
/// 클라이언트에 노출하지 않음
#[derive(Debug, Error)]
pub enum ApiError {
    // ============ 400 Bad Request ============
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Payout amount must be positive")]
    InvalidAmount,

    #[error("Bank details are required")]
    MissingBankDetails,

    // ============ 403 Forbidden ============
    #[error("Operation not permitted for this role")]
    Forbidden,

    // ============ 404 Not Found ============
    #[error("User not found")]
    UserNotFound,

    #[error("Lab not found")]
    LabNotFound,

    #[error("Resource not found: {0}")]
    NotFound(String),

    // ============ 409 Conflict ============
    #[error("User is already enrolled in this lab")]
    DuplicateEnrollment,

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    // ============ 422 Unprocessable Entity ============
    #[error("Payment proof is required for paid labs")]
    MissingProof,

    #[error("Requested amount exceeds available balance")]
    InsufficientBalance,

    // ============ 500 Internal Server Error ============
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error")]
    InternalError,
}

/// API 에러 응답 구조
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            // 4xx 클라이언트 에러
            ApiError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Validation failed".to_string(),
                Some(msg.clone()),
            ),
            ApiError::InvalidAmount => (
                StatusCode::BAD_REQUEST,
                "INVALID_AMOUNT",
                self.to_string(),
                None,
            ),
            ApiError::MissingBankDetails => (
                StatusCode::BAD_REQUEST,
                "MISSING_BANK_DETAILS",
                self.to_string(),
                None,
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                self.to_string(),
                None,
            ),
            ApiError::UserNotFound => (
                StatusCode::NOT_FOUND,
                "USER_NOT_FOUND",
                self.to_string(),
                None,
            ),
            ApiError::LabNotFound => (
                StatusCode::NOT_FOUND,
                "LAB_NOT_FOUND",
                self.to_string(),
                None,
            ),
            ApiError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} not found", resource),
                None,
            ),
            ApiError::DuplicateEnrollment => (
                StatusCode::CONFLICT,
                "DUPLICATE_ENROLLMENT",
                self.to_string(),
                None,
            ),
            ApiError::InvalidStateTransition(msg) => (
                StatusCode::CONFLICT,
                "INVALID_STATE_TRANSITION",
                "Invalid state transition".to_string(),
                Some(msg.clone()),
            ),
            ApiError::MissingProof => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "MISSING_PROOF",
                self.to_string(),
                None,
            ),
            ApiError::InsufficientBalance => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INSUFFICIENT_BALANCE",
                self.to_string(),
                None,
            ),

            // 5xx 서버 에러
            ApiError::DataIntegrityError(_) => {
                // 음수 잔액 등 — 조용히 보정하지 않고 수면 위로 올림
                tracing::error!("Data integrity error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATA_INTEGRITY_ERROR",
                    "A data integrity error was detected".to_string(),
                    None,
                )
            }
            ApiError::DatabaseError(_) => {
                // 내부 에러는 클라이언트에 상세 정보 노출 안 함
                tracing::error!("Database error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error occurred".to_string(),
                    None,
                )
            }
            ApiError::InternalError => {
                tracing::error!("Internal error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// SQLx 에러를 ApiError로 변환
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("SQLx error: {:?}", err);
        ApiError::DatabaseError(err.to_string())
    }
}

/// anyhow 에러를 ApiError로 변환
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Anyhow error: {:?}", err);
        ApiError::InternalError
    }
}
