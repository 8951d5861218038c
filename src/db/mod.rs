//! Database Module
//!
//! # Interview Q&A
//!
//! Q: 왜 PostgreSQL을 선택했는가?
//! A: 정산/출금 백엔드에 적합한 이유
//!
//!    1. ACID 트랜잭션: 금융 데이터 무결성 보장 (출금 hold의 핵심)
//!    2. row lock (SELECT ... FOR UPDATE): 잔액 재확인-후-insert 직렬화
//!    3. 인덱싱: 강사별, 상태별 집계 조회 최적화
//!    4. 확장성: 읽기 레플리카, 파티셔닝
//!    5. 생태계: SQLx, Diesel 등 Rust 라이브러리 지원
//!
//! Q: SQLx를 선택한 이유는?
//! A: 타입 안전성 + async 지원 + 마이그레이션 내장
//!
//! Q: 잔액을 왜 저장하지 않고 매번 계산하는가?
//! A: 파생 값(derived value)이기 때문
//!    - earned: PAID 수강 신청의 instructor_share 합
//!    - held: REJECTED가 아닌 출금 요청의 amount 합
//!    - 저장하면 두 곳을 동기화해야 함 → 이중 기록 버그의 온상
//!    - 계산하면 단일 진실 공급원(수강/출금 행)만 존재

mod models;
pub mod repository;

pub use models::*;
pub use repository::LedgerStore;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::error::ApiError;
use crate::types::{EnrollmentStatus, PaymentStatus, PayoutStatus};

/// 데이터베이스 연결 및 쿼리 담당
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 데이터베이스 연결
    ///
    /// # Connection Pool Settings
    ///
    /// - max_connections: 10 (트래픽에 따라 조정)
    /// - min_connections: 1 (idle 시 최소 유지)
    /// - acquire_timeout: 3초 (커넥션 획득 대기)
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// 마이그레이션 실행
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// PostgreSQL unique 위반 (SQLSTATE 23505) 여부
fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

#[async_trait]
impl LedgerStore for Database {
    // ============ Users / Labs ============

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_lab(&self, id: Uuid) -> Result<Option<Lab>, ApiError> {
        let lab = sqlx::query_as::<_, Lab>(
            r#"
            SELECT id, title, price, fee_percentage, lppm_fee_percentage,
                   instructor_id, created_at
            FROM labs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lab)
    }

    async fn update_lab_pricing(
        &self,
        lab_id: Uuid,
        price: i64,
        fee_percentage: i64,
        lppm_fee_percentage: i64,
    ) -> Result<(), ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE labs
            SET price = $2, fee_percentage = $3, lppm_fee_percentage = $4
            WHERE id = $1
            "#,
        )
        .bind(lab_id)
        .bind(price)
        .bind(fee_percentage)
        .bind(lppm_fee_percentage)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::LabNotFound);
        }
        Ok(())
    }

    // ============ Enrollments ============

    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), ApiError> {
        let result = sqlx::query(
            r#"
            INSERT INTO enrollments (
                id, user_id, lab_id, status, payment_status, payment_proof,
                instructor_share, lppm_share, platform_share,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(enrollment.id)
        .bind(enrollment.user_id)
        .bind(enrollment.lab_id)
        .bind(&enrollment.status)
        .bind(&enrollment.payment_status)
        .bind(&enrollment.payment_proof)
        .bind(enrollment.instructor_share)
        .bind(enrollment.lppm_share)
        .bind(enrollment.platform_share)
        .bind(enrollment.created_at)
        .bind(enrollment.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            // (user_id, lab_id) unique 인덱스가 동시 요청의 최후 방어선
            Err(err) if is_unique_violation(&err) => Err(ApiError::DuplicateEnrollment),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_enrollment(&self, id: Uuid) -> Result<Option<Enrollment>, ApiError> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT id, user_id, lab_id, status, payment_status, payment_proof,
                   instructor_share, lppm_share, platform_share,
                   created_at, updated_at
            FROM enrollments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(enrollment)
    }

    async fn transition_enrollment(
        &self,
        id: Uuid,
        payment_status: PaymentStatus,
        status: EnrollmentStatus,
    ) -> Result<bool, ApiError> {
        // PENDING 조건이 붙은 guarded update —
        // 동시 검증 요청 중 하나만 성공한다.
        let result = sqlx::query(
            r#"
            UPDATE enrollments
            SET payment_status = $2, status = $3, updated_at = NOW()
            WHERE id = $1 AND payment_status = 'PENDING'
            "#,
        )
        .bind(id)
        .bind(payment_status.to_string())
        .bind(status.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_pending_enrollments(
        &self,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Enrollment>, i64), ApiError> {
        // i64로 넓혀서 계산 — page * limit의 u32 오버플로우 방지
        let offset = page as i64 * limit as i64;

        let enrollments = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT id, user_id, lab_id, status, payment_status, payment_proof,
                   instructor_share, lppm_share, platform_share,
                   created_at, updated_at
            FROM enrollments
            WHERE payment_status = 'PENDING'
            ORDER BY created_at ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM enrollments WHERE payment_status = 'PENDING'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok((enrollments, count.0))
    }

    // ============ Payouts / Balance ============

    async fn earned_total(&self, instructor_id: Uuid) -> Result<i64, ApiError> {
        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(e.instructor_share), 0)::BIGINT
            FROM enrollments e
            JOIN labs l ON l.id = e.lab_id
            WHERE l.instructor_id = $1 AND e.payment_status = 'PAID'
            "#,
        )
        .bind(instructor_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.0)
    }

    async fn held_total(&self, user_id: Uuid) -> Result<i64, ApiError> {
        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount), 0)::BIGINT
            FROM payouts
            WHERE user_id = $1 AND status <> 'REJECTED'
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.0)
    }

    async fn create_payout_with_hold(
        &self,
        user_id: Uuid,
        amount: i64,
        bank_details: &str,
    ) -> Result<Payout, ApiError> {
        // 잔액 확인과 insert 사이의 check-then-act 경쟁을
        // 트랜잭션 + 강사 행 row lock으로 직렬화한다.
        // 같은 강사의 동시 요청은 lock 대기 후 갱신된 잔액을 보게 됨.
        let mut tx = self.pool.begin().await.map_err(ApiError::from)?;

        let locked: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(ApiError::UserNotFound);
        }

        let earned: (i64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(e.instructor_share), 0)::BIGINT
            FROM enrollments e
            JOIN labs l ON l.id = e.lab_id
            WHERE l.instructor_id = $1 AND e.payment_status = 'PAID'
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let held: (i64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount), 0)::BIGINT
            FROM payouts
            WHERE user_id = $1 AND status <> 'REJECTED'
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let available = earned.0 - held.0;
        if available < 0 {
            return Err(ApiError::DataIntegrityError(format!(
                "negative balance for lecturer {}: {}",
                user_id, available
            )));
        }
        if amount > available {
            return Err(ApiError::InsufficientBalance);
        }

        let payout = sqlx::query_as::<_, Payout>(
            r#"
            INSERT INTO payouts (
                id, user_id, amount, status, bank_details, created_at, updated_at
            )
            VALUES ($1, $2, $3, 'PENDING', $4, NOW(), NOW())
            RETURNING id, user_id, amount, status, bank_details, proof, notes,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(amount)
        .bind(bank_details)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await.map_err(ApiError::from)?;

        Ok(payout)
    }

    async fn find_payout(&self, id: Uuid) -> Result<Option<Payout>, ApiError> {
        let payout = sqlx::query_as::<_, Payout>(
            r#"
            SELECT id, user_id, amount, status, bank_details, proof, notes,
                   created_at, updated_at
            FROM payouts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payout)
    }

    async fn transition_payout(
        &self,
        id: Uuid,
        status: PayoutStatus,
        proof: Option<&str>,
        notes: Option<&str>,
    ) -> Result<bool, ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE payouts
            SET status = $2,
                proof = COALESCE($3, proof),
                notes = COALESCE($4, notes),
                updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .bind(proof)
        .bind(notes)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_payouts(
        &self,
        user_id: Option<Uuid>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Payout>, i64), ApiError> {
        let offset = page as i64 * limit as i64;

        let payouts = sqlx::query_as::<_, Payout>(
            r#"
            SELECT id, user_id, amount, status, bank_details, proof, notes,
                   created_at, updated_at
            FROM payouts
            WHERE ($1::uuid IS NULL OR user_id = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM payouts WHERE ($1::uuid IS NULL OR user_id = $1)",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((payouts, count.0))
    }

    async fn revenue_summary(
        &self,
        instructor_id: Option<Uuid>,
    ) -> Result<RevenueSummary, ApiError> {
        let summary = sqlx::query_as::<_, RevenueSummary>(
            r#"
            SELECT
                COALESCE(SUM(e.instructor_share + e.lppm_share + e.platform_share), 0)::BIGINT
                    AS total_gross,
                COALESCE(SUM(e.instructor_share), 0)::BIGINT AS total_instructor,
                COALESCE(SUM(e.lppm_share), 0)::BIGINT AS total_lppm,
                COALESCE(SUM(e.platform_share), 0)::BIGINT AS total_platform
            FROM enrollments e
            JOIN labs l ON l.id = e.lab_id
            WHERE e.payment_status = 'PAID'
              AND ($1::uuid IS NULL OR l.instructor_id = $1)
            "#,
        )
        .bind(instructor_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }
}
