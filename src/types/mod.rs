//! Common Types Module
//!
//! 애플리케이션 전반에서 사용되는 공통 타입 정의
//!
//! 상태 값은 DB에 TEXT로 저장되고, 도메인 경계에서 타입 있는 enum으로
//! 파싱된다. 알 수 없는 문자열은 데이터 무결성 문제로 취급.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 사용자 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Lecturer,
    Student,
}

/// 수강 신청 접근 상태
///
/// 결제 상태와 함께 움직이는 두 트랙 중 하나.
/// PENDING → ACTIVE (승인) 또는 PENDING → REJECTED (거절), 이후 불변.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnrollmentStatus {
    Pending,
    Active,
    Rejected,
}

/// 결제 검증 상태
///
/// PAID/REJECTED는 종결 상태 — 이후 어떤 전이도 허용하지 않음.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Rejected,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Rejected)
    }
}

/// 출금 요청 상태
///
/// PENDING 상태도 잔액에서 차감(hold) — 중복 인출 방지.
/// REJECTED만 hold를 해제한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PayoutStatus {
    Pending,
    Paid,
    Rejected,
}

impl PayoutStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PayoutStatus::Paid | PayoutStatus::Rejected)
    }
}

/// 관리자 승인/거절 결정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Approve,
    Reject,
}

// ============ TEXT 칼럼 변환 ============

macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = match self {
                    $($ty::$variant => $text,)+
                };
                f.write_str(s)
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!(
                        "unknown {} value: {}", stringify!($ty), other
                    )),
                }
            }
        }
    };
}

text_enum!(Role {
    Admin => "ADMIN",
    Lecturer => "LECTURER",
    Student => "STUDENT",
});

text_enum!(EnrollmentStatus {
    Pending => "PENDING",
    Active => "ACTIVE",
    Rejected => "REJECTED",
});

text_enum!(PaymentStatus {
    Pending => "PENDING",
    Paid => "PAID",
    Rejected => "REJECTED",
});

text_enum!(PayoutStatus {
    Pending => "PENDING",
    Paid => "PAID",
    Rejected => "REJECTED",
});
