use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Certificate status enum
///
/// A certificate is created pending at checkout time and moves to
/// generated when the worker produces its URL. Reconciliation marks
/// certificates failed when generation never completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    Pending,
    Generated,
    Failed,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Pending => "pending",
            CertificateStatus::Generated => "generated",
            CertificateStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain model representing a certificate, 1:1 with an order
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Certificate {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: i64,
    pub project_id: i64,
    pub tonnes: Decimal,
    pub certificate_url: String,
    pub status: CertificateStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied at checkout when creating the pending certificate row
#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub order_id: Uuid,
    pub user_id: i64,
    pub project_id: i64,
    pub tonnes: Decimal,
}

/// Wire record published to the certificate generation queue.
/// Not persisted; consumed by the certificate worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateGenerationMessage {
    pub order_id: Uuid,
    pub user_id: i64,
    pub project_id: i64,
    pub tonnes: Decimal,
    pub user_email: String,
    pub user_name: String,
}
