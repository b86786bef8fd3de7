use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::time::timeout;
use uuid::Uuid;

use crate::certificates::{Certificate, CertificateError, CertificateStatus, NewCertificate};
use crate::db::STORE_TIMEOUT;

/// Certificate records, 1:1 with orders by order_id.
pub trait CertificateStore: Clone + Send + Sync + 'static {
    /// Persist a new certificate in pending status.
    fn create(
        &self,
        certificate: NewCertificate,
    ) -> impl Future<Output = Result<Certificate, CertificateError>> + Send;

    fn get_by_order_id(
        &self,
        order_id: Uuid,
    ) -> impl Future<Output = Result<Option<Certificate>, CertificateError>> + Send;

    fn get_by_user(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<Certificate>, CertificateError>> + Send;

    fn update_status(
        &self,
        id: Uuid,
        status: CertificateStatus,
    ) -> impl Future<Output = Result<(), CertificateError>> + Send;

    /// Set the URL and move status to generated as one atomic update,
    /// keyed by the owning order.
    fn update_url_by_order(
        &self,
        order_id: Uuid,
        url: &str,
    ) -> impl Future<Output = Result<(), CertificateError>> + Send;

    /// Certificates still pending whose creation predates `cutoff`.
    fn find_pending_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Certificate>, CertificateError>> + Send;
}

const CERTIFICATE_COLUMNS: &str =
    "id, order_id, user_id, project_id, tonnes, certificate_url, status, created_at, updated_at";

/// Postgres-backed certificate store
#[derive(Clone)]
pub struct CertificateRepository {
    pool: PgPool,
}

impl CertificateRepository {
    /// Create a new CertificateRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CertificateStore for CertificateRepository {
    async fn create(&self, certificate: NewCertificate) -> Result<Certificate, CertificateError> {
        let query = format!(
            r#"
            INSERT INTO certificates (order_id, user_id, project_id, tonnes, status)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING {CERTIFICATE_COLUMNS}
            "#
        );

        let certificate = timeout(
            STORE_TIMEOUT,
            sqlx::query_as::<_, Certificate>(&query)
                .bind(certificate.order_id)
                .bind(certificate.user_id)
                .bind(certificate.project_id)
                .bind(certificate.tonnes)
                .fetch_one(&self.pool),
        )
        .await
        .map_err(|_| CertificateError::Timeout)??;

        Ok(certificate)
    }

    async fn get_by_order_id(
        &self,
        order_id: Uuid,
    ) -> Result<Option<Certificate>, CertificateError> {
        let query = format!("SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE order_id = $1");

        let certificate = timeout(
            STORE_TIMEOUT,
            sqlx::query_as::<_, Certificate>(&query)
                .bind(order_id)
                .fetch_optional(&self.pool),
        )
        .await
        .map_err(|_| CertificateError::Timeout)??;

        Ok(certificate)
    }

    async fn get_by_user(&self, user_id: i64) -> Result<Vec<Certificate>, CertificateError> {
        let query = format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates \
             WHERE user_id = $1 ORDER BY created_at DESC"
        );

        let certificates = timeout(
            STORE_TIMEOUT,
            sqlx::query_as::<_, Certificate>(&query)
                .bind(user_id)
                .fetch_all(&self.pool),
        )
        .await
        .map_err(|_| CertificateError::Timeout)??;

        Ok(certificates)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: CertificateStatus,
    ) -> Result<(), CertificateError> {
        timeout(
            STORE_TIMEOUT,
            sqlx::query("UPDATE certificates SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(status)
                .bind(id)
                .execute(&self.pool),
        )
        .await
        .map_err(|_| CertificateError::Timeout)??;

        Ok(())
    }

    async fn update_url_by_order(&self, order_id: Uuid, url: &str) -> Result<(), CertificateError> {
        // URL and status move together in one statement; there is no
        // window where a certificate has a URL but is still pending
        let result = timeout(
            STORE_TIMEOUT,
            sqlx::query(
                r#"
                UPDATE certificates
                SET certificate_url = $1, status = 'generated', updated_at = NOW()
                WHERE order_id = $2
                "#,
            )
            .bind(url)
            .bind(order_id)
            .execute(&self.pool),
        )
        .await
        .map_err(|_| CertificateError::Timeout)??;

        if result.rows_affected() == 0 {
            return Err(CertificateError::NotFoundForOrder(order_id));
        }

        Ok(())
    }

    async fn find_pending_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Certificate>, CertificateError> {
        let query = format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates \
             WHERE status = 'pending' AND created_at < $1"
        );

        let certificates = timeout(
            STORE_TIMEOUT,
            sqlx::query_as::<_, Certificate>(&query)
                .bind(cutoff)
                .fetch_all(&self.pool),
        )
        .await
        .map_err(|_| CertificateError::Timeout)??;

        Ok(certificates)
    }
}
