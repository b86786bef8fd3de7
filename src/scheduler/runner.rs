// Background task runner: periodic reports, stale-order cleanup, and
// certificate reconciliation.

use std::time::Duration;

use chrono::{DateTime, Utc, Weekday};
use tokio::sync::watch;

use crate::admin::reports::{monthly_report, weekly_summary};
use crate::certificates::{
    CertificateGenerationMessage, CertificateStatus, CertificateStore,
};
use crate::clients::UserDirectory;
use crate::orders::{OrderStatus, OrderStore};
use crate::queue::MessageQueue;
use crate::scheduler::schedule::Cadence;

/// How often the runner wakes up to check for due tasks
const TICK_INTERVAL: Duration = Duration::from_secs(30);

/// Pending orders older than this are assumed abandoned and cancelled
pub const PENDING_ORDER_MAX_AGE: chrono::Duration = chrono::Duration::hours(24);

/// Pending certificates older than this get their generation message
/// republished
pub const CERT_RETRY_AFTER: chrono::Duration = chrono::Duration::hours(1);

/// Pending certificates older than this are marked failed instead of
/// retried
pub const CERT_FAIL_AFTER: chrono::Duration = chrono::Duration::hours(24);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    WeeklySummary,
    MonthlyReport,
    PendingOrderCleanup,
    CertificateReconciliation,
}

struct Entry {
    task: Task,
    cadence: Cadence,
    next_run: DateTime<Utc>,
}

/// Periodic task runner. Each task keeps its own next-run instant; a
/// tick runs every task that has come due and reschedules it from the
/// tick's clock, so a long outage runs each missed task once rather
/// than once per missed occurrence.
pub struct Scheduler<O, X, Q> {
    orders: O,
    certificates: X,
    queue: Q,
    queue_name: String,
    users: UserDirectory,
    entries: Vec<Entry>,
}

impl<O, X, Q> Scheduler<O, X, Q>
where
    O: OrderStore,
    X: CertificateStore,
    Q: MessageQueue,
{
    pub fn new(
        orders: O,
        certificates: X,
        queue: Q,
        queue_name: String,
        users: UserDirectory,
        now: DateTime<Utc>,
    ) -> Self {
        let cadences = [
            (Task::WeeklySummary, Cadence::Weekly { weekday: Weekday::Mon, hour: 9 }),
            (Task::MonthlyReport, Cadence::Monthly { day: 1, hour: 10 }),
            (Task::PendingOrderCleanup, Cadence::Daily { hour: 2 }),
            (Task::CertificateReconciliation, Cadence::Hourly),
        ];

        let entries = cadences
            .into_iter()
            .map(|(task, cadence)| Entry {
                task,
                cadence,
                next_run: cadence.next_after(now),
            })
            .collect();

        Self {
            orders,
            certificates,
            queue,
            queue_name,
            users,
            entries,
        }
    }

    /// Run until the shutdown signal flips. An in-flight tick finishes
    /// before the loop exits.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Scheduler started with {} tasks", self.entries.len());

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(TICK_INTERVAL) => {
                    self.tick(Utc::now()).await;
                }
            }
        }

        tracing::info!("Scheduler stopped");
    }

    /// Run every task due at `now` and reschedule it. Public so tests
    /// can drive the scheduler with a virtual clock.
    pub async fn tick(&mut self, now: DateTime<Utc>) {
        let due: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.next_run <= now)
            .map(|(i, _)| i)
            .collect();

        for index in due {
            let task = self.entries[index].task;
            self.run_task(task, now).await;
            self.entries[index].next_run = self.entries[index].cadence.next_after(now);
        }
    }

    async fn run_task(&self, task: Task, now: DateTime<Utc>) {
        match task {
            Task::WeeklySummary => self.weekly_summary(now).await,
            Task::MonthlyReport => self.monthly_report(now).await,
            Task::PendingOrderCleanup => self.cleanup_pending_orders(now).await,
            Task::CertificateReconciliation => self.reconcile_certificates(now).await,
        }
    }

    async fn weekly_summary(&self, now: DateTime<Utc>) {
        match weekly_summary(&self.orders, now).await {
            Ok(summary) => tracing::info!(
                "Weekly summary {} to {}: {} orders, {} tonnes, {} revenue",
                summary.week_start,
                summary.week_end,
                summary.total_orders,
                summary.total_tonnes,
                summary.total_revenue
            ),
            Err(e) => tracing::error!("Failed to build weekly summary: {}", e),
        }
    }

    async fn monthly_report(&self, now: DateTime<Utc>) {
        use chrono::Datelike;

        match monthly_report(&self.orders, now.year(), now.month()).await {
            Ok(report) => tracing::info!(
                "Monthly report for {} {}: {} orders, {} tonnes, {} revenue",
                report.month,
                report.year,
                report.total_orders,
                report.total_tonnes,
                report.total_revenue
            ),
            Err(e) => tracing::error!("Failed to build monthly report: {}", e),
        }
    }

    /// Cancel pending orders that never completed checkout.
    async fn cleanup_pending_orders(&self, now: DateTime<Utc>) {
        let cutoff = now - PENDING_ORDER_MAX_AGE;
        let stale = match self.orders.find_pending_older_than(cutoff).await {
            Ok(orders) => orders,
            Err(e) => {
                tracing::error!("Failed to query stale pending orders: {}", e);
                return;
            }
        };

        for order in stale {
            match self.orders.update_status(order.id, OrderStatus::Cancelled).await {
                Ok(()) => tracing::info!("Cancelled stale pending order {}", order.id),
                Err(e) => tracing::error!("Failed to cancel order {}: {}", order.id, e),
            }
        }
    }

    /// Recover from lost generation messages and half-applied worker
    /// updates.
    async fn reconcile_certificates(&self, now: DateTime<Utc>) {
        self.retry_stuck_certificates(now).await;
        self.repair_missing_order_urls().await;
    }

    /// Certificates pending past the retry cutoff get their generation
    /// message republished; past the failure cutoff they are marked
    /// failed instead.
    async fn retry_stuck_certificates(&self, now: DateTime<Utc>) {
        let stuck = match self
            .certificates
            .find_pending_older_than(now - CERT_RETRY_AFTER)
            .await
        {
            Ok(certificates) => certificates,
            Err(e) => {
                tracing::error!("Failed to query stuck certificates: {}", e);
                return;
            }
        };

        for certificate in stuck {
            if certificate.created_at < now - CERT_FAIL_AFTER {
                match self
                    .certificates
                    .update_status(certificate.id, CertificateStatus::Failed)
                    .await
                {
                    Ok(()) => tracing::warn!(
                        "Marked certificate {} failed after {} hours pending",
                        certificate.id,
                        CERT_FAIL_AFTER.num_hours()
                    ),
                    Err(e) => tracing::error!(
                        "Failed to mark certificate {} failed: {}",
                        certificate.id,
                        e
                    ),
                }
                continue;
            }

            let profile = self.users.profile(certificate.user_id);
            let message = CertificateGenerationMessage {
                order_id: certificate.order_id,
                user_id: certificate.user_id,
                project_id: certificate.project_id,
                tonnes: certificate.tonnes,
                user_email: profile.email,
                user_name: profile.name,
            };

            match serde_json::to_vec(&message) {
                Ok(payload) => {
                    match self.queue.publish(&self.queue_name, &payload).await {
                        Ok(()) => tracing::info!(
                            "Republished generation message for order {}",
                            certificate.order_id
                        ),
                        Err(e) => tracing::error!(
                            "Failed to republish generation message for order {}: {}",
                            certificate.order_id,
                            e
                        ),
                    }
                }
                Err(e) => tracing::error!(
                    "Failed to encode generation message for order {}: {}",
                    certificate.order_id,
                    e
                ),
            }
        }
    }

    /// Copy the URL onto completed orders whose certificate finished
    /// generating but whose own update was lost.
    async fn repair_missing_order_urls(&self) {
        let missing = match self.orders.find_completed_missing_certificate_url().await {
            Ok(orders) => orders,
            Err(e) => {
                tracing::error!("Failed to query orders missing certificate URLs: {}", e);
                return;
            }
        };

        for order in missing {
            let certificate = match self.certificates.get_by_order_id(order.id).await {
                Ok(Some(certificate)) => certificate,
                Ok(None) => {
                    tracing::warn!("Completed order {} has no certificate record", order.id);
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to look up certificate for order {}: {}",
                        order.id,
                        e
                    );
                    continue;
                }
            };

            if certificate.status != CertificateStatus::Generated
                || certificate.certificate_url.is_empty()
            {
                continue;
            }

            match self
                .orders
                .update_certificate_url(order.id, &certificate.certificate_url)
                .await
            {
                Ok(()) => tracing::info!(
                    "Repaired missing certificate URL on order {}",
                    order.id
                ),
                Err(e) => tracing::error!(
                    "Failed to repair certificate URL on order {}: {}",
                    order.id,
                    e
                ),
            }
        }
    }
}
