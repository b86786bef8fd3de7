// Report aggregation over the order store.
//
// The window and summing logic live in pure functions so the admin
// handlers and the scheduler share them and tests can drive them with
// fixed clocks.

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::orders::{Order, OrderError, OrderResponse, OrderStatus, OrderStore};

/// Aggregate of completed orders within one calendar month
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MonthlyReport {
    /// Full month name, e.g. "January"
    pub month: String,
    pub year: i32,
    pub total_orders: i64,
    pub total_tonnes: Decimal,
    pub total_revenue: Decimal,
    /// Every order in the month, completed or not
    pub orders: Vec<OrderResponse>,
}

impl MonthlyReport {
    /// Zeroed report for a month, used when the underlying query fails
    /// and the caller degrades instead of erroring.
    pub fn empty(year: i32, month: u32) -> Self {
        let label = month_bounds(year, month)
            .map(|(start, _)| start.format("%B").to_string())
            .unwrap_or_default();
        Self {
            month: label,
            year,
            total_orders: 0,
            total_tonnes: Decimal::ZERO,
            total_revenue: Decimal::ZERO,
            orders: Vec::new(),
        }
    }
}

/// Aggregate of completed orders within one Sunday-based week
#[derive(Debug, Clone, Serialize)]
pub struct WeeklySummary {
    pub week_start: String,
    pub week_end: String,
    pub total_orders: i64,
    pub total_tonnes: Decimal,
    pub total_revenue: Decimal,
}

/// [first instant, last instant] of a calendar month, or None for an
/// out-of-range month
pub fn month_bounds(year: i32, month: u32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()?;
    let next_month = if month == 12 {
        Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).single()?
    } else {
        Utc.with_ymd_and_hms(year, month + 1, 1, 0, 0, 0).single()?
    };
    Some((start, next_month - chrono::Duration::seconds(1)))
}

/// [first instant, last instant] of the Sunday-based week containing
/// `now`
pub fn week_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let days_into_week = i64::from(now.weekday().num_days_from_sunday());
    let start = (now.date_naive() - chrono::Duration::days(days_into_week))
        .and_time(NaiveTime::MIN)
        .and_utc();
    let end = start + chrono::Duration::days(7) - chrono::Duration::seconds(1);
    (start, end)
}

/// Totals over completed orders only: (count, tonnes, revenue)
pub fn summarize(orders: &[Order]) -> (i64, Decimal, Decimal) {
    let mut total_orders = 0;
    let mut total_tonnes = Decimal::ZERO;
    let mut total_revenue = Decimal::ZERO;

    for order in orders {
        if order.status == OrderStatus::Completed {
            total_orders += 1;
            total_tonnes += order.tonnes;
            total_revenue += order.total_amount;
        }
    }

    (total_orders, total_tonnes, total_revenue)
}

/// Build the monthly report for (year, month)
pub async fn monthly_report<O: OrderStore>(
    store: &O,
    year: i32,
    month: u32,
) -> Result<MonthlyReport, OrderError> {
    let (start, end) = month_bounds(year, month).ok_or_else(|| {
        OrderError::ValidationError("Month must be between 1 and 12".to_string())
    })?;

    let orders = store.find_by_date_range(start, end).await?;
    let (total_orders, total_tonnes, total_revenue) = summarize(&orders);

    Ok(MonthlyReport {
        month: start.format("%B").to_string(),
        year,
        total_orders,
        total_tonnes,
        total_revenue,
        orders: orders.into_iter().map(Into::into).collect(),
    })
}

/// Build the weekly summary for the week containing `now`
pub async fn weekly_summary<O: OrderStore>(
    store: &O,
    now: DateTime<Utc>,
) -> Result<WeeklySummary, OrderError> {
    let (start, end) = week_bounds(now);
    let orders = store.find_by_date_range(start, end).await?;
    let (total_orders, total_tonnes, total_revenue) = summarize(&orders);

    Ok(WeeklySummary {
        week_start: start.format("%Y-%m-%d").to_string(),
        week_end: end.format("%Y-%m-%d").to_string(),
        total_orders,
        total_tonnes,
        total_revenue,
    })
}

/// Month-over-month growth percentage. A previous of zero means either
/// brand-new activity (100%) or no activity at all (0%).
pub fn growth(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 {
            return 100.0;
        }
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

/// Growth percentage over Decimal totals
pub fn growth_decimal(current: Decimal, previous: Decimal) -> f64 {
    growth(
        current.to_f64().unwrap_or(0.0),
        previous.to_f64().unwrap_or(0.0),
    )
}
