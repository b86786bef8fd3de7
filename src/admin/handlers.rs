// HTTP handlers for admin reporting endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::admin::reports::{growth, growth_decimal, monthly_report, MonthlyReport};
use crate::error::ApiError;
use crate::orders::{OrderResponse, OrderStore};
use crate::validation::validate_month;
use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct MonthlyReportParams {
    /// Report year, defaults to the current year
    pub year: Option<i32>,
    /// Report month (1-12), defaults to the current month
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DateRangeParams {
    /// Range start, YYYY-MM-DD
    pub start_date: String,
    /// Range end, YYYY-MM-DD (inclusive)
    pub end_date: String,
}

/// Order totals for one month, used in the statistics comparison
#[derive(Debug, Serialize, ToSchema)]
pub struct MonthTotals {
    pub month: String,
    pub year: i32,
    pub total_orders: i64,
    pub total_tonnes: f64,
    pub total_revenue: f64,
}

impl From<&MonthlyReport> for MonthTotals {
    fn from(report: &MonthlyReport) -> Self {
        Self {
            month: report.month.clone(),
            year: report.year,
            total_orders: report.total_orders,
            total_tonnes: report.total_tonnes.to_f64().unwrap_or(0.0),
            total_revenue: report.total_revenue.to_f64().unwrap_or(0.0),
        }
    }
}

/// Month-over-month growth percentages
#[derive(Debug, Serialize, ToSchema)]
pub struct GrowthRates {
    pub orders: f64,
    pub tonnes: f64,
    pub revenue: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatisticsResponse {
    pub current_month: MonthTotals,
    pub previous_month: MonthTotals,
    pub growth: GrowthRates,
}

/// Handler for GET /api/v1/admin/reports/monthly
/// Aggregates completed orders for the requested (or current) month
#[utoipa::path(
    get,
    path = "/api/v1/admin/reports/monthly",
    params(MonthlyReportParams),
    responses(
        (status = 200, description = "Monthly report", body = MonthlyReport),
        (status = 400, description = "Invalid month"),
        (status = 500, description = "Failed to build report")
    ),
    tag = "admin"
)]
pub async fn monthly_report_handler(
    State(state): State<AppState>,
    Query(params): Query<MonthlyReportParams>,
) -> Result<Json<MonthlyReport>, ApiError> {
    let now = Utc::now();
    let year = params.year.unwrap_or_else(|| now.year());
    let month = params.month.unwrap_or_else(|| now.month());

    validate_month(month).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let report = monthly_report(&state.order_repo, year, month).await?;
    Ok(Json(report))
}

/// Handler for GET /api/v1/admin/orders/date-range
/// Lists orders between two dates, both ends inclusive
#[utoipa::path(
    get,
    path = "/api/v1/admin/orders/date-range",
    params(DateRangeParams),
    responses(
        (status = 200, description = "Orders in the range", body = Vec<OrderResponse>),
        (status = 400, description = "Malformed date"),
        (status = 500, description = "Failed to query orders")
    ),
    tag = "admin"
)]
pub async fn date_range_handler(
    State(state): State<AppState>,
    Query(params): Query<DateRangeParams>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let start = NaiveDate::parse_from_str(&params.start_date, "%Y-%m-%d").map_err(|_| {
        ApiError::BadRequest("Invalid start_date format. Use YYYY-MM-DD".to_string())
    })?;
    let end = NaiveDate::parse_from_str(&params.end_date, "%Y-%m-%d").map_err(|_| {
        ApiError::BadRequest("Invalid end_date format. Use YYYY-MM-DD".to_string())
    })?;

    let start = start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    // End of day so the closing date is fully included
    let end = end.and_hms_opt(23, 59, 59).unwrap_or_default().and_utc();

    let orders = state.order_repo.find_by_date_range(start, end).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// Handler for GET /api/v1/admin/statistics
/// Compares the current month against the previous one. A failure
/// reading the previous month degrades to zeros rather than failing the
/// whole response.
#[utoipa::path(
    get,
    path = "/api/v1/admin/statistics",
    responses(
        (status = 200, description = "Month-over-month statistics", body = StatisticsResponse),
        (status = 500, description = "Failed to build statistics")
    ),
    tag = "admin"
)]
pub async fn statistics_handler(
    State(state): State<AppState>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let now = Utc::now();
    let (current_year, current_month) = (now.year(), now.month());
    let (previous_year, previous_month) = if current_month == 1 {
        (current_year - 1, 12)
    } else {
        (current_year, current_month - 1)
    };

    let current = monthly_report(&state.order_repo, current_year, current_month).await?;
    let previous = match monthly_report(&state.order_repo, previous_year, previous_month).await {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!("Failed to build previous month report: {}", e);
            MonthlyReport::empty(previous_year, previous_month)
        }
    };

    let growth = GrowthRates {
        orders: growth(current.total_orders as f64, previous.total_orders as f64),
        tonnes: growth_decimal(current.total_tonnes, previous.total_tonnes),
        revenue: growth_decimal(current.total_revenue, previous.total_revenue),
    };

    Ok(Json(StatisticsResponse {
        current_month: (&current).into(),
        previous_month: (&previous).into(),
        growth,
    }))
}
