//! Admin dashboard statistics.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db;
use crate::db::orders::{RevenueStats, TopProduct};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Headline counts for the dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub users: i64,
    pub products: i64,
    pub orders: i64,
    pub pending_orders: i64,
    pub revenue: Decimal,
}

/// GET /api/admin/stats/summary
///
/// Live products only; revenue is the paid, non-cancelled total.
///
/// # Errors
///
/// Returns 500 if a query fails.
pub async fn summary(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<StatsSummary>> {
    let pool = state.pool();

    let users = db::users::count(pool).await?;
    let products = db::products::count(pool).await?;
    let orders = db::orders::count(pool).await?;
    let pending_orders = db::orders::pending_count(pool).await?;
    let revenue = db::orders::total_revenue(pool).await?;

    Ok(Json(StatsSummary {
        users,
        products,
        orders,
        pending_orders,
        revenue,
    }))
}

/// GET /api/admin/stats/revenue
///
/// Totals plus the last twelve calendar months, bucketed by payment
/// date.
///
/// # Errors
///
/// Returns 500 if a query fails.
pub async fn revenue(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<RevenueStats>> {
    let stats = db::orders::revenue_stats(state.pool()).await?;

    Ok(Json(stats))
}

/// GET /api/admin/stats/top-products
///
/// Top five products by quantity sold across non-cancelled orders.
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn top_products(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<TopProduct>>> {
    let products = db::orders::top_products(state.pool()).await?;

    Ok(Json(products))
}
