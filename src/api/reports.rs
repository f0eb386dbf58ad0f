//! Reporting endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{loan::OverdueLoan, report::ReportSummary, Book, LoanRecord},
};

use super::AsOfQuery;

/// Books currently available for borrowing
#[utoipa::path(
    get,
    path = "/reports/available-books",
    tag = "reports",
    responses(
        (status = 200, description = "Available books", body = Vec<Book>)
    )
)]
pub async fn available_books(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.reports.available_books().await?;
    Ok(Json(books))
}

/// Loans not yet returned
#[utoipa::path(
    get,
    path = "/reports/borrowed",
    tag = "reports",
    responses(
        (status = 200, description = "Open loan records", body = Vec<LoanRecord>)
    )
)]
pub async fn borrowed(State(state): State<crate::AppState>) -> AppResult<Json<Vec<LoanRecord>>> {
    let records = state.services.reports.borrowed().await?;
    Ok(Json(records))
}

/// Open loans past the lending period
#[utoipa::path(
    get,
    path = "/reports/overdue",
    tag = "reports",
    params(AsOfQuery),
    responses(
        (status = 200, description = "Overdue loans with their live fine", body = Vec<OverdueLoan>)
    )
)]
pub async fn overdue(
    State(state): State<crate::AppState>,
    Query(query): Query<AsOfQuery>,
) -> AppResult<Json<Vec<OverdueLoan>>> {
    let overdue = state.services.reports.overdue(query.date()).await?;
    Ok(Json(overdue))
}

/// Dashboard counters
#[utoipa::path(
    get,
    path = "/reports/summary",
    tag = "reports",
    params(AsOfQuery),
    responses(
        (status = 200, description = "Summary", body = ReportSummary)
    )
)]
pub async fn summary(
    State(state): State<crate::AppState>,
    Query(query): Query<AsOfQuery>,
) -> AppResult<Json<ReportSummary>> {
    let summary = state.services.reports.summary(query.date()).await?;
    Ok(Json(summary))
}
