//! Reporting types

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

/// Dashboard counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReportSummary {
    pub total_books: i64,
    pub available_books: i64,
    pub total_users: i64,
    pub open_loans: i64,
    /// Open loans past the lending period on the report date
    pub overdue_loans: i64,
    /// Sum of settled fines not yet paid
    #[schema(value_type = String, example = "120.00")]
    pub unpaid_fines: Decimal,
}
