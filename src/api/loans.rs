//! Loan ledger endpoints: borrowing, returns and fines

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::loan::{
        BorrowOutcome, FineEstimate, LoanQuery, LoanRecord, PaymentOutcome, ReturnOutcome,
    },
};

use super::{today, AsOfQuery, RejectionResponse};

/// Borrow request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoanRequest {
    pub user_id: String,
    pub book_id: String,
    /// Defaults to today
    pub borrow_date: Option<NaiveDate>,
}

/// Return request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReturnLoanRequest {
    /// Defaults to today
    pub return_date: Option<NaiveDate>,
}

impl ReturnLoanRequest {
    /// Parse a return body. Only an empty body means "no request"; anything
    /// else must be a valid request.
    pub fn from_body(body: &[u8]) -> AppResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("Invalid return request: {}", e)))
    }
}

/// List loan records
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(LoanQuery),
    responses(
        (status = 200, description = "Loan records, oldest first", body = Vec<LoanRecord>)
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<Vec<LoanRecord>>> {
    let records = state.services.loans.list(&query).await?;
    Ok(Json(records))
}

/// Get loan record by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = String, Path, description = "Loan record ID")
    ),
    responses(
        (status = 200, description = "Loan record", body = LoanRecord),
        (status = 404, description = "Loan record not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<LoanRecord>> {
    let record = state.services.loans.get(&id).await?;
    Ok(Json(record))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan opened", body = LoanRecord),
        (status = 409, description = "Declined by a lending rule", body = RejectionResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateLoanRequest>,
) -> AppResult<Response> {
    let borrow_date = request.borrow_date.unwrap_or_else(today);

    let outcome = state
        .services
        .loans
        .borrow(&request.user_id, &request.book_id, borrow_date)
        .await?;

    Ok(match outcome {
        BorrowOutcome::Borrowed(record) => (StatusCode::CREATED, Json(record)).into_response(),
        BorrowOutcome::Rejected(rejection) => {
            RejectionResponse::new(rejection.code(), rejection.to_string()).into_response()
        }
    })
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = String, Path, description = "Loan record ID")
    ),
    request_body = ReturnLoanRequest,
    responses(
        (status = 200, description = "Loan closed with its fine", body = LoanRecord),
        (status = 400, description = "Malformed request body", body = crate::error::ErrorResponse),
        (status = 409, description = "Declined", body = RejectionResponse)
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Response> {
    let request = ReturnLoanRequest::from_body(&body)?;
    let return_date = request.return_date.unwrap_or_else(today);

    let outcome = state.services.loans.return_loan(&id, return_date).await?;

    Ok(match outcome {
        ReturnOutcome::Returned(record) => Json(record).into_response(),
        ReturnOutcome::Rejected(rejection) => {
            RejectionResponse::new(rejection.code(), rejection.to_string()).into_response()
        }
    })
}

/// Fine a loan carries as of a date
#[utoipa::path(
    get,
    path = "/loans/{id}/fine",
    tag = "loans",
    params(
        ("id" = String, Path, description = "Loan record ID"),
        AsOfQuery
    ),
    responses(
        (status = 200, description = "Fine estimate", body = FineEstimate),
        (status = 404, description = "Loan record not found")
    )
)]
pub async fn get_fine(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
    Query(query): Query<AsOfQuery>,
) -> AppResult<Json<FineEstimate>> {
    let estimate = state.services.fines.estimate(&id, query.date()).await?;
    Ok(Json(estimate))
}

/// Pay the fine of a returned loan
#[utoipa::path(
    post,
    path = "/loans/{id}/pay-fine",
    tag = "loans",
    params(
        ("id" = String, Path, description = "Loan record ID")
    ),
    responses(
        (status = 200, description = "Fine paid", body = LoanRecord),
        (status = 409, description = "Declined", body = RejectionResponse)
    )
)]
pub async fn pay_fine(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let outcome = state.services.fines.pay_fine(&id).await?;

    Ok(match outcome {
        PaymentOutcome::Paid(record) => Json(record).into_response(),
        PaymentOutcome::Rejected(rejection) => {
            RejectionResponse::new(rejection.code(), rejection.to_string()).into_response()
        }
    })
}
