//! API handlers for Bookdesk REST endpoints

pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod reports;
pub mod users;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{IntoParams, ToSchema};

use crate::AppState;

/// Body returned when a lending rule declines an operation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RejectionResponse {
    /// Always `rejected`
    pub status: String,
    /// Machine-readable reason, e.g. `limit_reached`
    pub reason: String,
    pub message: String,
}

impl RejectionResponse {
    pub fn new(reason: &str, message: String) -> Self {
        Self {
            status: "rejected".to_string(),
            reason: reason.to_string(),
            message,
        }
    }
}

impl IntoResponse for RejectionResponse {
    fn into_response(self) -> Response {
        (StatusCode::CONFLICT, Json(self)).into_response()
    }
}

/// Reference date for fines and reports; defaults to today
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AsOfQuery {
    pub as_of: Option<NaiveDate>,
}

impl AsOfQuery {
    pub fn date(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(today)
    }
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/login", post(users::login))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/:id/loans", get(users::get_user_loans))
        // Loans
        .route("/loans", get(loans::list_loans).post(loans::borrow_book))
        .route("/loans/:id", get(loans::get_loan))
        .route("/loans/:id/fine", get(loans::get_fine))
        .route("/loans/:id/return", post(loans::return_loan))
        .route("/loans/:id/pay-fine", post(loans::pay_fine))
        // Reports
        .route("/reports/available-books", get(reports::available_books))
        .route("/reports/borrowed", get(reports::borrowed))
        .route("/reports/overdue", get(reports::overdue))
        .route("/reports/summary", get(reports::summary))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
