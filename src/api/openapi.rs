//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, loans, reports, users, RejectionResponse};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookdesk API",
        version = "0.1.0",
        description = "Library lending desk REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        users::login,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::get_user_loans,
        // Loans
        loans::list_loans,
        loans::get_loan,
        loans::borrow_book,
        loans::return_loan,
        loans::get_fine,
        loans::pay_fine,
        // Reports
        reports::available_books,
        reports::borrowed,
        reports::overdue,
        reports::summary,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Users
            crate::models::user::User,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::models::user::LoginRequest,
            // Loans
            crate::models::loan::LoanRecord,
            crate::models::loan::FineEstimate,
            crate::models::loan::OverdueLoan,
            loans::CreateLoanRequest,
            loans::ReturnLoanRequest,
            // Reports
            crate::models::report::ReportSummary,
            // Health
            health::HealthResponse,
            // Errors
            RejectionResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Credential check"),
        (name = "books", description = "Book registry"),
        (name = "users", description = "User registry"),
        (name = "loans", description = "Borrowing, returns and fines"),
        (name = "reports", description = "Reporting queries")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_lending_paths() {
        let doc = ApiDoc::openapi();
        for path in ["/loans", "/loans/{id}/return", "/loans/{id}/pay-fine", "/reports/overdue"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
