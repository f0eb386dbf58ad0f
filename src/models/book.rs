//! Book model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    /// Book ID (`B001`, `B002`, ...)
    pub id: String,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    /// False while an open loan references the book
    pub available: bool,
}

impl Book {
    pub fn new(id: String, book: CreateBook) -> Self {
        Self {
            id,
            isbn: book.isbn,
            title: book.title,
            author: book.author,
            genre: book.genre,
            available: true,
        }
    }

    /// Apply an update request. Availability is owned by the lending workflows.
    pub fn apply(self, update: UpdateBook) -> Self {
        Self {
            isbn: update.isbn.unwrap_or(self.isbn),
            title: update.title.unwrap_or(self.title),
            author: update.author.unwrap_or(self.author),
            genre: update.genre.or(self.genre),
            ..self
        }
    }

    pub fn with_availability(self, available: bool) -> Self {
        Self { available, ..self }
    }

    /// Case-insensitive match on title, author, ISBN or genre
    pub fn matches(&self, search: &str) -> bool {
        let needle = search.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.author.to_lowercase().contains(&needle)
            || self.isbn.to_lowercase().contains(&needle)
            || self
                .genre
                .as_deref()
                .is_some_and(|g| g.to_lowercase().contains(&needle))
    }
}

/// Book query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Only books with this availability
    pub available: Option<bool>,
    /// Free text search on title, author, ISBN and genre
    pub search: Option<String>,
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 10, max = 17, message = "ISBN must be 10 to 17 characters"))]
    pub isbn: String,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    pub genre: Option<String>,
}

/// Update book request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 10, max = 17, message = "ISBN must be 10 to 17 characters"))]
    pub isbn: Option<String>,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: Option<String>,
    pub genre: Option<String>,
}
