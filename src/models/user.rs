//! User (library member) model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Library member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    /// User ID (`U001`, `U002`, ...)
    pub id: String,
    pub name: String,
    pub contact: Option<String>,
    pub membership_date: Option<NaiveDate>,
    /// Login, unique across users
    pub username: String,
    /// Argon2 PHC string
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

impl User {
    pub fn new(id: String, user: CreateUser, password_hash: String) -> Self {
        Self {
            id,
            name: user.name,
            contact: user.contact,
            membership_date: user.membership_date,
            username: user.username,
            password_hash,
        }
    }

    /// Apply an update request; a new password must already be hashed
    pub fn apply(self, update: UpdateUser, password_hash: Option<String>) -> Self {
        Self {
            name: update.name.unwrap_or(self.name),
            contact: update.contact.or(self.contact),
            membership_date: update.membership_date.or(self.membership_date),
            username: update.username.unwrap_or(self.username),
            password_hash: password_hash.unwrap_or(self.password_hash),
            ..self
        }
    }

    /// Case-insensitive match on name, username or contact
    pub fn matches(&self, search: &str) -> bool {
        let needle = search.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.username.to_lowercase().contains(&needle)
            || self
                .contact
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&needle))
    }
}

/// User query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// Free text search on name, username and contact
    pub search: Option<String>,
}

/// Create user request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub contact: Option<String>,
    pub membership_date: Option<NaiveDate>,
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
}

/// Update user request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    pub contact: Option<String>,
    pub membership_date: Option<NaiveDate>,
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: Option<String>,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: Option<String>,
}

/// Credential check request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}
