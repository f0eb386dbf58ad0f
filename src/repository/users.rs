//! Users repository for database operations

use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::user::{User, UserQuery},
};

const USER_COLUMNS: &str = "id, name, contact, membership_date, username, password_hash";

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// A write that lost a race for `username` is a conflict, not a storage failure
fn username_conflict(e: sqlx::Error, username: &str) -> AppError {
    let is_unique_violation = e
        .as_database_error()
        .and_then(|d| d.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION);
    if is_unique_violation {
        AppError::Conflict(format!("Username {} is already taken", username))
    } else {
        AppError::Database(e)
    }
}

/// Get user by ID
pub async fn get_by_id(conn: &mut PgConnection, id: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

/// Get user by ID and lock its row until the transaction ends
pub async fn lock_by_id(conn: &mut PgConnection, id: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = $1 FOR UPDATE",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}

/// Get user by login
pub async fn get_by_username(conn: &mut PgConnection, username: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE username = $1",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}

/// Search users by name, username or contact
pub async fn search(conn: &mut PgConnection, query: &UserQuery) -> AppResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {}
        FROM users
        WHERE $1::text IS NULL
           OR name ILIKE '%' || $1 || '%'
           OR username ILIKE '%' || $1 || '%'
           OR contact ILIKE '%' || $1 || '%'
        ORDER BY id
        "#,
        USER_COLUMNS
    ))
    .bind(query.search.as_deref())
    .fetch_all(conn)
    .await?;
    Ok(users)
}

/// Create a new user
pub async fn create(conn: &mut PgConnection, user: &User) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, name, contact, membership_date, username, password_hash)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.contact)
    .bind(user.membership_date)
    .bind(&user.username)
    .bind(&user.password_hash)
    .execute(conn)
    .await
    .map_err(|e| username_conflict(e, &user.username))?;
    Ok(())
}

/// Update a user, returns false when no row matched
pub async fn update(conn: &mut PgConnection, user: &User) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET name = $1, contact = $2, membership_date = $3, username = $4, password_hash = $5
        WHERE id = $6
        "#,
    )
    .bind(&user.name)
    .bind(&user.contact)
    .bind(user.membership_date)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&user.id)
    .execute(conn)
    .await
    .map_err(|e| username_conflict(e, &user.username))?;
    Ok(result.rows_affected() > 0)
}

/// Delete a user, returns false when no row matched
pub async fn delete(conn: &mut PgConnection, id: &str) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
