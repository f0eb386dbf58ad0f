//! Loan records repository for database operations

use sqlx::PgConnection;

use crate::{
    error::AppResult,
    models::loan::{LoanQuery, LoanRecord},
};

const LOAN_COLUMNS: &str = "id, user_id, book_id, borrow_date, return_date, fine, fine_paid";

/// Get loan record by ID
pub async fn get_by_id(conn: &mut PgConnection, id: &str) -> AppResult<Option<LoanRecord>> {
    let record = sqlx::query_as::<_, LoanRecord>(&format!(
        "SELECT {} FROM loan_records WHERE id = $1",
        LOAN_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(record)
}

/// Get loan record by ID and lock its row until the transaction ends
pub async fn lock_by_id(conn: &mut PgConnection, id: &str) -> AppResult<Option<LoanRecord>> {
    let record = sqlx::query_as::<_, LoanRecord>(&format!(
        "SELECT {} FROM loan_records WHERE id = $1 FOR UPDATE",
        LOAN_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(record)
}

/// List loan records, oldest borrow first
pub async fn search(conn: &mut PgConnection, query: &LoanQuery) -> AppResult<Vec<LoanRecord>> {
    let records = sqlx::query_as::<_, LoanRecord>(&format!(
        r#"
        SELECT {}
        FROM loan_records
        WHERE ($1::boolean IS NULL OR (return_date IS NULL) = $1)
          AND ($2::text IS NULL OR user_id = $2)
          AND ($3::text IS NULL OR book_id = $3)
        ORDER BY borrow_date, id
        "#,
        LOAN_COLUMNS
    ))
    .bind(query.open)
    .bind(query.user_id.as_deref())
    .bind(query.book_id.as_deref())
    .fetch_all(conn)
    .await?;
    Ok(records)
}

/// Count a user's open loans
pub async fn count_open_for_user(conn: &mut PgConnection, user_id: &str) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM loan_records WHERE user_id = $1 AND return_date IS NULL",
    )
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

/// Create a new loan record
pub async fn create(conn: &mut PgConnection, record: &LoanRecord) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO loan_records (id, user_id, book_id, borrow_date, return_date, fine, fine_paid)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(&record.id)
    .bind(&record.user_id)
    .bind(&record.book_id)
    .bind(record.borrow_date)
    .bind(record.return_date)
    .bind(record.fine)
    .bind(record.fine_paid)
    .execute(conn)
    .await?;
    Ok(())
}

/// Update the mutable part of a loan record
pub async fn update(conn: &mut PgConnection, record: &LoanRecord) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE loan_records
        SET return_date = $1, fine = $2, fine_paid = $3
        WHERE id = $4
        "#,
    )
    .bind(record.return_date)
    .bind(record.fine)
    .bind(record.fine_paid)
    .bind(&record.id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
