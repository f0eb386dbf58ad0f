//! Books repository for database operations

use sqlx::PgConnection;

use crate::{
    error::AppResult,
    models::book::{Book, BookQuery},
};

const BOOK_COLUMNS: &str = "id, isbn, title, author, genre, available";

/// Get book by ID
pub async fn get_by_id(conn: &mut PgConnection, id: &str) -> AppResult<Option<Book>> {
    let book = sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(book)
}

/// Get book by ID and lock its row until the transaction ends
pub async fn lock_by_id(conn: &mut PgConnection, id: &str) -> AppResult<Option<Book>> {
    let book = sqlx::query_as::<_, Book>(&format!(
        "SELECT {} FROM books WHERE id = $1 FOR UPDATE",
        BOOK_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(book)
}

/// Search books by availability and free text
pub async fn search(conn: &mut PgConnection, query: &BookQuery) -> AppResult<Vec<Book>> {
    let books = sqlx::query_as::<_, Book>(&format!(
        r#"
        SELECT {}
        FROM books
        WHERE ($1::boolean IS NULL OR available = $1)
          AND ($2::text IS NULL
               OR title ILIKE '%' || $2 || '%'
               OR author ILIKE '%' || $2 || '%'
               OR isbn ILIKE '%' || $2 || '%'
               OR genre ILIKE '%' || $2 || '%')
        ORDER BY id
        "#,
        BOOK_COLUMNS
    ))
    .bind(query.available)
    .bind(query.search.as_deref())
    .fetch_all(conn)
    .await?;
    Ok(books)
}

/// Create a new book
pub async fn create(conn: &mut PgConnection, book: &Book) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO books (id, isbn, title, author, genre, available)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&book.id)
    .bind(&book.isbn)
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.genre)
    .bind(book.available)
    .execute(conn)
    .await?;
    Ok(())
}

/// Update a book, returns false when no row matched
pub async fn update(conn: &mut PgConnection, book: &Book) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE books
        SET isbn = $1, title = $2, author = $3, genre = $4, available = $5
        WHERE id = $6
        "#,
    )
    .bind(&book.isbn)
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.genre)
    .bind(book.available)
    .bind(&book.id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a book, returns false when no row matched
pub async fn delete(conn: &mut PgConnection, id: &str) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM books WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
