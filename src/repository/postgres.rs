//! PostgreSQL store
//!
//! Each unit of work is a `sqlx` transaction. Locking reads use
//! `SELECT ... FOR UPDATE`, and ID generation takes a transaction-scoped
//! advisory lock per entity kind, so two borrows can never read the same
//! highest record ID.

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres, Transaction};

use super::{books, loans, users, Store, UnitOfWork};
use crate::{
    error::AppResult,
    models::{
        book::BookQuery, loan::LoanQuery, user::UserQuery, Book, EntityKind, LoanRecord, User,
    },
};

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl PgUnitOfWork {
    fn conn(&mut self) -> &mut PgConnection {
        &mut *self.tx
    }
}

fn table_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Book => "books",
        EntityKind::User => "users",
        EntityKind::Loan => "loan_records",
    }
}

/// Advisory lock key per entity kind
fn lock_key(kind: EntityKind) -> i64 {
    match kind {
        EntityKind::Book => 0x626f_6f6b_0001,
        EntityKind::User => 0x626f_6f6b_0002,
        EntityKind::Loan => 0x626f_6f6b_0003,
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_book(&mut self, id: &str) -> AppResult<Option<Book>> {
        books::get_by_id(self.conn(), id).await
    }

    async fn lock_book(&mut self, id: &str) -> AppResult<Option<Book>> {
        books::lock_by_id(self.conn(), id).await
    }

    async fn list_books(&mut self, query: &BookQuery) -> AppResult<Vec<Book>> {
        books::search(self.conn(), query).await
    }

    async fn insert_book(&mut self, book: &Book) -> AppResult<()> {
        books::create(self.conn(), book).await
    }

    async fn update_book(&mut self, book: &Book) -> AppResult<bool> {
        books::update(self.conn(), book).await
    }

    async fn delete_book(&mut self, id: &str) -> AppResult<bool> {
        books::delete(self.conn(), id).await
    }

    async fn find_user(&mut self, id: &str) -> AppResult<Option<User>> {
        users::get_by_id(self.conn(), id).await
    }

    async fn lock_user(&mut self, id: &str) -> AppResult<Option<User>> {
        users::lock_by_id(self.conn(), id).await
    }

    async fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>> {
        users::get_by_username(self.conn(), username).await
    }

    async fn list_users(&mut self, query: &UserQuery) -> AppResult<Vec<User>> {
        users::search(self.conn(), query).await
    }

    async fn insert_user(&mut self, user: &User) -> AppResult<()> {
        users::create(self.conn(), user).await
    }

    async fn update_user(&mut self, user: &User) -> AppResult<bool> {
        users::update(self.conn(), user).await
    }

    async fn delete_user(&mut self, id: &str) -> AppResult<bool> {
        users::delete(self.conn(), id).await
    }

    async fn find_loan(&mut self, id: &str) -> AppResult<Option<LoanRecord>> {
        loans::get_by_id(self.conn(), id).await
    }

    async fn lock_loan(&mut self, id: &str) -> AppResult<Option<LoanRecord>> {
        loans::lock_by_id(self.conn(), id).await
    }

    async fn list_loans(&mut self, query: &LoanQuery) -> AppResult<Vec<LoanRecord>> {
        loans::search(self.conn(), query).await
    }

    async fn count_open_loans(&mut self, user_id: &str) -> AppResult<i64> {
        loans::count_open_for_user(self.conn(), user_id).await
    }

    async fn insert_loan(&mut self, record: &LoanRecord) -> AppResult<()> {
        loans::create(self.conn(), record).await
    }

    async fn update_loan(&mut self, record: &LoanRecord) -> AppResult<bool> {
        loans::update(self.conn(), record).await
    }

    async fn highest_id(&mut self, kind: EntityKind) -> AppResult<Option<String>> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(lock_key(kind))
            .execute(self.conn())
            .await?;

        let pattern = format!("^{}[0-9]+$", kind.prefix());
        let highest: Option<String> = sqlx::query_scalar(&format!(
            r#"
            SELECT id FROM {}
            WHERE id ~ $1
            ORDER BY CAST(SUBSTRING(id FROM 2) AS NUMERIC) DESC
            LIMIT 1
            "#,
            table_for(kind)
        ))
        .bind(pattern)
        .fetch_optional(self.conn())
        .await?;

        Ok(highest)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
