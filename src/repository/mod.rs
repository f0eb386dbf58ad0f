//! Repository layer for database operations
//!
//! Every business operation runs inside one [`UnitOfWork`] obtained from a
//! [`Store`]. Dropping a unit of work without calling
//! [`UnitOfWork::commit`] discards all of its writes.

pub mod books;
pub mod loans;
pub mod memory;
pub mod postgres;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        book::BookQuery, loan::LoanQuery, user::UserQuery, Book, EntityKind, LoanRecord, User,
    },
};

/// Source of units of work
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Start a new unit of work
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;
}

/// One atomic sequence of reads and writes.
///
/// The `lock_*` reads take a row lock that is held until the unit of work
/// ends, so concurrent operations on the same user, book or loan serialize.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn find_book(&mut self, id: &str) -> AppResult<Option<Book>>;
    async fn lock_book(&mut self, id: &str) -> AppResult<Option<Book>>;
    async fn list_books(&mut self, query: &BookQuery) -> AppResult<Vec<Book>>;
    async fn insert_book(&mut self, book: &Book) -> AppResult<()>;
    async fn update_book(&mut self, book: &Book) -> AppResult<bool>;
    async fn delete_book(&mut self, id: &str) -> AppResult<bool>;

    async fn find_user(&mut self, id: &str) -> AppResult<Option<User>>;
    async fn lock_user(&mut self, id: &str) -> AppResult<Option<User>>;
    async fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>>;
    async fn list_users(&mut self, query: &UserQuery) -> AppResult<Vec<User>>;
    async fn insert_user(&mut self, user: &User) -> AppResult<()>;
    async fn update_user(&mut self, user: &User) -> AppResult<bool>;
    async fn delete_user(&mut self, id: &str) -> AppResult<bool>;

    async fn find_loan(&mut self, id: &str) -> AppResult<Option<LoanRecord>>;
    async fn lock_loan(&mut self, id: &str) -> AppResult<Option<LoanRecord>>;
    async fn list_loans(&mut self, query: &LoanQuery) -> AppResult<Vec<LoanRecord>>;
    async fn count_open_loans(&mut self, user_id: &str) -> AppResult<i64>;
    async fn insert_loan(&mut self, record: &LoanRecord) -> AppResult<()>;
    async fn update_loan(&mut self, record: &LoanRecord) -> AppResult<bool>;

    /// Numerically highest ID of the given kind. Reserves ID generation for
    /// this kind until the unit of work ends.
    async fn highest_id(&mut self, kind: EntityKind) -> AppResult<Option<String>>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Injected persistence handle shared by all services
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn Store>,
}

impl Repository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Repository backed by a PostgreSQL pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self::new(Arc::new(postgres::PgStore::new(pool)))
    }

    /// Repository backed by an in-process store
    pub fn memory(store: memory::MemoryStore) -> Self {
        Self::new(Arc::new(store))
    }

    pub async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        self.store.begin().await
    }
}
