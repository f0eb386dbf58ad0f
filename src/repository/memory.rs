//! In-process store
//!
//! A unit of work holds the store's mutex for its whole lifetime and writes
//! to a working copy of the tables. Commit swaps the copy in; dropping the
//! unit of work throws it away. All units of work are therefore serialized.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, UnitOfWork};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookQuery, loan::LoanQuery, user::UserQuery, Book, EntityKind, LoanRecord, User,
    },
};

/// Write step that can be made to fail, for exercising rollbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    InsertBook,
    UpdateBook,
    InsertUser,
    UpdateUser,
    InsertLoan,
    UpdateLoan,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    books: BTreeMap<String, Book>,
    users: BTreeMap<String, User>,
    loans: BTreeMap<String, LoanRecord>,
}

#[derive(Debug, Default)]
struct State {
    tables: Tables,
    fail_point: Option<FailPoint>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later unit of work fail at `point`
    pub async fn fail_on(&self, point: FailPoint) {
        self.state.lock().await.fail_point = Some(point);
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.fail_point = None;
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.tables.clone();
        let fail_point = guard.fail_point;
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            fail_point,
        }))
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<State>,
    working: Tables,
    fail_point: Option<FailPoint>,
}

impl MemoryUnitOfWork {
    fn check(&self, point: FailPoint) -> AppResult<()> {
        if self.fail_point == Some(point) {
            return Err(AppError::Storage(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }
}

/// Numeric part of `id` when it is `<prefix><digits>`
fn sequence_of(id: &str, prefix: char) -> Option<u64> {
    let digits = id.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn highest<'a>(ids: impl Iterator<Item = &'a String>, prefix: char) -> Option<String> {
    ids.filter_map(|id| sequence_of(id, prefix).map(|n| (n, id)))
        .max_by_key(|(n, _)| *n)
        .map(|(_, id)| id.clone())
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_book(&mut self, id: &str) -> AppResult<Option<Book>> {
        Ok(self.working.books.get(id).cloned())
    }

    async fn lock_book(&mut self, id: &str) -> AppResult<Option<Book>> {
        self.find_book(id).await
    }

    async fn list_books(&mut self, query: &BookQuery) -> AppResult<Vec<Book>> {
        Ok(self
            .working
            .books
            .values()
            .filter(|b| query.available.map_or(true, |a| b.available == a))
            .filter(|b| query.search.as_deref().map_or(true, |s| b.matches(s)))
            .cloned()
            .collect())
    }

    async fn insert_book(&mut self, book: &Book) -> AppResult<()> {
        self.check(FailPoint::InsertBook)?;
        if self.working.books.contains_key(&book.id) {
            return Err(AppError::Storage(format!("duplicate book id {}", book.id)));
        }
        self.working.books.insert(book.id.clone(), book.clone());
        Ok(())
    }

    async fn update_book(&mut self, book: &Book) -> AppResult<bool> {
        self.check(FailPoint::UpdateBook)?;
        match self.working.books.get_mut(&book.id) {
            Some(existing) => {
                *existing = book.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_book(&mut self, id: &str) -> AppResult<bool> {
        if self.working.loans.values().any(|l| l.book_id == id) {
            return Err(AppError::Storage(format!("book {} is referenced by loans", id)));
        }
        Ok(self.working.books.remove(id).is_some())
    }

    async fn find_user(&mut self, id: &str) -> AppResult<Option<User>> {
        Ok(self.working.users.get(id).cloned())
    }

    async fn lock_user(&mut self, id: &str) -> AppResult<Option<User>> {
        self.find_user(id).await
    }

    async fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .working
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&mut self, query: &UserQuery) -> AppResult<Vec<User>> {
        Ok(self
            .working
            .users
            .values()
            .filter(|u| query.search.as_deref().map_or(true, |s| u.matches(s)))
            .cloned()
            .collect())
    }

    async fn insert_user(&mut self, user: &User) -> AppResult<()> {
        self.check(FailPoint::InsertUser)?;
        if self.working.users.contains_key(&user.id) {
            return Err(AppError::Storage(format!("duplicate user id {}", user.id)));
        }
        if self.working.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Storage(format!("duplicate username {}", user.username)));
        }
        self.working.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn update_user(&mut self, user: &User) -> AppResult<bool> {
        self.check(FailPoint::UpdateUser)?;
        if self
            .working
            .users
            .values()
            .any(|u| u.username == user.username && u.id != user.id)
        {
            return Err(AppError::Storage(format!("duplicate username {}", user.username)));
        }
        match self.working.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&mut self, id: &str) -> AppResult<bool> {
        if self.working.loans.values().any(|l| l.user_id == id) {
            return Err(AppError::Storage(format!("user {} is referenced by loans", id)));
        }
        Ok(self.working.users.remove(id).is_some())
    }

    async fn find_loan(&mut self, id: &str) -> AppResult<Option<LoanRecord>> {
        Ok(self.working.loans.get(id).cloned())
    }

    async fn lock_loan(&mut self, id: &str) -> AppResult<Option<LoanRecord>> {
        self.find_loan(id).await
    }

    async fn list_loans(&mut self, query: &LoanQuery) -> AppResult<Vec<LoanRecord>> {
        let mut records: Vec<LoanRecord> = self
            .working
            .loans
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.borrow_date.cmp(&b.borrow_date).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn count_open_loans(&mut self, user_id: &str) -> AppResult<i64> {
        let count = self
            .working
            .loans
            .values()
            .filter(|r| r.user_id == user_id && r.is_open())
            .count();
        Ok(count as i64)
    }

    async fn insert_loan(&mut self, record: &LoanRecord) -> AppResult<()> {
        self.check(FailPoint::InsertLoan)?;
        if self.working.loans.contains_key(&record.id) {
            return Err(AppError::Storage(format!("duplicate loan id {}", record.id)));
        }
        if !self.working.users.contains_key(&record.user_id)
            || !self.working.books.contains_key(&record.book_id)
        {
            return Err(AppError::Storage(format!(
                "loan {} references a missing user or book",
                record.id
            )));
        }
        if record.is_open()
            && self
                .working
                .loans
                .values()
                .any(|r| r.book_id == record.book_id && r.is_open())
        {
            return Err(AppError::Storage(format!(
                "book {} already has an open loan",
                record.book_id
            )));
        }
        self.working.loans.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn update_loan(&mut self, record: &LoanRecord) -> AppResult<bool> {
        self.check(FailPoint::UpdateLoan)?;
        match self.working.loans.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn highest_id(&mut self, kind: EntityKind) -> AppResult<Option<String>> {
        let prefix = kind.prefix();
        Ok(match kind {
            EntityKind::Book => highest(self.working.books.keys(), prefix),
            EntityKind::User => highest(self.working.users.keys(), prefix),
            EntityKind::Loan => highest(self.working.loans.keys(), prefix),
        })
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.check(FailPoint::Commit)?;
        let MemoryUnitOfWork {
            mut guard, working, ..
        } = *self;
        guard.tables = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::book::CreateBook;

    fn book(id: &str) -> Book {
        Book::new(
            id.to_string(),
            CreateBook {
                isbn: "9780000000000".to_string(),
                title: format!("Title {}", id),
                author: "Author".to_string(),
                genre: None,
            },
        )
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryStore::new();

        let mut uow = store.begin().await.unwrap();
        uow.insert_book(&book("B001")).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        assert!(uow.find_book("B001").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_drop_discards_writes() {
        let store = MemoryStore::new();

        {
            let mut uow = store.begin().await.unwrap();
            uow.insert_book(&book("B001")).await.unwrap();
        }

        let mut uow = store.begin().await.unwrap();
        assert!(uow.find_book("B001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_commit_discards_writes() {
        let store = MemoryStore::new();
        store.fail_on(FailPoint::Commit).await;

        let mut uow = store.begin().await.unwrap();
        uow.insert_book(&book("B001")).await.unwrap();
        assert!(matches!(uow.commit().await, Err(AppError::Storage(_))));

        store.clear_failures().await;
        let mut uow = store.begin().await.unwrap();
        assert!(uow.list_books(&BookQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_highest_id_is_numeric_not_lexical() {
        let store = MemoryStore::new();

        let mut uow = store.begin().await.unwrap();
        for id in ["B009", "B010", "B1000", "Bxyz", "B002"] {
            uow.insert_book(&book(id)).await.unwrap();
        }
        assert_eq!(
            uow.highest_id(EntityKind::Book).await.unwrap().as_deref(),
            Some("B1000")
        );
        assert_eq!(uow.highest_id(EntityKind::User).await.unwrap(), None);
    }

    #[test]
    fn test_sequence_of() {
        assert_eq!(sequence_of("R042", 'R'), Some(42));
        assert_eq!(sequence_of("R", 'R'), None);
        assert_eq!(sequence_of("B042", 'R'), None);
        assert_eq!(sequence_of("R4x2", 'R'), None);
    }
}
