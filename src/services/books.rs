//! Book registry service

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{BookQuery, CreateBook, UpdateBook},
        loan::LoanQuery,
        Book, EntityKind,
    },
    repository::Repository,
};

use super::ids;

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Register a new book; it starts out available
    pub async fn create(&self, request: CreateBook) -> AppResult<Book> {
        let mut uow = self.repository.begin().await?;
        let id = ids::next_id(uow.as_mut(), EntityKind::Book).await?;
        let book = Book::new(id, request);
        uow.insert_book(&book).await?;
        uow.commit().await?;

        tracing::info!("Book {} registered: {}", book.id, book.title);
        Ok(book)
    }

    /// Get book by ID
    pub async fn get(&self, id: &str) -> AppResult<Book> {
        let mut uow = self.repository.begin().await?;
        let book = uow.find_book(id).await?;
        uow.rollback().await?;
        book.ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    pub async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut uow = self.repository.begin().await?;
        let books = uow.list_books(query).await?;
        uow.rollback().await?;
        Ok(books)
    }

    /// Update bibliographic fields. Availability is left untouched.
    pub async fn update(&self, id: &str, update: UpdateBook) -> AppResult<Book> {
        let mut uow = self.repository.begin().await?;
        let book = uow
            .lock_book(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?
            .apply(update);
        if !uow.update_book(&book).await? {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }
        uow.commit().await?;
        Ok(book)
    }

    /// Delete a book that has never been lent
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let mut uow = self.repository.begin().await?;
        if uow.lock_book(id).await?.is_none() {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }

        let query = LoanQuery {
            book_id: Some(id.to_string()),
            ..Default::default()
        };
        if !uow.list_loans(&query).await?.is_empty() {
            return Err(AppError::Conflict(format!(
                "Book {} has loan history and cannot be deleted",
                id
            )));
        }

        uow.delete_book(id).await?;
        uow.commit().await?;

        tracing::info!("Book {} deleted", id);
        Ok(())
    }
}
