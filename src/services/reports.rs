//! Read-only reporting queries

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    error::AppResult,
    models::{
        book::BookQuery,
        loan::{money, LoanQuery, OverdueLoan},
        report::ReportSummary,
        user::UserQuery,
        Book, LoanRecord,
    },
    repository::Repository,
};

use super::fines::LoanPolicy;

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
    policy: LoanPolicy,
}

impl ReportsService {
    pub fn new(repository: Repository, policy: LoanPolicy) -> Self {
        Self { repository, policy }
    }

    /// Books currently on the shelf
    pub async fn available_books(&self) -> AppResult<Vec<Book>> {
        let mut uow = self.repository.begin().await?;
        let books = uow
            .list_books(&BookQuery {
                available: Some(true),
                search: None,
            })
            .await?;
        uow.rollback().await?;
        Ok(books)
    }

    /// Open loan records
    pub async fn borrowed(&self) -> AppResult<Vec<LoanRecord>> {
        let mut uow = self.repository.begin().await?;
        let records = uow.list_loans(&LoanQuery::open_loans()).await?;
        uow.rollback().await?;
        Ok(records)
    }

    /// Open loans past the lending period on `as_of`, with the fine they
    /// would carry if returned that day
    pub async fn overdue(&self, as_of: NaiveDate) -> AppResult<Vec<OverdueLoan>> {
        let open = self.borrowed().await?;
        Ok(self.overdue_among(open, as_of))
    }

    fn overdue_among(&self, open: Vec<LoanRecord>, as_of: NaiveDate) -> Vec<OverdueLoan> {
        open.into_iter()
            .filter(|record| self.policy.is_overdue(record.borrow_date, as_of))
            .map(|record| OverdueLoan {
                days_overdue: self.policy.overdue_days(record.borrow_date, as_of),
                current_fine: self.policy.fine(record.borrow_date, as_of),
                record,
            })
            .collect()
    }

    pub async fn summary(&self, as_of: NaiveDate) -> AppResult<ReportSummary> {
        let mut uow = self.repository.begin().await?;
        let books = uow.list_books(&BookQuery::default()).await?;
        let users = uow.list_users(&UserQuery::default()).await?;
        let records = uow.list_loans(&LoanQuery::default()).await?;
        uow.rollback().await?;

        let unpaid_fines = money(
            records
                .iter()
                .filter(|r| !r.is_open() && !r.fine_paid)
                .map(|r| r.fine)
                .sum::<Decimal>(),
        );
        let open: Vec<LoanRecord> = records.into_iter().filter(LoanRecord::is_open).collect();

        Ok(ReportSummary {
            total_books: books.len() as i64,
            available_books: books.iter().filter(|b| b.available).count() as i64,
            total_users: users.len() as i64,
            open_loans: open.len() as i64,
            overdue_loans: self.overdue_among(open, as_of).len() as i64,
            unpaid_fines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{book::CreateBook, user::CreateUser},
        repository::memory::MemoryStore,
        services::{books::BooksService, loans::LoansService, users::UsersService},
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Three books, one user; B001 lent on Jan 1, B002 lent on Jan 10,
    /// B003 lent and returned five days late
    async fn library() -> (ReportsService, LoansService) {
        let repository = Repository::memory(MemoryStore::new());
        let books = BooksService::new(repository.clone());
        for title in ["Emma", "Persuasion", "Sanditon"] {
            books
                .create(CreateBook {
                    isbn: "9780141439587".to_string(),
                    title: title.to_string(),
                    author: "Jane Austen".to_string(),
                    genre: None,
                })
                .await
                .unwrap();
        }
        UsersService::new(repository.clone())
            .create(CreateUser {
                name: "Reader".to_string(),
                contact: None,
                membership_date: None,
                username: "reader".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();

        let loans = LoansService::new(repository.clone(), LoanPolicy::default());
        loans.borrow("U001", "B003", date(2023, 12, 1)).await.unwrap();
        loans.return_loan("R001", date(2023, 12, 20)).await.unwrap();
        loans.borrow("U001", "B001", date(2024, 1, 1)).await.unwrap();
        loans.borrow("U001", "B002", date(2024, 1, 10)).await.unwrap();

        (ReportsService::new(repository, LoanPolicy::default()), loans)
    }

    #[tokio::test]
    async fn test_available_and_borrowed() {
        let (reports, _) = library().await;

        let available = reports.available_books().await.unwrap();
        let borrowed = reports.borrowed().await.unwrap();

        assert_eq!(available.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(), ["B003"]);
        assert_eq!(
            borrowed.iter().map(|r| r.book_id.as_str()).collect::<Vec<_>>(),
            ["B001", "B002"]
        );
    }

    #[tokio::test]
    async fn test_overdue_carries_live_fine() {
        let (reports, _) = library().await;

        let overdue = reports.overdue(date(2024, 1, 20)).await.unwrap();

        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].record.book_id, "B001");
        assert_eq!(overdue[0].days_overdue, 5);
        assert_eq!(overdue[0].current_fine, Decimal::from(50));
    }

    #[tokio::test]
    async fn test_overdue_is_not_persisted() {
        let (reports, loans) = library().await;

        reports.overdue(date(2024, 3, 1)).await.unwrap();

        assert_eq!(loans.get("R002").await.unwrap().fine, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_summary() {
        let (reports, _) = library().await;

        let summary = reports.summary(date(2024, 1, 20)).await.unwrap();

        assert_eq!(
            summary,
            ReportSummary {
                total_books: 3,
                available_books: 1,
                total_users: 1,
                open_loans: 2,
                overdue_loans: 1,
                unpaid_fines: Decimal::from(50),
            }
        );
    }
}
