//! Loan management service: borrowing and returning books

use chrono::NaiveDate;

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{
            BorrowOutcome, BorrowRejection, LoanQuery, LoanRecord, ReturnOutcome, ReturnRejection,
        },
        EntityKind,
    },
    repository::Repository,
};

use super::{fines::LoanPolicy, ids};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    policy: LoanPolicy,
}

impl LoansService {
    pub fn new(repository: Repository, policy: LoanPolicy) -> Self {
        Self { repository, policy }
    }

    pub fn policy(&self) -> &LoanPolicy {
        &self.policy
    }

    /// Lend a book to a user.
    ///
    /// Checks run in order and the first failing one is reported: the user
    /// exists, the user is under the borrowing limit, the book exists and is
    /// available. On success the new record and the book's availability are
    /// committed together.
    pub async fn borrow(
        &self,
        user_id: &str,
        book_id: &str,
        borrow_date: NaiveDate,
    ) -> AppResult<BorrowOutcome> {
        let mut uow = self.repository.begin().await?;

        let user = uow.lock_user(user_id).await?;
        if user.is_none() {
            uow.rollback().await?;
            return Ok(self.declined(user_id, book_id, BorrowRejection::UnknownUser));
        }

        let active = uow.count_open_loans(user_id).await?;
        if active >= self.policy.borrowing_limit {
            uow.rollback().await?;
            let rejection = BorrowRejection::LimitReached {
                active,
                limit: self.policy.borrowing_limit,
            };
            return Ok(self.declined(user_id, book_id, rejection));
        }

        let found = uow.lock_book(book_id).await?;
        let book = match found {
            Some(book) if book.available => book,
            Some(_) => {
                uow.rollback().await?;
                return Ok(self.declined(user_id, book_id, BorrowRejection::BookUnavailable));
            }
            None => {
                uow.rollback().await?;
                return Ok(self.declined(user_id, book_id, BorrowRejection::UnknownBook));
            }
        };

        let record_id = ids::next_id(uow.as_mut(), EntityKind::Loan).await?;
        let record = LoanRecord::open(
            record_id,
            user_id.to_string(),
            book_id.to_string(),
            borrow_date,
        );

        uow.insert_loan(&record).await?;
        if !uow.update_book(&book.with_availability(false)).await? {
            return Err(AppError::Storage(format!(
                "Book {} vanished while being lent",
                book_id
            )));
        }
        uow.commit().await?;

        tracing::info!(
            "Book {} lent to user {} as loan {} on {}",
            book_id, user_id, record.id, borrow_date
        );
        Ok(BorrowOutcome::Borrowed(record))
    }

    fn declined(&self, user_id: &str, book_id: &str, rejection: BorrowRejection) -> BorrowOutcome {
        tracing::info!(
            "Borrow of book {} by user {} declined: {}",
            book_id, user_id, rejection
        );
        BorrowOutcome::Rejected(rejection)
    }

    /// Close an open loan on `return_date`.
    ///
    /// The fine is computed from the borrow date and the return date. The
    /// closed record and the book's availability are committed together;
    /// `fine_paid` is settled separately.
    pub async fn return_loan(
        &self,
        record_id: &str,
        return_date: NaiveDate,
    ) -> AppResult<ReturnOutcome> {
        let mut uow = self.repository.begin().await?;

        let found = uow.lock_loan(record_id).await?;
        let rejection = match &found {
            None => Some(ReturnRejection::UnknownLoan),
            Some(record) if !record.is_open() => Some(ReturnRejection::AlreadyReturned),
            Some(record) if return_date < record.borrow_date => {
                Some(ReturnRejection::ReturnBeforeBorrow)
            }
            Some(_) => None,
        };
        let record = match (found, rejection) {
            (Some(record), None) => record,
            (_, rejection) => {
                uow.rollback().await?;
                let rejection = rejection.unwrap_or(ReturnRejection::UnknownLoan);
                tracing::info!("Return of loan {} declined: {}", record_id, rejection);
                return Ok(ReturnOutcome::Rejected(rejection));
            }
        };

        let fine = self.policy.fine(record.borrow_date, return_date);
        let closed = record.close(return_date, fine);

        if !uow.update_loan(&closed).await? {
            return Err(AppError::Storage(format!(
                "Loan record {} vanished while being returned",
                record_id
            )));
        }

        let book = uow.lock_book(&closed.book_id).await?.ok_or_else(|| {
            AppError::Storage(format!(
                "Book {} of loan {} is missing",
                closed.book_id, record_id
            ))
        })?;
        if !uow.update_book(&book.with_availability(true)).await? {
            return Err(AppError::Storage(format!(
                "Book {} vanished while being returned",
                closed.book_id
            )));
        }
        uow.commit().await?;

        tracing::info!(
            "Loan {} returned on {} with fine {}",
            record_id, return_date, closed.fine
        );
        Ok(ReturnOutcome::Returned(closed))
    }

    /// Get loan record by ID
    pub async fn get(&self, record_id: &str) -> AppResult<LoanRecord> {
        let mut uow = self.repository.begin().await?;
        let record = uow.find_loan(record_id).await?;
        uow.rollback().await?;
        record.ok_or_else(|| AppError::NotFound(format!("Loan record {} not found", record_id)))
    }

    /// List loan records
    pub async fn list(&self, query: &LoanQuery) -> AppResult<Vec<LoanRecord>> {
        let mut uow = self.repository.begin().await?;
        let records = uow.list_loans(query).await?;
        uow.rollback().await?;
        Ok(records)
    }

    /// Number of open loans held by a user
    pub async fn active_loan_count(&self, user_id: &str) -> AppResult<i64> {
        let mut uow = self.repository.begin().await?;
        let count = uow.count_open_loans(user_id).await?;
        uow.rollback().await?;
        Ok(count)
    }
}
