//! Overdue fines: calculation and payment

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::loan::{money, FineEstimate, PaymentOutcome, PaymentRejection},
    repository::Repository,
};

/// Maximum number of simultaneously open loans per user
pub const BORROWING_LIMIT: i64 = 3;
/// Days a book may be held before fines accrue
pub const LENDING_PERIOD_DAYS: i64 = 14;
/// Fine per whole day past the lending period
pub const FINE_PER_DAY: Decimal = Decimal::TEN;

/// Lending rules applied by the loan, fine and report services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanPolicy {
    pub borrowing_limit: i64,
    pub lending_period_days: i64,
    pub fine_per_day: Decimal,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            borrowing_limit: BORROWING_LIMIT,
            lending_period_days: LENDING_PERIOD_DAYS,
            fine_per_day: FINE_PER_DAY,
        }
    }
}

impl From<&LoansConfig> for LoanPolicy {
    fn from(config: &LoansConfig) -> Self {
        Self {
            borrowing_limit: config.borrowing_limit,
            lending_period_days: config.lending_period_days,
            fine_per_day: config.fine_per_day,
        }
    }
}

impl LoanPolicy {
    /// Calendar days between borrowing and `as_of`
    pub fn days_held(borrow_date: NaiveDate, as_of: NaiveDate) -> i64 {
        (as_of - borrow_date).num_days()
    }

    /// Whole days past the lending period, never negative
    pub fn overdue_days(&self, borrow_date: NaiveDate, as_of: NaiveDate) -> i64 {
        (Self::days_held(borrow_date, as_of) - self.lending_period_days).max(0)
    }

    pub fn is_overdue(&self, borrow_date: NaiveDate, as_of: NaiveDate) -> bool {
        self.overdue_days(borrow_date, as_of) > 0
    }

    /// Fine owed for a loan borrowed on `borrow_date`, evaluated at `as_of`
    pub fn fine(&self, borrow_date: NaiveDate, as_of: NaiveDate) -> Decimal {
        money(Decimal::from(self.overdue_days(borrow_date, as_of)) * self.fine_per_day)
    }
}

/// Fine under the standard policy
pub fn calculate_fine(borrow_date: NaiveDate, as_of: NaiveDate) -> Decimal {
    LoanPolicy::default().fine(borrow_date, as_of)
}

#[derive(Clone)]
pub struct FinesService {
    repository: Repository,
    policy: LoanPolicy,
}

impl FinesService {
    pub fn new(repository: Repository, policy: LoanPolicy) -> Self {
        Self { repository, policy }
    }

    /// Mark a loan's fine as paid.
    ///
    /// Only loans carrying a positive fine can be paid; paying an already
    /// paid fine succeeds without changes.
    pub async fn pay_fine(&self, record_id: &str) -> AppResult<PaymentOutcome> {
        let mut uow = self.repository.begin().await?;

        let found = uow.lock_loan(record_id).await?;
        let record = match found {
            Some(record) => record,
            None => {
                uow.rollback().await?;
                return Ok(PaymentOutcome::Rejected(PaymentRejection::UnknownLoan));
            }
        };

        if record.fine <= Decimal::ZERO {
            uow.rollback().await?;
            tracing::info!("Fine payment declined for loan {}: no fine due", record_id);
            return Ok(PaymentOutcome::Rejected(PaymentRejection::NoFineDue));
        }

        if record.fine_paid {
            uow.rollback().await?;
            return Ok(PaymentOutcome::Paid(record));
        }

        let paid = record.mark_fine_paid();
        if !uow.update_loan(&paid).await? {
            return Err(AppError::Storage(format!(
                "Loan record {} vanished during fine payment",
                record_id
            )));
        }
        uow.commit().await?;

        tracing::info!("Fine of {} paid for loan {}", paid.fine, record_id);
        Ok(PaymentOutcome::Paid(paid))
    }

    /// Fine for a loan as of `as_of`; the settled fine once returned
    pub async fn estimate(&self, record_id: &str, as_of: NaiveDate) -> AppResult<FineEstimate> {
        let mut uow = self.repository.begin().await?;
        let record = uow
            .find_loan(record_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan record {} not found", record_id)))?;
        uow.rollback().await?;

        let estimate = match record.return_date {
            Some(returned) => FineEstimate {
                record_id: record.id,
                as_of: returned,
                days_held: LoanPolicy::days_held(record.borrow_date, returned),
                fine: record.fine,
            },
            None => FineEstimate {
                days_held: LoanPolicy::days_held(record.borrow_date, as_of),
                fine: self.policy.fine(record.borrow_date, as_of),
                record_id: record.id,
                as_of,
            },
        };
        Ok(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{book::CreateBook, user::User, Book, LoanRecord},
        repository::{memory::MemoryStore, Store},
    };
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case::within_period(date(2024, 1, 1), date(2024, 1, 10), Decimal::ZERO)]
    #[case::last_free_day(date(2024, 1, 1), date(2024, 1, 15), Decimal::ZERO)]
    #[case::first_fined_day(date(2024, 1, 1), date(2024, 1, 16), Decimal::from(10))]
    #[case::five_days_late(date(2024, 1, 1), date(2024, 1, 20), Decimal::from(50))]
    #[case::same_day(date(2024, 1, 1), date(2024, 1, 1), Decimal::ZERO)]
    #[case::across_leap_day(date(2024, 2, 1), date(2024, 3, 1), Decimal::from(150))]
    #[case::as_of_before_borrow(date(2024, 1, 10), date(2024, 1, 1), Decimal::ZERO)]
    fn test_calculate_fine(
        #[case] borrowed: NaiveDate,
        #[case] as_of: NaiveDate,
        #[case] expected: Decimal,
    ) {
        assert_eq!(calculate_fine(borrowed, as_of), expected);
    }

    #[rstest]
    #[case::no_fine(date(2024, 1, 10), "0.00")]
    #[case::five_days(date(2024, 1, 20), "50.00")]
    fn test_fine_has_two_decimal_places(#[case] as_of: NaiveDate, #[case] expected: &str) {
        assert_eq!(calculate_fine(date(2024, 1, 1), as_of).to_string(), expected);
    }

    #[test]
    fn test_custom_policy() {
        let policy = LoanPolicy {
            borrowing_limit: 5,
            lending_period_days: 7,
            fine_per_day: Decimal::new(250, 2),
        };
        assert_eq!(policy.fine(date(2024, 1, 1), date(2024, 1, 11)), Decimal::new(750, 2));
        assert!(policy.is_overdue(date(2024, 1, 1), date(2024, 1, 9)));
        assert!(!policy.is_overdue(date(2024, 1, 1), date(2024, 1, 8)));
    }

    async fn store_with_loan(fine: Decimal, fine_paid: bool) -> MemoryStore {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        uow.insert_user(&User {
            id: "U001".to_string(),
            name: "Reader".to_string(),
            contact: None,
            membership_date: None,
            username: "reader".to_string(),
            password_hash: String::new(),
        })
        .await
        .unwrap();
        uow.insert_book(&Book::new(
            "B001".to_string(),
            CreateBook {
                isbn: "9780000000001".to_string(),
                title: "Book".to_string(),
                author: "Author".to_string(),
                genre: None,
            },
        ))
        .await
        .unwrap();
        let record = LoanRecord {
            fine_paid,
            ..LoanRecord::open(
                "R001".to_string(),
                "U001".to_string(),
                "B001".to_string(),
                date(2024, 1, 1),
            )
            .close(date(2024, 1, 20), fine)
        };
        uow.insert_loan(&record).await.unwrap();
        uow.commit().await.unwrap();
        store
    }

    async fn stored_loan(store: &MemoryStore) -> LoanRecord {
        let mut uow = store.begin().await.unwrap();
        uow.find_loan("R001").await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_pay_zero_fine_is_declined() {
        let store = store_with_loan(Decimal::ZERO, false).await;
        let service = FinesService::new(Repository::memory(store.clone()), LoanPolicy::default());

        let outcome = service.pay_fine("R001").await.unwrap();

        assert_eq!(outcome, PaymentOutcome::Rejected(PaymentRejection::NoFineDue));
        assert!(!stored_loan(&store).await.fine_paid);
    }

    #[tokio::test]
    async fn test_pay_fine_marks_paid() {
        let store = store_with_loan(Decimal::from(50), false).await;
        let service = FinesService::new(Repository::memory(store.clone()), LoanPolicy::default());

        let outcome = service.pay_fine("R001").await.unwrap();

        assert!(matches!(outcome, PaymentOutcome::Paid(ref r) if r.fine_paid));
        assert!(stored_loan(&store).await.fine_paid);
    }

    #[tokio::test]
    async fn test_pay_fine_twice_is_idempotent() {
        let store = store_with_loan(Decimal::from(50), true).await;
        let service = FinesService::new(Repository::memory(store.clone()), LoanPolicy::default());

        let outcome = service.pay_fine("R001").await.unwrap();

        assert!(matches!(outcome, PaymentOutcome::Paid(ref r) if r.fine_paid));
    }

    #[tokio::test]
    async fn test_pay_unknown_loan() {
        let service = FinesService::new(Repository::memory(MemoryStore::new()), LoanPolicy::default());
        assert_eq!(
            service.pay_fine("R404").await.unwrap(),
            PaymentOutcome::Rejected(PaymentRejection::UnknownLoan)
        );
    }

    #[tokio::test]
    async fn test_estimate_of_returned_loan_is_settled_fine() {
        let store = store_with_loan(Decimal::from(50), false).await;
        let service = FinesService::new(Repository::memory(store), LoanPolicy::default());

        let estimate = service.estimate("R001", date(2024, 6, 1)).await.unwrap();

        assert_eq!(estimate.as_of, date(2024, 1, 20));
        assert_eq!(estimate.days_held, 19);
        assert_eq!(estimate.fine, Decimal::from(50));
    }
}
