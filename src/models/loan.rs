//! Loan record model and the outcomes of the lending workflows

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Decimal places carried by every amount of money
pub const MONEY_SCALE: u32 = 2;

/// `amount` rounded and padded to [`MONEY_SCALE`] places, so `50` reads `50.00`
pub fn money(amount: Decimal) -> Decimal {
    let mut amount = amount.round_dp(MONEY_SCALE);
    amount.rescale(MONEY_SCALE);
    amount
}

/// Borrow transaction. `return_date == None` means the loan is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanRecord {
    /// Record ID (`R001`, `R002`, ...)
    pub id: String,
    pub user_id: String,
    pub book_id: String,
    pub borrow_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    #[schema(value_type = String, example = "50.00")]
    pub fine: Decimal,
    pub fine_paid: bool,
}

impl LoanRecord {
    /// A freshly opened loan: no return date, no fine
    pub fn open(id: String, user_id: String, book_id: String, borrow_date: NaiveDate) -> Self {
        Self {
            id,
            user_id,
            book_id,
            borrow_date,
            return_date: None,
            fine: money(Decimal::ZERO),
            fine_paid: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }

    /// Settled copy of this loan. `fine_paid` is left untouched.
    pub fn close(&self, return_date: NaiveDate, fine: Decimal) -> Self {
        Self {
            return_date: Some(return_date),
            fine: money(fine),
            ..self.clone()
        }
    }

    pub fn mark_fine_paid(&self) -> Self {
        Self {
            fine_paid: true,
            ..self.clone()
        }
    }
}

/// Loan list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LoanQuery {
    /// `true` for open loans only, `false` for returned loans only
    pub open: Option<bool>,
    pub user_id: Option<String>,
    pub book_id: Option<String>,
}

impl LoanQuery {
    pub fn open_loans() -> Self {
        Self {
            open: Some(true),
            ..Default::default()
        }
    }

    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            ..Default::default()
        }
    }

    pub fn matches(&self, record: &LoanRecord) -> bool {
        self.open.map_or(true, |open| record.is_open() == open)
            && self.user_id.as_ref().map_or(true, |id| &record.user_id == id)
            && self.book_id.as_ref().map_or(true, |id| &record.book_id == id)
    }
}

/// Why a borrow request was declined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorrowRejection {
    UnknownUser,
    LimitReached { active: i64, limit: i64 },
    UnknownBook,
    BookUnavailable,
}

impl BorrowRejection {
    /// Stable machine-readable reason
    pub fn code(&self) -> &'static str {
        match self {
            BorrowRejection::UnknownUser => "unknown_user",
            BorrowRejection::LimitReached { .. } => "limit_reached",
            BorrowRejection::UnknownBook => "unknown_book",
            BorrowRejection::BookUnavailable => "book_unavailable",
        }
    }
}

impl std::fmt::Display for BorrowRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BorrowRejection::UnknownUser => write!(f, "User not found"),
            BorrowRejection::LimitReached { active, limit } => {
                write!(f, "Borrowing limit reached ({}/{})", active, limit)
            }
            BorrowRejection::UnknownBook => write!(f, "Book not found"),
            BorrowRejection::BookUnavailable => write!(f, "Book is not available"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorrowOutcome {
    Borrowed(LoanRecord),
    Rejected(BorrowRejection),
}

/// Why a return was declined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnRejection {
    UnknownLoan,
    AlreadyReturned,
    ReturnBeforeBorrow,
}

impl ReturnRejection {
    pub fn code(&self) -> &'static str {
        match self {
            ReturnRejection::UnknownLoan => "unknown_loan",
            ReturnRejection::AlreadyReturned => "already_returned",
            ReturnRejection::ReturnBeforeBorrow => "return_before_borrow",
        }
    }
}

impl std::fmt::Display for ReturnRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReturnRejection::UnknownLoan => write!(f, "Loan record not found"),
            ReturnRejection::AlreadyReturned => write!(f, "Loan already returned"),
            ReturnRejection::ReturnBeforeBorrow => {
                write!(f, "Return date is before the borrow date")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnOutcome {
    Returned(LoanRecord),
    Rejected(ReturnRejection),
}

/// Why a fine payment was declined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRejection {
    UnknownLoan,
    NoFineDue,
}

impl PaymentRejection {
    pub fn code(&self) -> &'static str {
        match self {
            PaymentRejection::UnknownLoan => "unknown_loan",
            PaymentRejection::NoFineDue => "no_fine_due",
        }
    }
}

impl std::fmt::Display for PaymentRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentRejection::UnknownLoan => write!(f, "Loan record not found"),
            PaymentRejection::NoFineDue => write!(f, "No fine is due on this loan"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Paid(LoanRecord),
    Rejected(PaymentRejection),
}

/// Open loan past the lending period, with its fine as of the report date
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OverdueLoan {
    #[serde(flatten)]
    pub record: LoanRecord,
    pub days_overdue: i64,
    #[schema(value_type = String, example = "50.00")]
    pub current_fine: Decimal,
}

/// Live fine estimate for a loan
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FineEstimate {
    pub record_id: String,
    pub as_of: NaiveDate,
    pub days_held: i64,
    #[schema(value_type = String, example = "50.00")]
    pub fine: Decimal,
}
