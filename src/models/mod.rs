//! Data models for Bookdesk

pub mod book;
pub mod loan;
pub mod report;
pub mod user;

// Re-export commonly used types
pub use book::Book;
pub use loan::LoanRecord;
pub use user::User;

/// Entity families that carry generated, prefixed IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Book,
    User,
    Loan,
}

impl EntityKind {
    /// ID prefix: `B` for books, `U` for users, `R` for loan records
    pub fn prefix(&self) -> char {
        match self {
            EntityKind::Book => 'B',
            EntityKind::User => 'U',
            EntityKind::Loan => 'R',
        }
    }
}
