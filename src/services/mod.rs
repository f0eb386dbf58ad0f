//! Business logic services

pub mod books;
pub mod fines;
pub mod ids;
pub mod loans;
pub mod reports;
pub mod users;

use crate::{error::AppResult, repository::Repository};

use self::fines::LoanPolicy;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub books: books::BooksService,
    pub users: users::UsersService,
    pub loans: loans::LoansService,
    pub fines: fines::FinesService,
    pub reports: reports::ReportsService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, policy: LoanPolicy) -> Self {
        Self {
            books: books::BooksService::new(repository.clone()),
            users: users::UsersService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone(), policy),
            fines: fines::FinesService::new(repository.clone(), policy),
            reports: reports::ReportsService::new(repository.clone(), policy),
            repository,
        }
    }

    /// Open and discard a unit of work to prove the store is reachable
    pub async fn check_store(&self) -> AppResult<()> {
        self.repository.begin().await?.rollback().await
    }
}
