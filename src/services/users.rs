//! User registry service: members, credentials and their loans

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::LoanQuery,
        user::{CreateUser, UpdateUser, UserQuery},
        EntityKind, LoanRecord, User,
    },
    repository::{Repository, UnitOfWork},
};

use super::ids;

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Register a new member
    pub async fn create(&self, mut request: CreateUser) -> AppResult<User> {
        let password_hash = hash_password(&request.password)?;
        request.password.clear();

        let mut uow = self.repository.begin().await?;
        ensure_username_free(uow.as_mut(), &request.username, None).await?;

        let id = ids::next_id(uow.as_mut(), EntityKind::User).await?;
        let user = User::new(id, request, password_hash);
        uow.insert_user(&user).await?;
        uow.commit().await?;

        tracing::info!("User {} registered as {}", user.id, user.username);
        Ok(user)
    }

    /// Get user by ID
    pub async fn get(&self, id: &str) -> AppResult<User> {
        let mut uow = self.repository.begin().await?;
        let user = uow.find_user(id).await?;
        uow.rollback().await?;
        user.ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    pub async fn list(&self, query: &UserQuery) -> AppResult<Vec<User>> {
        let mut uow = self.repository.begin().await?;
        let users = uow.list_users(query).await?;
        uow.rollback().await?;
        Ok(users)
    }

    /// Update profile fields; a new password is rehashed
    pub async fn update(&self, id: &str, mut update: UpdateUser) -> AppResult<User> {
        let password_hash = update.password.take().map(|p| hash_password(&p)).transpose()?;

        let mut uow = self.repository.begin().await?;
        let current = uow
            .lock_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
        if let Some(ref username) = update.username {
            ensure_username_free(uow.as_mut(), username, Some(id)).await?;
        }

        let user = current.apply(update, password_hash);
        if !uow.update_user(&user).await? {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        uow.commit().await?;
        Ok(user)
    }

    /// Delete a user that has never borrowed
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let mut uow = self.repository.begin().await?;
        if uow.lock_user(id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        if !uow.list_loans(&LoanQuery::for_user(id)).await?.is_empty() {
            return Err(AppError::Conflict(format!(
                "User {} has loan history and cannot be deleted",
                id
            )));
        }

        uow.delete_user(id).await?;
        uow.commit().await?;

        tracing::info!("User {} deleted", id);
        Ok(())
    }

    /// Check credentials. `None` when the username is unknown or the
    /// password does not match.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<Option<User>> {
        let mut uow = self.repository.begin().await?;
        let user = uow.find_user_by_username(username).await?;
        uow.rollback().await?;

        match user {
            Some(user) if verify_password(&user, password)? => Ok(Some(user)),
            _ => {
                tracing::debug!("Rejected credentials for {}", username);
                Ok(None)
            }
        }
    }

    /// All loan records of a user, oldest first
    pub async fn loans(&self, id: &str) -> AppResult<Vec<LoanRecord>> {
        let mut uow = self.repository.begin().await?;
        if uow.find_user(id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        let records = uow.list_loans(&LoanQuery::for_user(id)).await?;
        uow.rollback().await?;
        Ok(records)
    }
}

async fn ensure_username_free(
    uow: &mut dyn UnitOfWork,
    username: &str,
    owner: Option<&str>,
) -> AppResult<()> {
    match uow.find_user_by_username(username).await? {
        Some(existing) if Some(existing.id.as_str()) != owner => Err(AppError::Conflict(
            format!("Username {} is already taken", username),
        )),
        _ => Ok(()),
    }
}

/// Hash a password using Argon2
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
