use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, RefreshCredential, User};

#[derive(Error, Debug)]
pub enum StoreError {
    /// Login or username already taken, from the pre-check or the unique index.
    #[error("user already exists")]
    Conflict,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Persistence for users and their single refresh credential.
///
/// Every mutating call is atomic on its own: implementations run the
/// existence check and the write under one transaction (or one lock hold).
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_refresh_credential(
        &self,
        user_id: Uuid,
    ) -> Result<Option<RefreshCredential>, StoreError>;

    /// Insert the row for `user_id` or replace its hash and expiry in place.
    async fn upsert_refresh_hash(
        &self,
        user_id: Uuid,
        hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError>;

    /// Replace the hash only if the row still holds `expected`.
    ///
    /// Returns `false` when another writer got there first.
    async fn swap_refresh_hash(
        &self,
        user_id: Uuid,
        expected: &str,
        hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<bool, StoreError>;

    /// Empty the stored hash. A user without a row is not an error.
    async fn clear_refresh_hash(&self, user_id: Uuid) -> Result<(), StoreError>;

    /// Check-then-insert in one transaction. Fails with [`StoreError::Conflict`]
    /// when the login or username is taken.
    async fn create_user(&self, user: NewUser<'_>) -> Result<User, StoreError>;
}
