use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::auth::{
    repo::{CredentialStore, StoreError},
    repo_types::{NewUser, RefreshCredential, User},
};

#[derive(Clone)]
pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_insert_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
        _ => StoreError::Database(e),
    }
}

async fn user_exists_tx(
    tx: &mut Transaction<'_, Postgres>,
    login: &str,
    username: &str,
) -> Result<bool, StoreError> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM users WHERE login = $1 OR username = $2
        )
        "#,
    )
    .bind(login)
    .bind(username)
    .fetch_one(&mut **tx)
    .await?;
    Ok(exists)
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, login, username, password_hash, created_at
            FROM users
            WHERE login = $1
            "#,
        )
        .bind(login)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, login, username, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_refresh_credential(
        &self,
        user_id: Uuid,
    ) -> Result<Option<RefreshCredential>, StoreError> {
        let row = sqlx::query_as::<_, RefreshCredential>(
            r#"
            SELECT id, user_id, token_hash, created_at, expires_at
            FROM refresh_tokens
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn upsert_refresh_hash(
        &self,
        user_id: Uuid,
        hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await.context("begin upsert refresh hash")?;
        // The unique index on user_id turns a racing insert into an update.
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET token_hash = EXCLUDED.token_hash,
                          expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(user_id)
        .bind(hash)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await.context("commit upsert refresh hash")?;
        debug!(%user_id, "refresh hash upserted");
        Ok(())
    }

    async fn swap_refresh_hash(
        &self,
        user_id: Uuid,
        expected: &str,
        hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        let mut tx = self.db.begin().await.context("begin swap refresh hash")?;
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
               SET token_hash = $3,
                   expires_at = $4
             WHERE user_id = $1
               AND token_hash = $2
            "#,
        )
        .bind(user_id)
        .bind(expected)
        .bind(hash)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await.context("commit swap refresh hash")?;
        let swapped = result.rows_affected() == 1;
        debug!(%user_id, swapped, "refresh hash swap");
        Ok(swapped)
    }

    async fn clear_refresh_hash(&self, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(r#"UPDATE refresh_tokens SET token_hash = NULL WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser<'_>) -> Result<User, StoreError> {
        let mut tx = self.db.begin().await.context("begin create user")?;

        if user_exists_tx(&mut tx, user.login, user.username).await? {
            return Err(StoreError::Conflict);
        }

        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (login, username, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, login, username, password_hash, created_at
            "#,
        )
        .bind(user.login)
        .bind(user.username)
        .bind(user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_insert_error)?;

        tx.commit().await.map_err(map_insert_error)?;
        Ok(created)
    }
}
