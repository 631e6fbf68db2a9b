//! In-process credential store.
//!
//! Backs tests and database-less local runs. A single mutex guards both
//! tables, so every call sees and writes a consistent snapshot the way a
//! transaction would.
use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::{
    repo::{CredentialStore, StoreError},
    repo_types::{NewUser, RefreshCredential, User},
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    refresh: HashMap<Uuid, RefreshCredential>, // keyed by user_id
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    tables: Mutex<Tables>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.lock().await.users.len()
    }

    pub async fn refresh_row_count(&self, user_id: Uuid) -> usize {
        self.tables
            .lock()
            .await
            .refresh
            .values()
            .filter(|r| r.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.login == login).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_refresh_credential(
        &self,
        user_id: Uuid,
    ) -> Result<Option<RefreshCredential>, StoreError> {
        Ok(self.tables.lock().await.refresh.get(&user_id).cloned())
    }

    async fn upsert_refresh_hash(
        &self,
        user_id: Uuid,
        hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::Internal(anyhow::anyhow!(
                "refresh credential references unknown user {user_id}"
            )));
        }
        tables
            .refresh
            .entry(user_id)
            .and_modify(|row| {
                row.token_hash = Some(hash.to_string());
                row.expires_at = expires_at;
            })
            .or_insert_with(|| RefreshCredential {
                id: Uuid::new_v4(),
                user_id,
                token_hash: Some(hash.to_string()),
                created_at: OffsetDateTime::now_utc(),
                expires_at,
            });
        Ok(())
    }

    async fn swap_refresh_hash(
        &self,
        user_id: Uuid,
        expected: &str,
        hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        match tables.refresh.get_mut(&user_id) {
            Some(row) if row.token_hash.as_deref() == Some(expected) => {
                row.token_hash = Some(hash.to_string());
                row.expires_at = expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_refresh_hash(&self, user_id: Uuid) -> Result<(), StoreError> {
        if let Some(row) = self.tables.lock().await.refresh.get_mut(&user_id) {
            row.token_hash = None;
        }
        Ok(())
    }

    async fn create_user(&self, user: NewUser<'_>) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        let taken = tables
            .users
            .values()
            .any(|u| u.login == user.login || u.username == user.username);
        if taken {
            return Err(StoreError::Conflict);
        }
        let created = User {
            id: Uuid::new_v4(),
            login: user.login.to_string(),
            username: user.username.to_string(),
            password_hash: user.password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }
}
