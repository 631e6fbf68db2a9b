use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::warn;

use crate::{
    auth::{
        cookies::CookieSettings,
        jwt::TokenCodec,
        password::{Argon2Hasher, SecretHasher},
        repo::CredentialStore,
        repo_memory::MemoryCredentialStore,
        repo_pg::PgCredentialStore,
        session::SessionManager,
    },
    config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionManager>,
    pub codec: TokenCodec,
    pub cookies: CookieSettings,
    pub db: Option<sqlx::PgPool>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let (store, db) = match &config.database_url {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                (
                    Arc::new(PgCredentialStore::new(db.clone())) as Arc<dyn CredentialStore>,
                    Some(db),
                )
            }
            None => {
                warn!("DATABASE_URL not set; sessions are kept in memory");
                (
                    Arc::new(MemoryCredentialStore::new()) as Arc<dyn CredentialStore>,
                    None,
                )
            }
        };

        let mut state = Self::from_parts(config, store, Arc::new(Argon2Hasher::default()))?;
        state.db = db;
        Ok(state)
    }

    pub fn from_parts(
        config: AppConfig,
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn SecretHasher>,
    ) -> anyhow::Result<Self> {
        let codec = TokenCodec::new(&config.jwt);
        let cookies = CookieSettings::new(&config.cookies);
        let sessions = Arc::new(SessionManager::new(store, hasher, codec.clone())?);
        Ok(Self {
            config: Arc::new(config),
            sessions,
            codec,
            cookies,
            db: None,
        })
    }
}
