//! Sign-up, sign-in, refresh rotation and logout.
//!
//! Only a salted digest of the current refresh token is ever stored, one row
//! per user. Refresh is rotate-on-use: the digest is swapped for the new
//! token's digest with a compare-and-swap on the digest that was verified,
//! so of two requests presenting the same token at most one succeeds.
use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        claims::SessionPayload,
        jwt::{TokenCodec, TokenPair},
        password::SecretHasher,
        repo::CredentialStore,
        repo_types::{NewUser, User},
    },
    error::AuthError,
};

pub const SIGN_UP_MESSAGE: &str = "You have successfully completed registration";

pub struct SignUp<'a> {
    pub login: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn {
    pub id: Uuid,
    pub username: String,
}

/// Identity attached by the refresh gate.
#[derive(Debug, Clone)]
pub struct RefreshIdentity {
    pub payload: SessionPayload,
    pub raw_token: String,
}

pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn SecretHasher>,
    codec: TokenCodec,
    // Verified against when the login is unknown, so both sign-in failures cost the same.
    dummy_digest: String,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn SecretHasher>,
        codec: TokenCodec,
    ) -> anyhow::Result<Self> {
        let dummy_digest = hasher.hash(&Uuid::new_v4().to_string())?;
        Ok(Self {
            store,
            hasher,
            codec,
            dummy_digest,
        })
    }

    #[instrument(skip_all, fields(login = %input.login))]
    pub async fn sign_up(&self, input: SignUp<'_>) -> Result<&'static str, AuthError> {
        if input.password != input.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        // Hashed before the store transaction opens so the transaction stays short.
        let password_hash = self.hasher.hash(input.password)?;
        let user = self
            .store
            .create_user(NewUser {
                login: input.login,
                username: input.username,
                password_hash: &password_hash,
            })
            .await
            .map_err(|e| {
                warn!(error = %e, "sign up rejected");
                AuthError::from(e)
            })?;

        info!(user_id = %user.id, "user registered");
        Ok(SIGN_UP_MESSAGE)
    }

    #[instrument(skip_all, fields(login = %login))]
    pub async fn sign_in(
        &self,
        login: &str,
        password: &str,
    ) -> Result<(SignedIn, TokenPair), AuthError> {
        let user = match self.store.find_user_by_login(login).await? {
            Some(u) => u,
            None => {
                let _ = self.hasher.verify(password, &self.dummy_digest);
                warn!("sign in unknown login");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            warn!(user_id = %user.id, "sign in wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.codec.issue_pair(&payload_of(&user))?;
        let digest = self.hasher.hash(&tokens.refresh.token)?;
        self.store
            .upsert_refresh_hash(user.id, &digest, tokens.refresh.expires_at)
            .await?;

        info!(user_id = %user.id, "user signed in");
        Ok((
            SignedIn {
                id: user.id,
                username: user.username,
            },
            tokens,
        ))
    }

    #[instrument(skip_all, fields(user_id = %identity.payload.id))]
    pub async fn refresh(&self, identity: &RefreshIdentity) -> Result<TokenPair, AuthError> {
        let user_id = identity.payload.id;

        let Some(user) = self.store.find_user_by_id(user_id).await? else {
            warn!("refresh for unknown user");
            return Err(AuthError::InvalidToken);
        };

        let credential = self.store.find_refresh_credential(user_id).await?;
        let Some(stored) = credential
            .as_ref()
            .and_then(|c| c.live_hash(OffsetDateTime::now_utc()))
        else {
            warn!("refresh without a live credential");
            return Err(AuthError::InvalidToken);
        };

        if !self.hasher.verify(&identity.raw_token, stored)? {
            warn!("refresh token does not match stored digest");
            return Err(AuthError::InvalidToken);
        }

        let tokens = self.codec.issue_pair(&payload_of(&user))?;
        let digest = self.hasher.hash(&tokens.refresh.token)?;
        let swapped = self
            .store
            .swap_refresh_hash(user_id, stored, &digest, tokens.refresh.expires_at)
            .await?;
        if !swapped {
            warn!("refresh token consumed by a concurrent request");
            return Err(AuthError::InvalidToken);
        }

        info!("session rotated");
        Ok(tokens)
    }

    #[instrument(skip(self))]
    pub async fn logout(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.store.clear_refresh_hash(user_id).await?;
        info!("user logged out");
        Ok(())
    }
}

fn payload_of(user: &User) -> SessionPayload {
    SessionPayload {
        id: user.id,
        login: user.login.clone(),
    }
}
