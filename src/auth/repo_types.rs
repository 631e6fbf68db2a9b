use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string
    pub created_at: OffsetDateTime,
}

/// The single refresh-token row owned by a user.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshCredential {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: Option<String>, // None once logged out
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl RefreshCredential {
    /// Digest to verify against, if the credential is still live at `now`.
    pub fn live_hash(&self, now: OffsetDateTime) -> Option<&str> {
        match self.token_hash.as_deref() {
            Some(h) if !h.is_empty() && self.expires_at > now => Some(h),
            _ => None,
        }
    }
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub login: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
}
