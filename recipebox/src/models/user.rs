use chrono::{DateTime, Duration, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::auth::{generate_token, hash_password};

/// A token is only reused while it has more than this much validity left.
pub const TOKEN_REUSE_MARGIN_SECS: i64 = 60;

/// How far into the past a revoked token's expiry is pushed.
pub const TOKEN_REVOKE_BACKDATE_SECS: i64 = 61;

#[derive(Debug, Serialize, Deserialize, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar: Option<String>,
    pub created_on: DateTime<Utc>,
    pub token: Option<String>,
    #[serde(skip_serializing)]
    pub token_exp: Option<DateTime<Utc>>,
}

impl User {
    /// True while the stored token has not yet expired.
    pub fn has_valid_token(&self, now: DateTime<Utc>) -> bool {
        matches!((&self.token, self.token_exp), (Some(_), Some(exp)) if exp > now)
    }

    /// Makes sure the user holds a usable token.
    ///
    /// The current token is kept when it still has more than a minute left, so a client
    /// hammering `/login` doesn't churn through tokens. Returns `true` when a new token
    /// was minted and the row needs saving.
    pub fn issue_token(&mut self, now: DateTime<Utc>, ttl_secs: i64) -> bool {
        let reuse_until = now + Duration::seconds(TOKEN_REUSE_MARGIN_SECS);
        if let (Some(_), Some(exp)) = (&self.token, self.token_exp) {
            if exp > reuse_until {
                return false;
            }
        }

        // Saturates instead of panicking on a lifetime chrono can't represent.
        let exp = TimeDelta::try_seconds(ttl_secs)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.token = Some(generate_token());
        self.token_exp = Some(exp);
        true
    }

    /// Expires the current token immediately. The token value itself stays on the row.
    pub fn revoke_token(&mut self, now: DateTime<Utc>) {
        self.token_exp = Some(now - Duration::seconds(TOKEN_REVOKE_BACKDATE_SECS));
    }

    /// Applies a partial profile update. Omitted fields keep their value.
    pub fn apply(&mut self, changes: UserChanges) -> Result<(), argon2::password_hash::Error> {
        if let Some(username) = changes.username {
            self.username = username.trim().to_string();
        }
        if let Some(email) = changes.email {
            self.email = normalize_email(&email);
        }
        if let Some(password) = changes.password {
            self.password_hash = hash_password(&password)?;
        }
        if let Some(avatar) = changes.avatar {
            self.avatar = Some(avatar);
        }
        Ok(())
    }
}

/// Emails are compared case-insensitively, so they are stored lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Insert payload for the store. Password is already hashed by the time we get here.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<String>,
}
