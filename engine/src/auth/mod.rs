//! Accounts and session tokens
//!
//! Passwords are stored as Argon2id PHC strings. A successful register or
//! login issues an opaque 32-character bearer token stored in the `sessions`
//! table with an expiry; expired sessions are removed when they are next
//! presented and by [`AuthService::purge_expired`].

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use rand::Rng;
use sdk::errors::AppError;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::db::{db_error, is_unique_violation, unix_now, Database, Session, User};

const TOKEN_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_EMAIL_LEN: usize = 254;
const INVALID_CREDENTIALS: &str = "Invalid email or password";
const ALREADY_REGISTERED: &str = "email is already registered";

/// Hash checked when the email is unknown, so a miss costs as much as a
/// wrong password
static DUMMY_HASH: OnceLock<String> = OnceLock::new();

fn dummy_hash() -> &'static str {
    DUMMY_HASH.get_or_init(|| hash_password("subtrack-unknown-account").unwrap_or_default())
}

/// A user together with a freshly issued session
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub user: User,
    pub token: String,
    pub expires_at: i64,
}

/// Generate a random alphanumeric session token
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..62u8);
            match idx {
                0..=25 => (b'A' + idx) as char,
                26..=51 => (b'a' + (idx - 26)) as char,
                _ => (b'0' + (idx - 52)) as char,
            }
        })
        .collect()
}

/// Lower-case and trim an email, rejecting obviously malformed input
pub fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    let valid = email.len() <= MAX_EMAIL_LEN
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));

    if !valid {
        return Err(AppError::InvalidInput("email is not valid".to_string()));
    }
    Ok(email)
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Database(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Register, log in, authenticate and log out
#[derive(Clone)]
pub struct AuthService {
    db: Database,
    session_ttl_secs: i64,
}

impl AuthService {
    pub fn new(db: Database, session_ttl_hours: u32) -> Self {
        Self {
            db,
            session_ttl_secs: i64::from(session_ttl_hours) * 3600,
        }
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<IssuedSession, AppError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidInput(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let users = self.db.users();
        if users.find_by_email(&email).await.map_err(db_error)?.is_some() {
            return Err(AppError::Conflict(ALREADY_REGISTERED.to_string()));
        }

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Database(format!("Password hashing task failed: {}", e)))??;

        // A concurrent registration can still win the race to the insert
        let user = users
            .create_user(&email, &password_hash)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(ALREADY_REGISTERED.to_string())
                } else {
                    db_error(e)
                }
            })?;
        info!(user_id = %user.id, "Registered user");

        self.issue_session(user).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession, AppError> {
        let unauthorized = || AppError::Unauthorized(INVALID_CREDENTIALS.to_string());

        let email = normalize_email(email).map_err(|_| unauthorized())?;
        let user = self
            .db
            .users()
            .find_by_email(&email)
            .await
            .map_err(db_error)?;

        let password = password.to_string();
        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        let matches = tokio::task::spawn_blocking(move || {
            let hash = stored_hash.as_deref().unwrap_or_else(|| dummy_hash());
            verify_password(&password, hash)
        })
        .await
        .map_err(|e| AppError::Database(format!("Password check task failed: {}", e)))?;

        let user = match user {
            Some(user) if matches => user,
            Some(user) => {
                debug!(user_id = %user.id, "Rejected login");
                return Err(unauthorized());
            }
            None => return Err(unauthorized()),
        };

        self.issue_session(user).await
    }

    /// Resolve a bearer token to its user id
    pub async fn authenticate(&self, token: &str) -> Result<String, AppError> {
        let sessions = self.db.sessions();
        let session = sessions
            .get_session(token)
            .await
            .map_err(db_error)?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        let now = unix_now().map_err(db_error)?;
        if session.is_expired(now) {
            sessions.delete_session(token).await.map_err(db_error)?;
            return Err(AppError::Unauthorized(
                "Invalid or expired token".to_string(),
            ));
        }

        Ok(session.user_id)
    }

    pub async fn current_user(&self, user_id: &str) -> Result<User, AppError> {
        self.db
            .users()
            .get_user(user_id)
            .await
            .map_err(db_error)?
            .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))
    }

    /// Revoke a session. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<(), AppError> {
        self.db
            .sessions()
            .delete_session(token)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let now = unix_now().map_err(db_error)?;
        self.db
            .sessions()
            .delete_expired(now)
            .await
            .map_err(db_error)
    }

    async fn issue_session(&self, user: User) -> Result<IssuedSession, AppError> {
        let now = unix_now().map_err(db_error)?;
        let session = Session {
            token: generate_token(),
            user_id: user.id.clone(),
            created_at: now,
            expires_at: now + self.session_ttl_secs,
        };

        self.db
            .sessions()
            .create_session(&session)
            .await
            .map_err(db_error)?;

        Ok(IssuedSession {
            user,
            token: session.token,
            expires_at: session.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token() {
        let token1 = generate_token();
        let token2 = generate_token();

        assert_eq!(token1.len(), 32);
        assert_eq!(token2.len(), 32);
        assert_ne!(token1, token2);
        assert!(token1.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Me@Example.COM ").unwrap(), "me@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("me@localhost").is_err());
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-phc-string"));
    }

    #[test]
    fn test_dummy_hash_is_a_real_hash() {
        let hash = dummy_hash();

        assert!(hash.starts_with("$argon2"));
        assert!(PasswordHash::new(hash).is_ok());
        assert!(!verify_password("correct horse", hash));
        assert_eq!(dummy_hash(), hash);
    }
}
