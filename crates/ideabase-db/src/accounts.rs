//! Account and session repository.
//!
//! Passwords are stored as Argon2id PHC strings. Session tokens are random
//! alphanumeric strings handed to the client once; only their SHA-256 hex
//! digest is persisted.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use ideabase_core::{
    defaults, AccountRepository, Credentials, Error, Identity, Result, Session,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Generate a cryptographically secure random string.
pub fn generate_secret(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// A new prefixed session token.
pub fn generate_session_token() -> String {
    format!(
        "{}{}",
        defaults::SESSION_TOKEN_PREFIX,
        generate_secret(defaults::SESSION_TOKEN_LENGTH)
    )
}

/// SHA-256 hex digest of a token, as stored in `user_session.token_hash`.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill(&mut salt);
    let salt = SaltString::encode_b64(&salt)
        .map_err(|e| Error::Internal(format!("Failed to encode salt: {}", e)))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored PHC string. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Canonical form of an email address (trimmed, lower-cased).
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Reject malformed emails and short passwords before touching the database.
pub fn validate_credentials(credentials: &Credentials) -> Result<String> {
    let email = normalize_email(&credentials.email);
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(' ')
        }
        None => false,
    };
    if !well_formed {
        return Err(Error::InvalidInput("A valid email address is required".into()));
    }
    if credentials.password.chars().count() < defaults::MIN_PASSWORD_LENGTH {
        return Err(Error::InvalidInput(format!(
            "Password must be at least {} characters",
            defaults::MIN_PASSWORD_LENGTH
        )));
    }
    Ok(email)
}

/// PostgreSQL implementation of AccountRepository.
pub struct PgAccountRepository {
    pool: Pool<Postgres>,
    session_ttl: Duration,
}

impl PgAccountRepository {
    /// Create a new PgAccountRepository with the default session lifetime.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            session_ttl: Duration::hours(defaults::SESSION_TTL_HOURS),
        }
    }

    /// Override how long issued sessions stay valid.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Delete expired and revoked sessions. Returns the number removed.
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let removed = sqlx::query(
            "DELETE FROM user_session WHERE expires_at < $1 OR revoked_at IS NOT NULL",
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?
        .rows_affected();
        Ok(removed)
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn sign_up(&self, credentials: &Credentials) -> Result<Identity> {
        let email = validate_credentials(credentials)?;
        let password_hash = hash_password(&credentials.password)?;
        let id = Uuid::now_v7();

        let result = sqlx::query(
            "INSERT INTO app_user (id, email, password_hash, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(&email)
        .bind(&password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            let err = Error::Database(e);
            return Err(if err.is_unique_violation() {
                Error::Conflict("An account with this email already exists".into())
            } else {
                err
            });
        }

        info!(
            subsystem = "db",
            component = "accounts",
            op = "sign_up",
            owner_id = %id,
            "Account created"
        );
        Ok(Identity { user_id: id, email })
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        let email = normalize_email(&credentials.email);
        let row = sqlx::query("SELECT id, email, password_hash FROM app_user WHERE LOWER(email) = $1")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::Unauthorized(INVALID_CREDENTIALS.into()))?;

        let stored: String = row.get("password_hash");
        if !verify_password(&credentials.password, &stored) {
            debug!(
                subsystem = "db",
                component = "accounts",
                op = "sign_in",
                success = false,
                "Password verification failed"
            );
            return Err(Error::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        let user_id: Uuid = row.get("id");
        let token = generate_session_token();
        let now = Utc::now();
        let expires_at = now + self.session_ttl;

        sqlx::query(
            "INSERT INTO user_session (id, user_id, token_hash, created_at, expires_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(hash_token(&token))
        .bind(now)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(Session {
            token,
            user_id,
            email: row.get("email"),
            expires_at,
        })
    }

    async fn sign_out(&self, token: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE user_session SET revoked_at = $1 WHERE token_hash = $2 AND revoked_at IS NULL",
        )
        .bind(Utc::now())
        .bind(hash_token(token))
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn resolve(&self, token: &str) -> Result<Option<Identity>> {
        let row = sqlx::query(
            "SELECT u.id, u.email
             FROM user_session s
             JOIN app_user u ON u.id = s.user_id
             WHERE s.token_hash = $1 AND s.revoked_at IS NULL AND s.expires_at > $2",
        )
        .bind(hash_token(token))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|row| Identity {
            user_id: row.get("id"),
            email: row.get("email"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_generate_secret() {
        let secret = generate_secret(32);
        assert_eq!(secret.len(), 32);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(secret, generate_secret(32));
    }

    #[test]
    fn test_session_token_shape() {
        let token = generate_session_token();
        assert!(token.starts_with(defaults::SESSION_TOKEN_PREFIX));
        assert_eq!(
            token.len(),
            defaults::SESSION_TOKEN_PREFIX.len() + defaults::SESSION_TOKEN_LENGTH
        );
    }

    #[test]
    fn test_hash_token_is_sha256_hex() {
        let hash = hash_token("ib_st_abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("ib_st_abc"));
        assert_ne!(hash, hash_token("ib_st_abd"));
    }

    #[test]
    fn test_password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-phc-string"));
    }

    #[test]
    fn test_validate_credentials_normalizes_email() {
        let email = validate_credentials(&creds("  Ada@Example.COM ", "longenough")).unwrap();
        assert_eq!(email, "ada@example.com");
    }

    #[test]
    fn test_validate_credentials_rejects_bad_input() {
        assert!(validate_credentials(&creds("no-at-sign", "longenough")).is_err());
        assert!(validate_credentials(&creds("@example.com", "longenough")).is_err());
        assert!(validate_credentials(&creds("a@b.c", "short")).is_err());
    }
}
