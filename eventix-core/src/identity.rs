use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use eventix_shared::Masked;
use rand::Rng;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Role, User};
use crate::repository::{RepoResult, UserRepository};
use crate::{CoreError, CoreResult};

/// Short-lived store for e-mail verification codes (Redis in production).
#[async_trait]
pub trait VerificationCodeCache: Send + Sync {
    async fn store_code(&self, email: &str, code: &str, ttl_seconds: u64) -> RepoResult<()>;

    async fn fetch_code(&self, email: &str) -> RepoResult<Option<String>>;

    async fn remove_code(&self, email: &str) -> RepoResult<()>;
}

/// Outbound mail delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification_code(&self, to: &str, code: &str) -> RepoResult<()>;
}

#[derive(Debug, Clone)]
pub struct IdentitySettings {
    pub code_ttl_seconds: u64,
    /// Addresses that register with the admin role.
    pub admin_emails: Vec<String>,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            code_ttl_seconds: 15 * 60,
            admin_emails: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Registration, e-mail verification and credential checks.
///
/// Session tokens are minted by the HTTP layer once `authenticate` succeeds.
pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    codes: Option<Arc<dyn VerificationCodeCache>>,
    mailer: Arc<dyn Mailer>,
    settings: IdentitySettings,
}

impl IdentityService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        codes: Option<Arc<dyn VerificationCodeCache>>,
        mailer: Arc<dyn Mailer>,
        settings: IdentitySettings,
    ) -> Self {
        Self { users, codes, mailer, settings }
    }

    pub async fn register(&self, registration: Registration) -> CoreResult<User> {
        let email = normalize_email(&registration.email);
        let name = registration.name.trim().to_string();

        if name.is_empty() || registration.password.is_empty() {
            return Err(CoreError::InvalidInput("name and password are required".to_string()));
        }
        if !email.contains('@') {
            return Err(CoreError::InvalidInput("a valid email is required".to_string()));
        }

        // An unverified account for the same address is replaced
        if let Some(existing) = self.users.find_user_by_email(&email).await? {
            if existing.is_verified {
                return Err(CoreError::Conflict("email is already registered".to_string()));
            }
            self.users.delete_user(existing.id).await?;
        }

        let password_hash = hash_password_blocking(registration.password).await?;
        let code = generate_verification_code();
        let role = if self.settings.admin_emails.iter().any(|a| normalize_email(a) == email) {
            Role::Admin
        } else {
            Role::User
        };

        let user = User {
            id: Uuid::new_v4(),
            name,
            email: email.clone(),
            password_hash,
            role,
            is_verified: false,
            verify_code: Some(code.clone()),
            verify_expires_at: Some(Utc::now() + Duration::seconds(self.settings.code_ttl_seconds as i64)),
            created_at: Utc::now(),
        };

        // Cache first, then mail; a failed send must not leave a live code behind
        if let Some(codes) = &self.codes {
            codes.store_code(&email, &code, self.settings.code_ttl_seconds).await?;
        }
        if let Err(e) = self.mailer.send_verification_code(&email, &code).await {
            if let Some(codes) = &self.codes {
                if let Err(cleanup) = codes.remove_code(&email).await {
                    warn!("Failed to drop verification code for {}: {}", Masked(&email), cleanup);
                }
            }
            return Err(CoreError::ExternalService(format!("could not send verification code: {}", e)));
        }

        self.users.insert_user(&user).await?;
        info!(user_id = %user.id, role = %user.role, "Registered user {}", Masked(&email));

        Ok(user)
    }

    pub async fn verify_email(&self, email: &str, code: &str) -> CoreResult<()> {
        let email = normalize_email(email);
        let user = self.users.find_user_by_email(&email).await?
            .ok_or_else(|| CoreError::NotFound("user not found".to_string()))?;

        if user.is_verified {
            return Err(CoreError::Conflict("account is already verified".to_string()));
        }

        // The cache is authoritative when present
        let expected = match &self.codes {
            Some(codes) => codes.fetch_code(&email).await?,
            None => match (&user.verify_code, user.verify_expires_at) {
                (Some(stored), Some(expires_at)) if Utc::now() <= expires_at => Some(stored.clone()),
                _ => None,
            },
        };

        let expected = expected
            .ok_or_else(|| CoreError::Unauthorized("verification code has expired".to_string()))?;
        if expected != code.trim() {
            return Err(CoreError::Unauthorized("verification code is incorrect".to_string()));
        }

        self.users.mark_verified(user.id).await?;

        if let Some(codes) = &self.codes {
            if let Err(e) = codes.remove_code(&email).await {
                warn!("Failed to drop verification code for {}: {}", Masked(&email), e);
            }
        }

        info!(user_id = %user.id, "Email verified");
        Ok(())
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> CoreResult<User> {
        let email = normalize_email(email);
        let invalid = || CoreError::Unauthorized("invalid email or password".to_string());

        let user = self.users.find_user_by_email(&email).await?.ok_or_else(invalid)?;
        if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await? {
            return Err(invalid());
        }
        if !user.is_verified {
            return Err(CoreError::Forbidden("email has not been verified".to_string()));
        }

        Ok(user)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Six decimal digits, zero padded.
pub fn generate_verification_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

pub fn hash_password(password: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CoreError::ExternalService(format!("password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// Argon2 is CPU bound; both helpers run it on the blocking pool.
pub async fn hash_password_blocking(password: String) -> CoreResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| CoreError::ExternalService(format!("password hashing task failed: {}", e)))?
}

pub async fn verify_password_blocking(password: String, hash: String) -> CoreResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| CoreError::ExternalService(format!("password check task failed: {}", e)))
}
