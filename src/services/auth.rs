//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::{AuthConfig, CacheConfig},
    error::{AppError, AppResult},
    models::user::{RegisterUser, User, UserClaims},
    repository::Repository,
    services::cache::{self, CacheService},
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
    cache_config: CacheConfig,
    cache: CacheService,
}

impl AuthService {
    pub fn new(
        repository: Repository,
        config: AuthConfig,
        cache_config: CacheConfig,
        cache: CacheService,
    ) -> Self {
        Self {
            repository,
            config,
            cache_config,
            cache,
        }
    }

    /// Register a new user
    pub async fn register(&self, request: RegisterUser) -> AppResult<User> {
        if self.repository.users.email_exists(&request.email).await? {
            return Err(AppError::EmailTaken);
        }

        let password_hash = self.hash_password(&request.password)?;
        let user = self.repository.users.create(&request, &password_hash).await?;

        tracing::info!("Registered user {} ({})", user.id, user.role);

        self.cache
            .set_json(
                &cache::user_key(user.id),
                &user,
                self.cache_config.entity_ttl_seconds,
            )
            .await;

        Ok(user)
    }

    /// Authenticate by email and password, returning a JWT token
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication(
                "Invalid email or password".to_string(),
            ));
        }

        let token = self.create_token(&user)?;
        Ok((token, user))
    }

    /// Look up the authenticated user's profile, served through the cache
    pub async fn profile(&self, user_id: i32) -> AppResult<User> {
        let repository = self.repository.clone();
        self.cache
            .read_through(
                &cache::user_key(user_id),
                self.cache_config.entity_ttl_seconds,
                move || async move { repository.users.get_by_id(user_id).await },
            )
            .await
    }

    fn create_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let Some(ref stored) = user.password else {
            return Ok(false);
        };

        let parsed = PasswordHash::new(stored)
            .map_err(|e| AppError::Internal(format!("Stored password hash is invalid: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}
