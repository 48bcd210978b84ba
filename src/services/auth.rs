//! Identity service: registration, login and bearer-token resolution

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        enums::{UserRole, UserStatus},
        user::{Identity, LoginUser, NewUser, RegisterUser, User, UserClaims},
    },
    repository::Store,
};

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, config: AuthConfig) -> Self {
        Self { store, config }
    }

    /// Register a reader account
    pub async fn register(&self, request: RegisterUser) -> AppResult<User> {
        request.validate()?;

        let user = self
            .store
            .insert_user(NewUser {
                name: request.name.trim().to_string(),
                email: request.email.trim().to_lowercase(),
                password_hash: hash_password(&request.password)?,
                role: UserRole::User,
                status: UserStatus::Active,
            })
            .await?;

        tracing::info!("Registered user id={}", user.id);
        Ok(user)
    }

    /// Check credentials and return a signed token with the user
    pub async fn login(&self, request: LoginUser) -> AppResult<(String, User)> {
        request.validate()?;

        let user = self
            .store
            .find_user_by_email(&request.email.trim().to_lowercase())
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !verify_password(&user, &request.password)? {
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        if !user.is_active() {
            return Err(AppError::Authorization("User account is blocked".to_string()));
        }

        let token = self.issue_token(&user)?;
        Ok((token, user))
    }

    /// Create a signed token for a user
    pub fn issue_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            exp: now + self.token_lifetime_secs(),
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    pub fn token_lifetime_secs(&self) -> i64 {
        self.config.jwt_expiration_hours as i64 * 3600
    }

    /// Resolve a bearer token to the identity of an active user.
    ///
    /// Role and status come from the store, not from the token, so a block or
    /// role change applies to tokens already handed out.
    pub async fn authenticate(&self, token: &str) -> AppResult<Identity> {
        let claims = UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|_| AppError::Authentication("Invalid token".to_string()))?;

        let user = self
            .store
            .get_user(claims.user_id)
            .await?
            .ok_or_else(|| AppError::Authentication("User not found".to_string()))?;

        if !user.is_active() {
            return Err(AppError::Authorization("User account is blocked".to_string()));
        }

        Ok(Identity {
            user_id: user.id,
            role: user.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryStore;

    fn service(store: MemoryStore) -> AuthService {
        AuthService::new(
            Arc::new(store),
            AuthConfig {
                jwt_secret: "test-secret".to_string(),
                jwt_expiration_hours: 1,
            },
        )
    }

    fn registration(email: &str) -> RegisterUser {
        RegisterUser {
            name: "Grace".to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login_yields_a_usable_token() {
        let auth = service(MemoryStore::new());
        let user = auth.register(registration("grace@example.org")).await.unwrap();
        assert_eq!(user.role, UserRole::User);
        assert_ne!(user.password_hash, "correct horse");

        let (token, _) = auth
            .login(LoginUser {
                email: "grace@example.org".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();

        let identity = auth.authenticate(&token).await.unwrap();
        assert_eq!(identity.user_id, user.id);
        assert!(!identity.is_admin());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let auth = service(MemoryStore::new());
        auth.register(registration("grace@example.org")).await.unwrap();
        let err = auth.register(registration("Grace@Example.org")).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn blocked_account_cannot_log_in() {
        let store = MemoryStore::new();
        let auth = service(store.clone());
        let user = auth.register(registration("grace@example.org")).await.unwrap();
        store.set_user_status(user.id, UserStatus::Blocked).await.unwrap();

        let err = auth
            .login(LoginUser {
                email: "grace@example.org".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthenticated() {
        let auth = service(MemoryStore::new());
        auth.register(registration("grace@example.org")).await.unwrap();
        let err = auth
            .login(LoginUser {
                email: "grace@example.org".to_string(),
                password: "wrong password".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn blocked_user_token_is_forbidden() {
        let store = MemoryStore::new();
        let auth = service(store.clone());
        let user = auth.register(registration("grace@example.org")).await.unwrap();
        let token = auth.issue_token(&user).unwrap();

        store.set_user_status(user.id, UserStatus::Blocked).await.unwrap();

        let err = auth.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn garbage_token_is_unauthenticated() {
        let auth = service(MemoryStore::new());
        let err = auth.authenticate("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn token_for_unknown_user_is_unauthenticated() {
        let auth = service(MemoryStore::new());
        let ghost = User {
            id: 404,
            name: "Ghost".to_string(),
            email: "ghost@example.org".to_string(),
            password_hash: String::new(),
            role: UserRole::Admin,
            status: UserStatus::Active,
            registration_date: Utc::now(),
            photo_url: None,
        };
        let token = auth.issue_token(&ghost).unwrap();
        let err = auth.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }
}
