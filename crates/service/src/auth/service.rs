use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use rand::rngs::OsRng;
use tracing::{debug, info, instrument};

use super::domain::{AuthSession, AuthUser, Claims, LoginInput, RegisterInput};
use super::errors::AuthError;
use super::repository::AuthRepository;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub password_algorithm: String,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>, token_ttl_hours: i64) -> Self {
        Self { jwt_secret: jwt_secret.into(), token_ttl_hours, password_algorithm: "argon2".into() }
    }
}

impl From<&configs::AuthConfig> for AuthConfig {
    fn from(c: &configs::AuthConfig) -> Self { Self::new(c.jwt_secret.clone(), c.token_ttl_hours) }
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    /// Register a new admin with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::RegisterInput;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig::new("0123456789abcdef", 1));
    /// let input = RegisterInput { email: "admin@example.com".into(), name: "Admin".into(), password: "Secret123".into() };
    /// let user = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(user.email, "admin@example.com");
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        if input.password.len() < 8 {
            return Err(AuthError::Validation("password too short (>=8)".into()));
        }
        if input.name.trim().is_empty() {
            return Err(AuthError::Validation("name required".into()));
        }
        if let Some(existing) = self.repo.find_user_by_email(&input.email).await? {
            debug!("admin exists: {}", existing.email);
            return Err(AuthError::Conflict);
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(input.password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        let user = self.repo.create_user(&input.email, &input.name, hash, &self.cfg.password_algorithm).await?;
        info!(user_id = user.id, email = %user.email, "admin_registered");
        Ok(user)
    }

    /// Authenticate an admin and issue a signed token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use std::sync::Arc;
    /// let svc = AuthService::new(Arc::new(MockAuthRepository::default()), AuthConfig::new("0123456789abcdef", 1));
    /// let _ = tokio_test::block_on(svc.register(RegisterInput { email: "u@e.com".into(), name: "N".into(), password: "Passw0rd".into() }));
    /// let session = tokio_test::block_on(svc.login(LoginInput { email: "u@e.com".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(svc.verify_token(&session.token).unwrap().uid, session.user.id);
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let user = self.repo
            .find_user_by_email(&input.email)
            .await?
            .filter(|u| u.active)
            .ok_or(AuthError::Unauthorized)?;

        let cred = self.repo
            .get_credentials(user.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let parsed = PasswordHash::new(&cred.password_hash).map_err(|e| AuthError::HashError(e.to_string()))?;
        if Argon2::default().verify_password(input.password.as_bytes(), &parsed).is_err() {
            return Err(AuthError::Unauthorized);
        }

        let (token, expires_at) = self.issue_token(&user)?;
        info!(user_id = user.id, "admin_logged_in");
        Ok(AuthSession { user, token, expires_at })
    }

    pub fn issue_token(&self, user: &AuthUser) -> Result<(String, usize), AuthError> {
        let now = chrono::Utc::now();
        let exp = (now + chrono::Duration::hours(self.cfg.token_ttl_hours)).timestamp() as usize;
        let claims = Claims { sub: user.email.clone(), uid: user.id, name: user.name.clone(), iat: now.timestamp() as usize, exp };
        let token = encode(&JwtHeader::default(), &claims, &EncodingKey::from_secret(self.cfg.jwt_secret.as_bytes()))
            .map_err(|e| AuthError::TokenError(e.to_string()))?;
        Ok((token, exp))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        verify_token(&self.cfg.jwt_secret, token)
    }

    pub async fn current_user(&self, claims: &Claims) -> Result<AuthUser, AuthError> {
        self.repo.find_user_by_id(claims.uid).await?.filter(|u| u.active).ok_or(AuthError::NotFound)
    }
}

/// Decodes and checks an HS256 token, including expiry.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::TokenError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::mock::MockAuthRepository;

    fn svc() -> AuthService<MockAuthRepository> {
        AuthService::new(Arc::new(MockAuthRepository::default()), AuthConfig::new("0123456789abcdef", 2))
    }

    fn register_input(email: &str) -> RegisterInput {
        RegisterInput { email: email.into(), name: "Ops".into(), password: "Passw0rd!".into() }
    }

    #[tokio::test]
    async fn register_rejects_short_password_and_duplicates() {
        let svc = svc();
        let short = RegisterInput { password: "short".into(), ..register_input("a@b.com") };
        assert!(matches!(svc.register(short).await, Err(AuthError::Validation(_))));
        svc.register(register_input("a@b.com")).await.unwrap();
        assert!(matches!(svc.register(register_input("A@b.com")).await, Err(AuthError::Conflict)));
    }

    #[tokio::test]
    async fn login_issues_verifiable_token() {
        let svc = svc();
        let user = svc.register(register_input("ops@shop.test")).await.unwrap();
        let bad = svc.login(LoginInput { email: "ops@shop.test".into(), password: "wrong-pass".into() }).await;
        assert!(matches!(bad, Err(AuthError::Unauthorized)));

        let session = svc.login(LoginInput { email: "ops@shop.test".into(), password: "Passw0rd!".into() }).await.unwrap();
        let claims = svc.verify_token(&session.token).unwrap();
        assert_eq!(claims.uid, user.id);
        assert_eq!(claims.exp, session.expires_at);
        assert_eq!(svc.current_user(&claims).await.unwrap().email, "ops@shop.test");
        assert!(verify_token("another-secret-value", &session.token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = AuthService::new(Arc::new(MockAuthRepository::default()), AuthConfig::new("0123456789abcdef", -1));
        let user = AuthUser { id: 1, email: "x@y.z".into(), name: "X".into(), active: true };
        let (token, _) = svc.issue_token(&user).unwrap();
        assert!(svc.verify_token(&token).is_err());
    }
}
