use async_trait::async_trait;

use super::domain::{AuthUser, Credentials};
use super::errors::AuthError;

/// Persistence seam for admin accounts.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn find_user_by_id(&self, id: i32) -> Result<Option<AuthUser>, AuthError>;
    async fn create_user(&self, email: &str, name: &str, password_hash: String, password_algorithm: &str) -> Result<AuthUser, AuthError>;
    async fn get_credentials(&self, user_id: i32) -> Result<Option<Credentials>, AuthError>;
}

/// In-memory repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockAuthRepository {
        users: Mutex<HashMap<String, AuthUser>>, // key: email
        creds: Mutex<HashMap<i32, Credentials>>, // key: user_id
    }

    fn poisoned<T>(_: T) -> AuthError { AuthError::Repository("lock poisoned".into()) }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
            let users = self.users.lock().map_err(poisoned)?;
            Ok(users.get(&email.to_lowercase()).cloned())
        }

        async fn find_user_by_id(&self, id: i32) -> Result<Option<AuthUser>, AuthError> {
            let users = self.users.lock().map_err(poisoned)?;
            Ok(users.values().find(|u| u.id == id).cloned())
        }

        async fn create_user(&self, email: &str, name: &str, password_hash: String, password_algorithm: &str) -> Result<AuthUser, AuthError> {
            let mut users = self.users.lock().map_err(poisoned)?;
            let key = email.to_lowercase();
            if users.contains_key(&key) {
                return Err(AuthError::Conflict);
            }
            let user = AuthUser { id: users.len() as i32 + 1, email: key.clone(), name: name.to_string(), active: true };
            users.insert(key, user.clone());
            let c = Credentials { user_id: user.id, password_hash, password_algorithm: password_algorithm.to_string() };
            self.creds.lock().map_err(poisoned)?.insert(user.id, c);
            Ok(user)
        }

        async fn get_credentials(&self, user_id: i32) -> Result<Option<Credentials>, AuthError> {
            let creds = self.creds.lock().map_err(poisoned)?;
            Ok(creds.get(&user_id).cloned())
        }
    }
}
