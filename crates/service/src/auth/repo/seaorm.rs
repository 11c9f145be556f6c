use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use models::admin_user;

use crate::auth::domain::{AuthUser, Credentials};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

fn to_user(u: admin_user::Model) -> AuthUser {
    AuthUser { id: u.id, email: u.email, name: u.name, active: u.active }
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        let res = admin_user::Entity::find()
            .filter(admin_user::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(to_user))
    }

    async fn find_user_by_id(&self, id: i32) -> Result<Option<AuthUser>, AuthError> {
        let res = admin_user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(to_user))
    }

    async fn create_user(&self, email: &str, name: &str, password_hash: String, password_algorithm: &str) -> Result<AuthUser, AuthError> {
        let created = admin_user::create(&self.db, email, name, password_hash, password_algorithm)
            .await
            .map_err(|e| AuthError::Validation(e.to_string()))?;
        Ok(to_user(created))
    }

    async fn get_credentials(&self, user_id: i32) -> Result<Option<Credentials>, AuthError> {
        let res = admin_user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(|u| Credentials { user_id: u.id, password_hash: u.password_hash, password_algorithm: u.password_algorithm }))
    }
}
