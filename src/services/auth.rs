//! Login, registration and the startup admin account

use std::sync::Arc;

use crate::config::AdminBootstrap;
use crate::models::{Role, User};
use crate::services::error::{ServiceError, ServiceResult, MSG_NOT_FOUND};
use crate::services::password::verify_password;
use crate::services::policy::Requester;
use crate::services::token::TokenService;
use crate::services::user::UserService;
use crate::services::validation::RegisterForm;

pub struct AuthService {
    users: Arc<UserService>,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(users: Arc<UserService>, tokens: TokenService) -> Self {
        Self { users, tokens }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Check credentials and issue a token.
    ///
    /// An unknown email is `NotFound`, a wrong password
    /// `InvalidCredentials`. The web form reports both the same way.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<(User, String)> {
        let user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::not_found(MSG_NOT_FOUND))?;

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!("Wrong password for user {}", user.id);
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(&user)
            .map_err(|e| ServiceError::Internal(e.into()))?;
        Ok((user, token))
    }

    /// Self-service sign-up. New accounts are readers.
    pub async fn register(&self, form: &RegisterForm) -> ServiceResult<User> {
        self.users.create_account(form, Role::Reader).await
    }

    /// Resolve a token to the requester it names. The user must still
    /// exist; its current role wins over the one in the token.
    pub async fn authenticate(&self, token: &str) -> ServiceResult<User> {
        let claims = self
            .tokens
            .verify(token)
            .map_err(|_| ServiceError::InvalidCredentials)?;
        let requester: Requester = claims
            .requester()
            .map_err(|_| ServiceError::InvalidCredentials)?;
        self.users
            .get(requester.id)
            .await
            .map_err(|e| match e {
                ServiceError::NotFound(_) => ServiceError::InvalidCredentials,
                other => other,
            })
    }

    /// Create the configured admin unless an admin already exists. Returns
    /// the new account, if any.
    pub async fn bootstrap_admin(&self, admin: &AdminBootstrap) -> ServiceResult<Option<User>> {
        if self.users.count_admins().await? > 0 {
            return Ok(None);
        }
        let form = RegisterForm {
            firstname: "Site".to_string(),
            lastname: "Admin".to_string(),
            username: admin.username.clone(),
            email: admin.email.clone(),
            password: admin.password.clone(),
        };
        let user = self.users.create_account(&form, Role::Admin).await?;
        tracing::info!("Bootstrapped admin account {}", user.email);
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaConfig;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::test_support::setup_pool;
    use crate::services::media::MediaStore;
    use crate::services::token::DEFAULT_TOKEN_TTL_SECS;

    async fn setup_test_service() -> AuthService {
        let pool = setup_pool().await;
        let users = Arc::new(UserService::new(
            SqlxUserRepository::boxed(pool),
            MediaStore::new(MediaConfig::default()),
        ));
        AuthService::new(users, TokenService::new(b"test", DEFAULT_TOKEN_TTL_SECS))
    }

    fn form() -> RegisterForm {
        RegisterForm {
            firstname: "Ada".to_string(),
            lastname: "Lovelace".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "analytical".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_creates_reader() {
        let auth = setup_test_service().await;
        let user = auth.register(&form()).await.unwrap();
        assert_eq!(user.role, Role::Reader);
        assert_eq!(user.role.id(), 1);
    }

    #[tokio::test]
    async fn test_login_outcomes() {
        let auth = setup_test_service().await;
        let user = auth.register(&form()).await.unwrap();

        assert!(matches!(
            auth.login("nobody@example.com", "analytical").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            auth.login("ada@example.com", "wrong-password").await,
            Err(ServiceError::InvalidCredentials)
        ));

        let (logged_in, token) = auth.login("ada@example.com", "analytical").await.unwrap();
        assert_eq!(logged_in.id, user.id);
        let claims = auth.tokens().verify(&token).unwrap();
        assert_eq!(claims.id, user.id);
        assert_eq!(claims.role, "reader");
    }

    #[tokio::test]
    async fn test_authenticate_requires_existing_user() {
        let auth = setup_test_service().await;
        let user = auth.register(&form()).await.unwrap();
        let (_, token) = auth.login("ada@example.com", "analytical").await.unwrap();

        assert_eq!(auth.authenticate(&token).await.unwrap().id, user.id);
        assert!(matches!(
            auth.authenticate("garbage").await,
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_runs_once() {
        let auth = setup_test_service().await;
        let admin = AdminBootstrap {
            email: "root@example.com".to_string(),
            password: "rootroot".to_string(),
            username: "root".to_string(),
        };

        let created = auth.bootstrap_admin(&admin).await.unwrap().unwrap();
        assert_eq!(created.role, Role::Admin);
        assert!(auth.bootstrap_admin(&admin).await.unwrap().is_none());
    }
}
