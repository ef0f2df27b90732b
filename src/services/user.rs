//! User service
//!
//! Accounts, teachers and profile maintenance:
//! - registration and admin-created accounts with uniqueness checks
//! - the teacher directory behind `/api/teachers`
//! - account edits, avatar replacement and password changes

use std::sync::Arc;

use crate::db::repositories::UserRepository;
use crate::models::{NewUser, Role, User, UserPatch, DEFAULT_AVATAR_FILENAME};
use crate::services::error::{ServiceError, ServiceResult, MSG_NOT_FOUND};
use crate::services::media::{MediaStore, Upload};
use crate::services::password::{hash_password, verify_password};
use crate::services::policy::{authorize, Gate, Requester};
use crate::services::validation::{
    id_field, AccountForm, FieldErrors, PasswordForm, RegisterForm, UserForm, MSG_ROLE_REQUIRED,
};

pub const MSG_EMAIL_IN_USE: &str = "Email is already in use.";
pub const MSG_USERNAME_IN_USE: &str = "Username is already in use.";
pub const MSG_NOT_A_TEACHER: &str = "User is not a teacher.";
pub const MSG_USER_NOT_FOUND: &str = "User was not found.";
pub const MSG_AVATAR_REQUIRED: &str = "Avatar file is required.";
pub const MSG_ID_REQUIRED: &str = "Id is required.";
pub const MSG_TEACHER_OWN_ACCOUNT: &str = "Teachers can only update their own accounts.";

pub struct UserService {
    users: Arc<dyn UserRepository>,
    media: MediaStore,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, media: MediaStore) -> Self {
        Self { users, media }
    }

    pub async fn get(&self, id: i64) -> ServiceResult<User> {
        self.users
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(MSG_USER_NOT_FOUND))
    }

    /// All users, or the one with exactly `username` when given.
    pub async fn list(&self, username: Option<&str>) -> ServiceResult<Vec<User>> {
        match username.map(str::trim).filter(|u| !u.is_empty()) {
            Some(name) => Ok(self.users.get_by_username(name).await?.into_iter().collect()),
            None => Ok(self.users.list().await?),
        }
    }

    pub async fn list_teachers(&self) -> ServiceResult<Vec<User>> {
        Ok(self.users.list_by_role(Role::Teacher).await?)
    }

    pub async fn find_teacher_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        Ok(self
            .users
            .get_by_username(username.trim())
            .await?
            .filter(User::is_teacher))
    }

    /// A user holding the teacher role. Anyone else is not found.
    pub async fn get_teacher(&self, id: i64) -> ServiceResult<User> {
        self.users
            .get_by_id(id)
            .await?
            .filter(User::is_teacher)
            .ok_or_else(|| ServiceError::not_found(MSG_NOT_FOUND))
    }

    /// Validate a registration-shaped form and create the account with
    /// `role` and the default avatar.
    pub async fn create_account(&self, form: &RegisterForm, role: Role) -> ServiceResult<User> {
        form.validate().into_result()?;
        self.ensure_unique(form.email.trim(), form.username.trim(), None)
            .await?;

        let user = self
            .users
            .create(&NewUser {
                email: form.email.trim().to_string(),
                password_hash: hash_password(&form.password)?,
                role,
                firstname: form.firstname.trim().to_string(),
                lastname: form.lastname.trim().to_string(),
                username: form.username.trim().to_string(),
                avatar: Some(DEFAULT_AVATAR_FILENAME.to_string()),
            })
            .await?;

        tracing::info!("Created {} account {}", role, user.username());
        Ok(user)
    }

    /// Partial update of a teacher account.
    ///
    /// Teachers may only update themselves, and the target must be a
    /// teacher. A new email or username must not belong to anybody else.
    pub async fn update_teacher(
        &self,
        requester: Requester,
        id: Option<i64>,
        patch: UserPatch,
    ) -> ServiceResult<User> {
        let id = id.ok_or_else(|| ServiceError::bad_request(MSG_ID_REQUIRED))?;
        let mut user = self
            .users
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(MSG_NOT_FOUND))?;

        authorize(requester, Gate::Teacher, Some(user.id))
            .or_forbidden(MSG_TEACHER_OWN_ACCOUNT)?;
        if !user.is_teacher() {
            return Err(ServiceError::conflict(MSG_NOT_A_TEACHER));
        }

        let email = non_blank(patch.email);
        let username = non_blank(patch.username);
        self.ensure_unique(
            email.as_deref().unwrap_or(""),
            username.as_deref().unwrap_or(""),
            Some(user.id),
        )
        .await?;

        if let Some(email) = email {
            user.email = email;
        }
        if let Some(username) = username {
            user.meta.username = username;
        }
        if let Some(firstname) = non_blank(patch.firstname) {
            user.meta.firstname = firstname;
        }
        if let Some(lastname) = non_blank(patch.lastname) {
            user.meta.lastname = lastname;
        }
        if let Some(password) = patch.password.filter(|p| !p.is_empty()) {
            user.password_hash = hash_password(&password)?;
        }

        Ok(self.users.update(&user).await?)
    }

    pub async fn delete_teacher(&self, id: Option<i64>) -> ServiceResult<()> {
        let id = id.ok_or_else(|| ServiceError::bad_request(MSG_ID_REQUIRED))?;
        let user = self
            .users
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(MSG_NOT_FOUND))?;
        if !user.is_teacher() {
            return Err(ServiceError::conflict(MSG_NOT_A_TEACHER));
        }
        self.remove_user(&user).await
    }

    /// Admin dashboard: create an account with any role.
    pub async fn create_user(&self, form: &UserForm) -> ServiceResult<User> {
        let mut errors = form.validate(true);
        let role = parse_role(&form.role_id, &mut errors);
        errors.into_result()?;
        let role = role.ok_or_else(|| ServiceError::bad_request(MSG_ROLE_REQUIRED))?;

        let register = RegisterForm {
            firstname: form.firstname.clone(),
            lastname: form.lastname.clone(),
            username: form.username.clone(),
            email: form.email.clone(),
            password: form.password.clone(),
        };
        self.create_account(&register, role).await
    }

    /// Admin dashboard: overwrite profile and role, and the password when
    /// one is given.
    pub async fn update_user(&self, id: i64, form: &UserForm) -> ServiceResult<User> {
        let mut errors = form.validate(false);
        let role = parse_role(&form.role_id, &mut errors);
        errors.into_result()?;

        let mut user = self.get(id).await?;
        self.ensure_unique(form.email.trim(), form.username.trim(), Some(user.id))
            .await?;

        user.email = form.email.trim().to_string();
        user.meta.firstname = form.firstname.trim().to_string();
        user.meta.lastname = form.lastname.trim().to_string();
        user.meta.username = form.username.trim().to_string();
        if let Some(role) = role {
            user.role = role;
        }
        if !form.password.is_empty() {
            user.password_hash = hash_password(&form.password)?;
        }

        Ok(self.users.update(&user).await?)
    }

    pub async fn delete_user(&self, id: i64) -> ServiceResult<()> {
        let user = self.get(id).await?;
        self.remove_user(&user).await
    }

    /// The signed-in user edits their own profile.
    pub async fn update_account(&self, user_id: i64, form: &AccountForm) -> ServiceResult<User> {
        form.validate().into_result()?;
        let mut user = self.get(user_id).await?;
        self.ensure_unique(form.email.trim(), form.username.trim(), Some(user.id))
            .await?;

        user.email = form.email.trim().to_string();
        user.meta.firstname = form.firstname.trim().to_string();
        user.meta.lastname = form.lastname.trim().to_string();
        user.meta.username = form.username.trim().to_string();
        Ok(self.users.update(&user).await?)
    }

    /// Store a new avatar and drop the previous one.
    pub async fn change_avatar(&self, user_id: i64, upload: Option<Upload>) -> ServiceResult<User> {
        let upload =
            upload.ok_or_else(|| ServiceError::InvalidUpload(MSG_AVATAR_REQUIRED.to_string()))?;
        let mut user = self.get(user_id).await?;

        let filename = self.media.save_avatar(&upload).await?;
        let previous = user.meta.avatar.replace(filename.clone());
        let user = match self.users.update(&user).await {
            Ok(user) => user,
            Err(e) => {
                self.media.remove_avatar(&filename).await;
                return Err(e.into());
            }
        };

        if let Some(previous) = previous.filter(|p| *p != filename) {
            self.media.remove_avatar(&previous).await;
        }
        Ok(user)
    }

    /// Change the password after checking the current one. A wrong current
    /// password is `InvalidCredentials`.
    pub async fn change_password(&self, user_id: i64, form: &PasswordForm) -> ServiceResult<()> {
        form.validate().into_result()?;
        let mut user = self.get(user_id).await?;
        if !verify_password(&form.current, &user.password_hash)? {
            return Err(ServiceError::InvalidCredentials);
        }
        user.password_hash = hash_password(&form.newpassword)?;
        self.users.update(&user).await?;
        Ok(())
    }

    pub async fn count_admins(&self) -> ServiceResult<i64> {
        Ok(self.users.count_by_role(Role::Admin).await?)
    }

    pub async fn get_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        Ok(self.users.get_by_email(email.trim()).await?)
    }

    async fn remove_user(&self, user: &User) -> ServiceResult<()> {
        self.users.delete(user.id).await?;
        if let Some(avatar) = &user.meta.avatar {
            self.media.remove_avatar(avatar).await;
        }
        tracing::info!("Deleted user {}", user.username());
        Ok(())
    }

    /// Email is checked before username. Empty values are skipped, and
    /// `except` lets a user keep their own email and username.
    async fn ensure_unique(
        &self,
        email: &str,
        username: &str,
        except: Option<i64>,
    ) -> ServiceResult<()> {
        let other = |u: &User| Some(u.id) != except;
        if !email.is_empty() {
            if let Some(user) = self.users.get_by_email(email).await? {
                if other(&user) {
                    return Err(ServiceError::conflict(MSG_EMAIL_IN_USE));
                }
            }
        }
        if !username.is_empty() {
            if let Some(user) = self.users.get_by_username(username).await? {
                if other(&user) {
                    return Err(ServiceError::conflict(MSG_USERNAME_IN_USE));
                }
            }
        }
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_role(raw: &str, errors: &mut FieldErrors) -> Option<Role> {
    let role = id_field(raw).and_then(Role::from_id);
    if role.is_none() {
        errors.add("role_id", MSG_ROLE_REQUIRED);
    }
    role
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaConfig;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::test_support::{insert_user, setup_pool};
    use tempfile::TempDir;

    async fn setup_test_service() -> (UserService, TempDir) {
        let pool = setup_pool().await;
        let dir = TempDir::new().unwrap();
        let media = MediaStore::new(MediaConfig {
            public_dir: dir.path().to_path_buf(),
            ..MediaConfig::default()
        });
        (UserService::new(SqlxUserRepository::boxed(pool), media), dir)
    }

    fn register(username: &str) -> RegisterForm {
        RegisterForm {
            firstname: "Grace".to_string(),
            lastname: "Hopper".to_string(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "cobol-1959".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_account_uses_default_avatar() {
        let (service, _dir) = setup_test_service().await;
        let user = service.create_account(&register("grace"), Role::Reader).await.unwrap();

        assert_eq!(user.role, Role::Reader);
        assert_eq!(user.meta.avatar.as_deref(), Some(DEFAULT_AVATAR_FILENAME));
        assert!(verify_password("cobol-1959", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_create_account_conflicts_email_first() {
        let (service, _dir) = setup_test_service().await;
        service.create_account(&register("grace"), Role::Reader).await.unwrap();

        match service.create_account(&register("grace"), Role::Reader).await {
            Err(ServiceError::Conflict(msg)) => assert_eq!(msg, MSG_EMAIL_IN_USE),
            other => panic!("unexpected: {:?}", other),
        }

        let mut form = register("grace");
        form.email = "other@example.com".to_string();
        match service.create_account(&form, Role::Reader).await {
            Err(ServiceError::Conflict(msg)) => assert_eq!(msg, MSG_USERNAME_IN_USE),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_account_validates() {
        let (service, _dir) = setup_test_service().await;
        let mut form = register("grace");
        form.password = "short".to_string();
        assert!(matches!(
            service.create_account(&form, Role::Reader).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_get_teacher_hides_other_roles() {
        let (service, _dir) = setup_test_service().await;
        let teacher = service.create_account(&register("tina"), Role::Teacher).await.unwrap();
        let reader = service.create_account(&register("rob"), Role::Reader).await.unwrap();

        assert_eq!(service.get_teacher(teacher.id).await.unwrap().id, teacher.id);
        assert!(matches!(
            service.get_teacher(reader.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(service.list_teachers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_teacher_updates_only_own_account() {
        let (service, _dir) = setup_test_service().await;
        let alice = service.create_account(&register("alice"), Role::Teacher).await.unwrap();
        let bob = service.create_account(&register("bob"), Role::Teacher).await.unwrap();

        let patch = UserPatch {
            lastname: Some("Changed".to_string()),
            ..UserPatch::default()
        };
        match service
            .update_teacher(Requester::from(&alice), Some(bob.id), patch.clone())
            .await
        {
            Err(ServiceError::Forbidden(msg)) => assert_eq!(msg, MSG_TEACHER_OWN_ACCOUNT),
            other => panic!("unexpected: {:?}", other),
        }

        let updated = service
            .update_teacher(Requester::from(&alice), Some(alice.id), patch)
            .await
            .unwrap();
        assert_eq!(updated.meta.lastname, "Changed");
        assert_eq!(updated.meta.firstname, "Grace");
    }

    #[tokio::test]
    async fn test_update_teacher_errors() {
        let (service, _dir) = setup_test_service().await;
        let admin = service.create_account(&register("root"), Role::Admin).await.unwrap();
        let reader = service.create_account(&register("rob"), Role::Reader).await.unwrap();
        let teacher = service.create_account(&register("tina"), Role::Teacher).await.unwrap();
        let requester = Requester::from(&admin);

        assert!(matches!(
            service.update_teacher(requester, None, UserPatch::default()).await,
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            service.update_teacher(requester, Some(999), UserPatch::default()).await,
            Err(ServiceError::NotFound(_))
        ));
        match service.update_teacher(requester, Some(reader.id), UserPatch::default()).await {
            Err(ServiceError::Conflict(msg)) => assert_eq!(msg, MSG_NOT_A_TEACHER),
            other => panic!("unexpected: {:?}", other),
        }

        let taken = UserPatch {
            username: Some("rob".to_string()),
            ..UserPatch::default()
        };
        match service.update_teacher(requester, Some(teacher.id), taken).await {
            Err(ServiceError::Conflict(msg)) => assert_eq!(msg, MSG_USERNAME_IN_USE),
            other => panic!("unexpected: {:?}", other),
        }

        // Keeping your own email is not a conflict
        let same = UserPatch {
            email: Some(teacher.email.clone()),
            password: Some("new-password".to_string()),
            ..UserPatch::default()
        };
        let updated = service.update_teacher(requester, Some(teacher.id), same).await.unwrap();
        assert!(verify_password("new-password", &updated.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_delete_teacher_rejects_other_roles() {
        let (service, _dir) = setup_test_service().await;
        let reader = service.create_account(&register("rob"), Role::Reader).await.unwrap();
        let teacher = service.create_account(&register("tina"), Role::Teacher).await.unwrap();

        assert!(matches!(
            service.delete_teacher(Some(reader.id)).await,
            Err(ServiceError::Conflict(_))
        ));
        service.delete_teacher(Some(teacher.id)).await.unwrap();
        assert!(matches!(service.get(teacher.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_admin_create_and_update_user() {
        let (service, _dir) = setup_test_service().await;
        let form = UserForm {
            role_id: "2".to_string(),
            firstname: "Tom".to_string(),
            lastname: "Teach".to_string(),
            username: "tom".to_string(),
            email: "tom@example.com".to_string(),
            password: "password1".to_string(),
        };
        let user = service.create_user(&form).await.unwrap();
        assert_eq!(user.role, Role::Teacher);

        let edit = UserForm {
            role_id: "3".to_string(),
            password: String::new(),
            ..form.clone()
        };
        let updated = service.update_user(user.id, &edit).await.unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert!(verify_password("password1", &updated.password_hash).unwrap());

        let bad_role = UserForm {
            role_id: "9".to_string(),
            ..form
        };
        match service.update_user(user.id, &bad_role).await {
            Err(ServiceError::Validation(errors)) => {
                assert_eq!(errors.get("role_id"), Some(MSG_ROLE_REQUIRED))
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_change_password_checks_current() {
        let (service, _dir) = setup_test_service().await;
        let user = service.create_account(&register("grace"), Role::Reader).await.unwrap();

        let wrong = PasswordForm {
            current: "not-the-password".to_string(),
            newpassword: "brand-new-pass".to_string(),
            confirm: "brand-new-pass".to_string(),
        };
        assert!(matches!(
            service.change_password(user.id, &wrong).await,
            Err(ServiceError::InvalidCredentials)
        ));

        let right = PasswordForm {
            current: "cobol-1959".to_string(),
            ..wrong
        };
        service.change_password(user.id, &right).await.unwrap();
        let stored = service.get(user.id).await.unwrap();
        assert!(verify_password("brand-new-pass", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_change_avatar_replaces_file() {
        let (service, dir) = setup_test_service().await;
        let user = service.create_account(&register("grace"), Role::Reader).await.unwrap();

        assert!(matches!(
            service.change_avatar(user.id, None).await,
            Err(ServiceError::InvalidUpload(_))
        ));

        let first = service
            .change_avatar(user.id, Some(Upload::new("image/png", b"1".to_vec())))
            .await
            .unwrap();
        let first_name = first.meta.avatar.clone().unwrap();
        let avatars = dir.path().join("images/avatars");
        assert!(avatars.join(&first_name).exists());

        let second = service
            .change_avatar(user.id, Some(Upload::new("image/jpeg", b"2".to_vec())))
            .await
            .unwrap();
        assert_ne!(second.meta.avatar.as_deref(), Some(first_name.as_str()));
        assert!(!avatars.join(&first_name).exists());
    }

    #[tokio::test]
    async fn test_change_avatar_failed_save_keeps_previous_file() {
        let pool = setup_pool().await;
        let dir = TempDir::new().unwrap();
        let media = MediaStore::new(MediaConfig {
            public_dir: dir.path().to_path_buf(),
            ..MediaConfig::default()
        });
        let service = UserService::new(SqlxUserRepository::boxed(pool.clone()), media);
        let user = service.create_account(&register("grace"), Role::Reader).await.unwrap();
        let first = service
            .change_avatar(user.id, Some(Upload::new("image/png", b"1".to_vec())))
            .await
            .unwrap();
        let first_name = first.meta.avatar.clone().unwrap();

        sqlx::query(
            "CREATE TRIGGER freeze_meta BEFORE UPDATE ON user_meta \
             BEGIN SELECT RAISE(ABORT, 'frozen'); END",
        )
        .execute(&pool)
        .await
        .unwrap();

        let result = service
            .change_avatar(user.id, Some(Upload::new("image/png", b"2".to_vec())))
            .await;
        assert!(matches!(result, Err(ServiceError::Internal(_))));

        let avatars = dir.path().join("images/avatars");
        let stored: Vec<_> = std::fs::read_dir(&avatars)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(stored, vec![first_name.clone()]);
        let reloaded = service.get(user.id).await.unwrap();
        assert_eq!(reloaded.meta.avatar.as_deref(), Some(first_name.as_str()));
    }

    #[tokio::test]
    async fn test_list_filters_by_exact_username() {
        let (service, _dir) = setup_test_service().await;
        let grace = service.create_account(&register("grace"), Role::Reader).await.unwrap();
        service.create_account(&register("gracie"), Role::Reader).await.unwrap();

        let found = service.list(Some("grace")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, grace.id);
        assert_eq!(service.list(Some("  ")).await.unwrap().len(), 2);
        assert!(service.list(Some("gra")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_teacher_by_username_ignores_readers() {
        let pool = setup_pool().await;
        insert_user(&pool, "rob", Role::Reader).await;
        let teacher = insert_user(&pool, "tina", Role::Teacher).await;
        let service = UserService::new(
            SqlxUserRepository::boxed(pool),
            MediaStore::new(MediaConfig::default()),
        );

        assert!(service.find_teacher_by_username("rob").await.unwrap().is_none());
        assert_eq!(
            service.find_teacher_by_username("tina").await.unwrap().map(|u| u.id),
            Some(teacher.id)
        );
    }
}
