use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Form, Router,
};
use tera::Context as TeraContext;

use crate::api::AppState;
use crate::models::User;
use crate::services::user::MSG_USER_NOT_FOUND;
use crate::services::validation::{id_field, UserForm};
use crate::services::{FieldErrors, ServiceError, ServiceResult};
use crate::views::Flash;
use crate::web::admin::{after_delete, paged, render_form, ListQuery, Loaded};
use crate::web::auth::{conflict_message, MSG_EMAIL_EXISTS};
use crate::web::forms::{attach_errors, DeleteForm, FormInput, SelectOption};
use crate::web::session::{AdminUser, WebUser};
use crate::web::{path_id, redirect_with_flash, PageError, PageResult};

const LIST: &str = "/admin/users";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).delete(delete_user))
        .route("/delete", post(delete_user))
        .route("/create", get(show_create).post(handle_create))
        .route("/{id}", get(show_edit).post(handle_edit))
}

async fn list_users(
    State(state): State<AppState>,
    AdminUser(session): AdminUser,
    Query(query): Query<ListQuery>,
) -> PageResult {
    let filter = ListQuery::filter(&query.username);
    let all_users = state.users.list(None).await?;
    let all_usernames: Vec<&str> = all_users.iter().map(User::username).collect();
    let users = match filter {
        Some(_) => state.users.list(filter).await?,
        None => all_users.clone(),
    };

    let mut context = TeraContext::new();
    context.insert("users", &paged(users, &query));
    context.insert("allUsernames", &all_usernames);
    context.insert("filterByUsername", &filter);
    session
        .page(&state, "admin")
        .action("users")
        .render("admin/users.html", &context)
}

/// Creating asks for a password; editing leaves it empty to keep the
/// current one.
fn user_inputs(form: &UserForm, creating: bool, errors: &FieldErrors) -> Vec<FormInput> {
    let password = FormInput::password("Password", "password");
    let mut inputs = vec![
        FormInput::text("Username", "username")
            .required()
            .value(&form.username),
        FormInput::text("First name", "firstname")
            .required()
            .value(&form.firstname),
        FormInput::text("Last name", "lastname")
            .required()
            .value(&form.lastname),
        FormInput::select("Role", "role_id", SelectOption::roles())
            .required()
            .value(&form.role_id),
        FormInput::email("Email", "email").required().value(&form.email),
        if creating { password.required() } else { password },
    ];
    attach_errors(&mut inputs, errors);
    inputs
}

fn stored_form(user: &User) -> UserForm {
    UserForm {
        role_id: user.role.id().to_string(),
        firstname: user.meta.firstname.clone(),
        lastname: user.meta.lastname.clone(),
        username: user.username().to_string(),
        email: user.email.clone(),
        password: String::new(),
    }
}

/// Sort a failed save into field errors, or pass it on. A duplicate
/// email or username marks the matching field.
fn save_errors(result: ServiceResult<User>) -> Result<FieldErrors, ServiceError> {
    let mut errors = FieldErrors::new();
    match result {
        Ok(_) => {}
        Err(ServiceError::Validation(fields)) => errors = fields,
        Err(ServiceError::Conflict(msg)) => {
            let message = conflict_message(&msg);
            let field = if message == MSG_EMAIL_EXISTS { "email" } else { "username" };
            errors.add(field, message);
        }
        Err(e) => return Err(e),
    }
    Ok(errors)
}

fn render_create(state: &AppState, session: &WebUser, form: &UserForm, errors: &FieldErrors) -> PageResult {
    render_form(
        state,
        session,
        "users",
        "Add user",
        "/admin/users/create",
        &user_inputs(form, true, errors),
        &[],
    )
}

async fn show_create(State(state): State<AppState>, AdminUser(session): AdminUser) -> PageResult {
    render_create(&state, &session, &UserForm::default(), &FieldErrors::new())
}

async fn handle_create(
    State(state): State<AppState>,
    AdminUser(session): AdminUser,
    Form(form): Form<UserForm>,
) -> PageResult {
    let result = state.users.create_user(&form).await;
    if let Ok(user) = &result {
        tracing::info!("Admin {} created user {}", session.user.id, user.id);
        return Ok(Redirect::to(LIST).into_response());
    }
    let errors = save_errors(result)?;
    let form = UserForm {
        password: String::new(),
        ..form
    };
    render_create(&state, &session, &form, &errors)
}

async fn load(state: &AppState, raw_id: &str) -> Loaded<User> {
    let id = path_id(raw_id).map_err(IntoResponse::into_response)?;
    match state.users.get(id).await {
        Ok(user) => Ok(user),
        Err(ServiceError::NotFound(msg)) => Err(redirect_with_flash(state, LIST, Flash::danger(msg))),
        Err(e) => Err(PageError::from(e).into_response()),
    }
}

fn render_edit(
    state: &AppState,
    session: &WebUser,
    user: &User,
    form: &UserForm,
    errors: &FieldErrors,
) -> PageResult {
    let mut inputs = user_inputs(form, false, errors);
    inputs.insert(0, FormInput::hidden("id", user.id));
    render_form(
        state,
        session,
        "users",
        &format!("Edit user: {}", user.username()),
        &format!("/admin/users/{}", user.id),
        &inputs,
        &[],
    )
}

async fn show_edit(
    State(state): State<AppState>,
    AdminUser(session): AdminUser,
    Path(id): Path<String>,
) -> PageResult {
    let user = match load(&state, &id).await {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };
    render_edit(&state, &session, &user, &stored_form(&user), &FieldErrors::new())
}

async fn handle_edit(
    State(state): State<AppState>,
    AdminUser(session): AdminUser,
    Path(id): Path<String>,
    Form(form): Form<UserForm>,
) -> PageResult {
    let user = match load(&state, &id).await {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };
    let result = state.users.update_user(user.id, &form).await;
    if result.is_ok() {
        return Ok(Redirect::to(LIST).into_response());
    }
    let errors = save_errors(result)?;
    let form = UserForm {
        password: String::new(),
        ..form
    };
    render_edit(&state, &session, &user, &form, &errors)
}

async fn delete_user(
    State(state): State<AppState>,
    AdminUser(session): AdminUser,
    Form(form): Form<DeleteForm>,
) -> PageResult {
    let result = match id_field(&form.id) {
        Some(id) => state.users.delete_user(id).await,
        None => Err(ServiceError::not_found(MSG_USER_NOT_FOUND)),
    };
    if result.is_ok() {
        tracing::info!("Admin {} deleted user {}", session.user.id, form.id);
    }
    after_delete(&state, LIST, form.page(), result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::user::{MSG_EMAIL_IN_USE, MSG_USERNAME_IN_USE};
    use crate::web::auth::MSG_USERNAME_EXISTS;

    #[test]
    fn test_conflicts_mark_their_field() {
        let errors = save_errors(Err(ServiceError::conflict(MSG_EMAIL_IN_USE))).unwrap();
        assert_eq!(errors.get("email"), Some(MSG_EMAIL_EXISTS));
        let errors = save_errors(Err(ServiceError::conflict(MSG_USERNAME_IN_USE))).unwrap();
        assert_eq!(errors.get("username"), Some(MSG_USERNAME_EXISTS));
    }

    #[test]
    fn test_role_select_lists_every_role() {
        let inputs = user_inputs(&UserForm::default(), true, &FieldErrors::new());
        let role = inputs.iter().find(|i| i.name == "role_id").unwrap();
        assert_eq!(role.options.len(), 3);
        assert!(inputs.iter().find(|i| i.name == "password").unwrap().required);
    }

    #[test]
    fn test_edit_password_is_optional() {
        let inputs = user_inputs(&UserForm::default(), false, &FieldErrors::new());
        assert!(!inputs.iter().find(|i| i.name == "password").unwrap().required);
    }
}
