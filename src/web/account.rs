//! The signed-in user's own account pages

use axum::{
    extract::{Multipart, State},
    routing::get,
    Form, Router,
};
use tera::Context as TeraContext;

use crate::api::upload::UploadForm;
use crate::api::AppState;
use crate::models::User;
use crate::services::validation::{AccountForm, PasswordForm};
use crate::services::{FieldErrors, ServiceError};
use crate::views::Flash;
use crate::web::auth::conflict_message;
use crate::web::forms::{attach_errors, FormInput};
use crate::web::session::WebUser;
use crate::web::{redirect_with_flash, PageResult};

const MSG_ACCOUNT_SAVED: &str = "Your account details have been successfully saved.";
const MSG_PASSWORD_SAVED: &str = "Your new password has been successfully saved.";
const MSG_WRONG_PASSWORD: &str = "Please provide correct current password.";
const MSG_APPLIED: &str = "Thank you. We will be in touch soon.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(show_account))
        .route("/edit", get(show_edit).post(handle_edit))
        .route("/avatar", get(show_avatar).post(handle_avatar))
        .route("/password", get(show_password).post(handle_password))
        .route("/apply", get(show_apply).post(handle_apply))
}

async fn show_account(State(state): State<AppState>, session: WebUser) -> PageResult {
    let user = &session.user;
    let inputs = vec![
        FormInput::text("Role", "role").disabled().value(user.role.label()),
        FormInput::text("First name", "firstname")
            .disabled()
            .value(&user.meta.firstname),
        FormInput::text("Last name", "lastname")
            .disabled()
            .value(&user.meta.lastname),
        FormInput::text("Username", "username")
            .disabled()
            .value(user.username()),
        FormInput::email("Email", "email").disabled().value(&user.email),
    ];

    let mut context = TeraContext::new();
    context.insert("inputs", &inputs);
    session
        .page(&state, "account")
        .action("view")
        .render("account/index.html", &context)
}

fn account_inputs(user: &User, form: Option<&AccountForm>, errors: &FieldErrors) -> Vec<FormInput> {
    let mut inputs = vec![
        FormInput::text("First name", "firstname")
            .required()
            .value_or(form.map(|f| f.firstname.as_str()), &user.meta.firstname),
        FormInput::text("Last name", "lastname")
            .required()
            .value_or(form.map(|f| f.lastname.as_str()), &user.meta.lastname),
        FormInput::text("Username", "username")
            .required()
            .value_or(form.map(|f| f.username.as_str()), user.username()),
        FormInput::email("Email", "email")
            .required()
            .value_or(form.map(|f| f.email.as_str()), &user.email),
    ];
    attach_errors(&mut inputs, errors);
    inputs
}

fn render_form(
    state: &AppState,
    session: &WebUser,
    action: &str,
    title: &str,
    inputs: Vec<FormInput>,
    handler_errors: Vec<Flash>,
) -> PageResult {
    let mut context = TeraContext::new();
    context.insert("title", title);
    context.insert("formAction", &format!("/account/{}", action));
    context.insert("inputs", &inputs);
    context.insert("handlerErrors", &handler_errors);
    session
        .page(state, "account")
        .action(action)
        .render("account/form.html", &context)
}

async fn show_edit(State(state): State<AppState>, session: WebUser) -> PageResult {
    let inputs = account_inputs(&session.user, None, &FieldErrors::new());
    render_form(&state, &session, "edit", "Edit account", inputs, Vec::new())
}

async fn handle_edit(
    State(state): State<AppState>,
    session: WebUser,
    Form(form): Form<AccountForm>,
) -> PageResult {
    let (errors, handler_errors) = match state.users.update_account(session.user.id, &form).await {
        Ok(user) => {
            tracing::info!("User {} updated their account", user.id);
            return Ok(redirect_with_flash(
                &state,
                "/account",
                Flash::success(MSG_ACCOUNT_SAVED),
            ));
        }
        Err(ServiceError::Validation(errors)) => (errors, Vec::new()),
        Err(ServiceError::Conflict(msg)) => (
            FieldErrors::new(),
            vec![Flash::danger(conflict_message(&msg))],
        ),
        Err(e) => return Err(e.into()),
    };
    let inputs = account_inputs(&session.user, Some(&form), &errors);
    render_form(&state, &session, "edit", "Edit account", inputs, handler_errors)
}

fn render_avatar(state: &AppState, session: &WebUser, avatar: Option<&str>, error: &str) -> PageResult {
    let mut context = TeraContext::new();
    context.insert("avatar", &avatar);
    context.insert("error", error);
    session
        .page(state, "account")
        .action("avatar")
        .render("account/avatar.html", &context)
}

async fn show_avatar(State(state): State<AppState>, session: WebUser) -> PageResult {
    render_avatar(&state, &session, session.user.meta.avatar.as_deref(), "")
}

async fn handle_avatar(
    State(state): State<AppState>,
    session: WebUser,
    multipart: Multipart,
) -> PageResult {
    let mut form = UploadForm::read(multipart).await?;
    match state
        .users
        .change_avatar(session.user.id, form.take_file("avatar"))
        .await
    {
        Ok(user) => render_avatar(&state, &session, user.meta.avatar.as_deref(), ""),
        Err(ServiceError::InvalidUpload(msg)) => {
            render_avatar(&state, &session, session.user.meta.avatar.as_deref(), &msg)
        }
        Err(e) => Err(e.into()),
    }
}

/// Passwords are never echoed back into the form.
fn password_inputs(errors: &FieldErrors) -> Vec<FormInput> {
    let mut inputs = vec![
        FormInput::password("Current password", "current").required(),
        FormInput::password("New password", "newpassword").required(),
        FormInput::password("Confirm password", "confirm").required(),
    ];
    attach_errors(&mut inputs, errors);
    inputs
}

async fn show_password(State(state): State<AppState>, session: WebUser) -> PageResult {
    let inputs = password_inputs(&FieldErrors::new());
    render_form(&state, &session, "password", "Change password", inputs, Vec::new())
}

async fn handle_password(
    State(state): State<AppState>,
    session: WebUser,
    Form(form): Form<PasswordForm>,
) -> PageResult {
    let (errors, handler_errors) = match state.users.change_password(session.user.id, &form).await
    {
        Ok(()) => {
            tracing::info!("User {} changed their password", session.user.id);
            return Ok(redirect_with_flash(
                &state,
                "/account",
                Flash::success(MSG_PASSWORD_SAVED),
            ));
        }
        Err(ServiceError::Validation(errors)) => (errors, Vec::new()),
        Err(ServiceError::InvalidCredentials) => {
            (FieldErrors::new(), vec![Flash::danger(MSG_WRONG_PASSWORD)])
        }
        Err(e) => return Err(e.into()),
    };
    render_form(
        &state,
        &session,
        "password",
        "Change password",
        password_inputs(&errors),
        handler_errors,
    )
}

async fn show_apply(State(state): State<AppState>, session: WebUser) -> PageResult {
    session
        .page(&state, "account")
        .action("apply")
        .render("account/apply.html", &TeraContext::new())
}

async fn handle_apply(State(state): State<AppState>, session: WebUser) -> PageResult {
    tracing::info!("User {} applied for a teacher account", session.user.id);
    session
        .page(&state, "account")
        .action("apply")
        .flash(Flash::success(MSG_APPLIED))
        .render("account/apply.html", &TeraContext::new())
}
