//! Login, registration and logout pages

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use tera::Context as TeraContext;

use crate::api::AppState;
use crate::services::user::{MSG_EMAIL_IN_USE, MSG_USERNAME_IN_USE};
use crate::services::validation::{LoginForm, RegisterForm};
use crate::services::{FieldErrors, ServiceError};
use crate::views::Flash;
use crate::web::forms::{attach_errors, FormInput};
use crate::web::session::{clear_token_cookie, token_cookie, LoggedOut};
use crate::web::{redirect_with_flash, PageResult};

pub const MSG_BAD_CREDENTIALS: &str = "Please provide correct credentials.";
pub const MSG_EMAIL_EXISTS: &str = "Email already exists.";
pub const MSG_USERNAME_EXISTS: &str = "Username already exists.";
const MSG_REGISTERED: &str = "Your account has been created. You can login now.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(show_login).post(handle_login))
        .route("/register", get(show_register).post(handle_register))
        .route("/logout", post(handle_logout))
}

fn login_inputs(form: &LoginForm, errors: &FieldErrors) -> Vec<FormInput> {
    let mut inputs = vec![
        FormInput::email("Email", "email").required().value(&form.email),
        FormInput::password("Password", "password").required(),
    ];
    attach_errors(&mut inputs, errors);
    inputs
}

fn render_login(
    state: &AppState,
    visitor: &LoggedOut,
    form: &LoginForm,
    errors: &FieldErrors,
    handler_errors: Vec<Flash>,
) -> PageResult {
    let mut context = TeraContext::new();
    context.insert("inputs", &login_inputs(form, errors));
    context.insert("handlerErrors", &handler_errors);
    visitor.page(state, "login").render("auth/login.html", &context)
}

async fn show_login(State(state): State<AppState>, visitor: LoggedOut) -> PageResult {
    render_login(
        &state,
        &visitor,
        &LoginForm::default(),
        &FieldErrors::new(),
        Vec::new(),
    )
}

async fn handle_login(
    State(state): State<AppState>,
    visitor: LoggedOut,
    Form(form): Form<LoginForm>,
) -> PageResult {
    let errors = form.validate();
    if !errors.is_empty() {
        return render_login(&state, &visitor, &form, &errors, Vec::new());
    }

    match state.auth.login(form.email.trim(), &form.password).await {
        Ok((user, token)) => {
            tracing::info!("User {} signed in", user.id);
            let cookie = token_cookie(
                &token,
                state.auth.tokens().ttl_secs(),
                state.secure_cookies(),
            );
            let value = HeaderValue::from_str(&cookie).map_err(anyhow::Error::from)?;
            Ok(([(header::SET_COOKIE, value)], Redirect::to("/")).into_response())
        }
        Err(ServiceError::NotFound(_)) | Err(ServiceError::InvalidCredentials) => render_login(
            &state,
            &visitor,
            &form,
            &FieldErrors::new(),
            vec![Flash::danger(MSG_BAD_CREDENTIALS)],
        ),
        Err(e) => Err(e.into()),
    }
}

fn register_inputs(form: &RegisterForm, errors: &FieldErrors) -> Vec<FormInput> {
    let mut inputs = vec![
        FormInput::text("First name", "firstname").required().value(&form.firstname),
        FormInput::text("Last name", "lastname").required().value(&form.lastname),
        FormInput::text("Username", "username").required().value(&form.username),
        FormInput::email("Email", "email").required().value(&form.email),
        FormInput::password("Password", "password").required(),
    ];
    attach_errors(&mut inputs, errors);
    inputs
}

fn render_register(
    state: &AppState,
    visitor: &LoggedOut,
    form: &RegisterForm,
    errors: &FieldErrors,
    handler_errors: Vec<Flash>,
) -> PageResult {
    let mut context = TeraContext::new();
    context.insert("inputs", &register_inputs(form, errors));
    context.insert("handlerErrors", &handler_errors);
    visitor
        .page(state, "register")
        .render("auth/register.html", &context)
}

async fn show_register(State(state): State<AppState>, visitor: LoggedOut) -> PageResult {
    render_register(
        &state,
        &visitor,
        &RegisterForm::default(),
        &FieldErrors::new(),
        Vec::new(),
    )
}

/// Duplicate email or username, worded for the account forms.
pub fn conflict_message(message: &str) -> &str {
    match message {
        MSG_EMAIL_IN_USE => MSG_EMAIL_EXISTS,
        MSG_USERNAME_IN_USE => MSG_USERNAME_EXISTS,
        other => other,
    }
}

async fn handle_register(
    State(state): State<AppState>,
    visitor: LoggedOut,
    Form(form): Form<RegisterForm>,
) -> PageResult {
    match state.auth.register(&form).await {
        Ok(user) => {
            tracing::info!("Registered user {}", user.username());
            Ok(redirect_with_flash(
                &state,
                "/login",
                Flash::success(MSG_REGISTERED),
            ))
        }
        Err(ServiceError::Validation(errors)) => {
            render_register(&state, &visitor, &form, &errors, Vec::new())
        }
        Err(ServiceError::Conflict(msg)) => render_register(
            &state,
            &visitor,
            &form,
            &FieldErrors::new(),
            vec![Flash::danger(conflict_message(&msg))],
        ),
        Err(e) => Err(e.into()),
    }
}

async fn handle_logout() -> Response {
    (
        [(header::SET_COOKIE, HeaderValue::from_static(clear_token_cookie()))],
        Redirect::to("/login"),
    )
        .into_response()
}
