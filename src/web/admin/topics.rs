use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Form, Router,
};
use tera::Context as TeraContext;

use crate::api::upload::UploadForm;
use crate::api::AppState;
use crate::models::Topic;
use crate::services::topic::MSG_TOPIC_NOT_FOUND;
use crate::services::validation::{id_field, TopicForm};
use crate::services::{FieldErrors, ServiceError, ServiceResult};
use crate::views::Flash;
use crate::web::admin::{after_delete, paged, render_form, ListQuery, Loaded};
use crate::web::forms::{attach_errors, DeleteForm, FormInput};
use crate::web::session::{AdminUser, WebUser};
use crate::web::{path_id, redirect_with_flash, PageError, PageResult};

const LIST: &str = "/admin/topics";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_topics).delete(delete_topic))
        .route("/delete", post(delete_topic))
        .route("/create", get(show_create).post(handle_create))
        .route("/{id}", get(show_edit).post(handle_edit))
}

async fn list_topics(
    State(state): State<AppState>,
    AdminUser(session): AdminUser,
    Query(query): Query<ListQuery>,
) -> PageResult {
    let filter = ListQuery::filter(&query.topic);
    let all_topics = state.topics.list(None).await?;
    let topics = match filter {
        Some(_) => state.topics.list(filter).await?,
        None => all_topics.clone(),
    };

    let mut context = TeraContext::new();
    context.insert("topics", &paged(topics, &query));
    context.insert("allTopics", &all_topics);
    context.insert("filterByTopic", &filter);
    session
        .page(&state, "admin")
        .action("topics")
        .render("admin/topics.html", &context)
}

fn topic_inputs(name: &str, icon_required: bool, errors: &FieldErrors) -> Vec<FormInput> {
    let icon = FormInput::file("Icon", "icon");
    let mut inputs = vec![
        FormInput::text("Name", "name").required().value(name),
        if icon_required { icon.required() } else { icon },
    ];
    attach_errors(&mut inputs, errors);
    inputs
}

/// Sort a failed save into field errors, or pass it on.
fn save_errors(result: ServiceResult<Topic>) -> Result<FieldErrors, ServiceError> {
    let mut errors = FieldErrors::new();
    match result {
        Ok(_) => {}
        Err(ServiceError::Validation(fields)) => errors = fields,
        Err(ServiceError::Conflict(msg)) => errors.add("name", &msg),
        Err(ServiceError::InvalidUpload(msg)) => errors.add("icon", &msg),
        Err(e) => return Err(e),
    }
    Ok(errors)
}

async fn show_create(State(state): State<AppState>, AdminUser(session): AdminUser) -> PageResult {
    render_create(&state, &session, "", &FieldErrors::new())
}

fn render_create(state: &AppState, session: &WebUser, name: &str, errors: &FieldErrors) -> PageResult {
    render_form(
        state,
        session,
        "topics",
        "Add topic",
        "/admin/topics/create",
        &topic_inputs(name, true, errors),
        &[],
    )
}

async fn handle_create(
    State(state): State<AppState>,
    AdminUser(session): AdminUser,
    multipart: Multipart,
) -> PageResult {
    let mut upload = UploadForm::read(multipart).await?;
    let form = TopicForm {
        name: upload.text("name").to_string(),
    };
    let result = state.topics.create(&form, upload.take_file("icon")).await;
    if result.is_ok() {
        return Ok(Redirect::to(LIST).into_response());
    }
    let errors = save_errors(result)?;
    render_create(&state, &session, &form.name, &errors)
}

/// The topic behind a path id.
async fn load(state: &AppState, raw_id: &str) -> Loaded<Topic> {
    let id = path_id(raw_id).map_err(IntoResponse::into_response)?;
    match state.topics.get(id).await {
        Ok(topic) => Ok(topic),
        Err(ServiceError::NotFound(msg)) => Err(redirect_with_flash(state, LIST, Flash::danger(msg))),
        Err(e) => Err(PageError::from(e).into_response()),
    }
}

fn render_edit(state: &AppState, session: &WebUser, topic: &Topic, name: &str, errors: &FieldErrors) -> PageResult {
    let mut inputs = topic_inputs(name, false, errors);
    inputs.insert(0, FormInput::hidden("id", topic.id));
    render_form(
        state,
        session,
        "topics",
        &format!("Edit topic: {}", topic.name),
        &format!("/admin/topics/{}", topic.id),
        &inputs,
        &[],
    )
}

async fn show_edit(
    State(state): State<AppState>,
    AdminUser(session): AdminUser,
    Path(id): Path<String>,
) -> PageResult {
    let topic = match load(&state, &id).await {
        Ok(topic) => topic,
        Err(response) => return Ok(response),
    };
    render_edit(&state, &session, &topic, &topic.name, &FieldErrors::new())
}

/// Rename the topic. A new icon replaces the old one; without one the
/// icon stays.
async fn handle_edit(
    State(state): State<AppState>,
    AdminUser(session): AdminUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> PageResult {
    let topic = match load(&state, &id).await {
        Ok(topic) => topic,
        Err(response) => return Ok(response),
    };
    let mut upload = UploadForm::read(multipart).await?;
    let form = TopicForm {
        name: upload.text("name").to_string(),
    };
    let result = state
        .topics
        .update(topic.id, &form, upload.take_file("icon"))
        .await;
    if result.is_ok() {
        return Ok(Redirect::to(LIST).into_response());
    }
    let errors = save_errors(result)?;
    render_edit(&state, &session, &topic, &form.name, &errors)
}

async fn delete_topic(
    State(state): State<AppState>,
    AdminUser(_session): AdminUser,
    Form(form): Form<DeleteForm>,
) -> PageResult {
    let result = match id_field(&form.id) {
        Some(id) => state.topics.delete(id).await,
        None => Err(ServiceError::not_found(MSG_TOPIC_NOT_FOUND)),
    };
    after_delete(&state, LIST, form.page(), result)
}
