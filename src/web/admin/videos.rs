use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Form, Router,
};
use tera::Context as TeraContext;

use crate::api::AppState;
use crate::models::{Role, Video, VideoPatch};
use crate::services::validation::{id_field, VideoForm};
use crate::services::video::MSG_VIDEO_NOT_FOUND;
use crate::services::{FieldErrors, ServiceError};
use crate::views::Flash;
use crate::web::admin::{after_delete, paged, render_form, ListQuery, Loaded};
use crate::web::forms::{attach_errors, DeleteForm, FormInput, SelectOption};
use crate::web::session::{TeacherUser, WebUser};
use crate::web::{path_id, redirect_with_flash, PageError, PageResult};

const LIST: &str = "/admin/videos";
const MSG_EDIT_DENIED: &str = "You are not authorized to edit that video.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_videos).delete(delete_video))
        .route("/delete", post(delete_video))
        .route("/create", get(show_create).post(handle_create))
        .route("/{id}", get(show_edit).post(handle_edit))
}

async fn list_videos(
    State(state): State<AppState>,
    TeacherUser(session): TeacherUser,
    Query(query): Query<ListQuery>,
) -> PageResult {
    let topic = ListQuery::filter(&query.topic);
    let videos = state
        .videos
        .dashboard_list(session.requester(), topic)
        .await?;
    let topics = state.topics.list(None).await?;

    let mut context = TeraContext::new();
    context.insert("videos", &paged(videos, &query));
    context.insert("topics", &topics);
    context.insert("filterByTopic", &topic);
    session
        .page(&state, "admin")
        .action("videos")
        .render("admin/videos.html", &context)
}

/// Inputs of the create and edit pages. Teachers own whatever they save,
/// so they get a hidden owner field; admins pick a teacher.
async fn video_inputs(
    state: &AppState,
    role: Role,
    owner_id: i64,
    form: &VideoForm,
    errors: &FieldErrors,
) -> Result<Vec<FormInput>, ServiceError> {
    let topics = state.topics.list(None).await?;
    let mut inputs = vec![
        FormInput::select("Topic", "topic_id", SelectOption::topics(&topics))
            .required()
            .value(&form.topic_id),
        FormInput::text("Title", "name").required().value(&form.name),
        FormInput::url("Thumbnail (url)", "thumbnail")
            .required()
            .value(&form.thumbnail),
        FormInput::text("YouTube ID", "youtube_id")
            .required()
            .value(&form.youtube_id),
    ];
    if role == Role::Admin {
        let teachers = state.users.list_teachers().await?;
        inputs.push(
            FormInput::select("Teacher", "user_id", SelectOption::users(&teachers))
                .required()
                .value(&form.user_id),
        );
    } else {
        inputs.push(FormInput::hidden("user_id", owner_id));
    }
    attach_errors(&mut inputs, errors);
    Ok(inputs)
}

fn stored_form(video: &Video) -> VideoForm {
    VideoForm {
        topic_id: video.topic.id.to_string(),
        name: video.name.clone(),
        thumbnail: video.thumbnail.clone(),
        youtube_id: video.youtube_id.clone(),
        user_id: video.owner_id().to_string(),
    }
}

async fn show_create(State(state): State<AppState>, TeacherUser(session): TeacherUser) -> PageResult {
    let form = VideoForm::default();
    let inputs = video_inputs(
        &state,
        session.role(),
        session.user.id,
        &form,
        &FieldErrors::new(),
    )
    .await?;
    render_form(
        &state,
        &session,
        "videos",
        "Add video",
        "/admin/videos/create",
        &inputs,
        &[],
    )
}

async fn handle_create(
    State(state): State<AppState>,
    TeacherUser(session): TeacherUser,
    Form(form): Form<VideoForm>,
) -> PageResult {
    let (errors, handler_errors) = match state.videos.create(session.requester(), &form).await {
        Ok(_) => return Ok(Redirect::to(LIST).into_response()),
        Err(ServiceError::Forbidden(msg)) => {
            return Ok(redirect_with_flash(&state, LIST, Flash::danger(msg)))
        }
        Err(ServiceError::Validation(errors)) => (errors, Vec::new()),
        Err(ServiceError::NotFound(msg)) | Err(ServiceError::Conflict(msg)) => {
            (FieldErrors::new(), vec![Flash::danger(msg)])
        }
        Err(e) => return Err(e.into()),
    };
    let inputs = video_inputs(&state, session.role(), session.user.id, &form, &errors).await?;
    render_form(
        &state,
        &session,
        "videos",
        "Add video",
        "/admin/videos/create",
        &inputs,
        &handler_errors,
    )
}

/// The video if the session may edit it.
async fn editable(state: &AppState, session: &WebUser, raw_id: &str) -> Loaded<Video> {
    let id = path_id(raw_id).map_err(IntoResponse::into_response)?;
    match state.videos.get_editable(session.requester(), id).await {
        Ok(video) => Ok(video),
        Err(ServiceError::NotFound(msg)) => Err(redirect_with_flash(state, LIST, Flash::danger(msg))),
        Err(ServiceError::Forbidden(_)) => Err(redirect_with_flash(
            state,
            LIST,
            Flash::danger(MSG_EDIT_DENIED),
        )),
        Err(e) => Err(PageError::from(e).into_response()),
    }
}

async fn show_edit(
    State(state): State<AppState>,
    TeacherUser(session): TeacherUser,
    Path(id): Path<String>,
) -> PageResult {
    let video = match editable(&state, &session, &id).await {
        Ok(video) => video,
        Err(redirect) => return Ok(redirect),
    };
    let inputs = video_inputs(
        &state,
        session.role(),
        video.owner_id(),
        &stored_form(&video),
        &FieldErrors::new(),
    )
    .await?;
    render_form(
        &state,
        &session,
        "videos",
        &format!("Edit video: {}", video.name),
        &format!("/admin/videos/{}", video.id),
        &inputs,
        &[],
    )
}

async fn handle_edit(
    State(state): State<AppState>,
    TeacherUser(session): TeacherUser,
    Path(id): Path<String>,
    Form(form): Form<VideoForm>,
) -> PageResult {
    let video = match editable(&state, &session, &id).await {
        Ok(video) => video,
        Err(redirect) => return Ok(redirect),
    };

    let mut errors = form.validate();
    let mut handler_errors = Vec::new();
    if errors.is_empty() {
        let patch = VideoPatch {
            name: Some(form.name.clone()),
            thumbnail: Some(form.thumbnail.clone()),
            youtube_id: Some(form.youtube_id.clone()),
            topic_id: id_field(&form.topic_id),
            user_id: id_field(&form.user_id),
        };
        match state.videos.update(session.requester(), video.id, patch).await {
            Ok(_) => return Ok(Redirect::to(LIST).into_response()),
            Err(ServiceError::Forbidden(_)) => {
                return Ok(redirect_with_flash(
                    &state,
                    LIST,
                    Flash::danger(MSG_EDIT_DENIED),
                ))
            }
            Err(ServiceError::Validation(e)) => errors = e,
            Err(ServiceError::NotFound(msg)) | Err(ServiceError::Conflict(msg)) => {
                handler_errors.push(Flash::danger(msg))
            }
            Err(e) => return Err(e.into()),
        }
    }

    let inputs = video_inputs(&state, session.role(), video.owner_id(), &form, &errors).await?;
    render_form(
        &state,
        &session,
        "videos",
        &format!("Edit video: {}", video.name),
        &format!("/admin/videos/{}", video.id),
        &inputs,
        &handler_errors,
    )
}

async fn delete_video(
    State(state): State<AppState>,
    TeacherUser(session): TeacherUser,
    Form(form): Form<DeleteForm>,
) -> PageResult {
    let result = match id_field(&form.id) {
        Some(id) => state.videos.delete(session.requester(), id).await,
        None => Err(ServiceError::not_found(MSG_VIDEO_NOT_FOUND)),
    };
    after_delete(&state, LIST, form.page(), result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_state;

    #[tokio::test]
    async fn test_teacher_form_hides_owner() {
        let state = test_state().await;
        let inputs = video_inputs(
            &state,
            Role::Teacher,
            5,
            &VideoForm::default(),
            &FieldErrors::new(),
        )
        .await
        .unwrap();
        let owner = inputs.iter().find(|i| i.name == "user_id").unwrap();
        assert_eq!(owner.kind, "hidden");
        assert_eq!(owner.value, "5");
    }

    #[tokio::test]
    async fn test_admin_form_selects_teacher() {
        let state = test_state().await;
        let inputs = video_inputs(
            &state,
            Role::Admin,
            1,
            &VideoForm::default(),
            &FieldErrors::new(),
        )
        .await
        .unwrap();
        let owner = inputs.iter().find(|i| i.name == "user_id").unwrap();
        assert_eq!(owner.kind, "select");
    }
}
