use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::AppState;
use crate::models::{Playlist, Role, VideoSetMode};
use crate::services::playlist::{retain_by_name, MSG_PLAYLIST_NOT_FOUND};
use crate::services::validation::{id_field, lenient_text, parse_id_list, PlaylistForm};
use crate::services::{FieldErrors, ServiceError};
use crate::views::Flash;
use crate::web::admin::{after_delete, paged, ListQuery, Loaded};
use crate::web::forms::{attach_errors, DeleteForm, FormInput, SelectOption};
use crate::web::session::{TeacherUser, WebUser};
use crate::web::{path_id, redirect_with_flash, PageError, PageResult};

const LIST: &str = "/admin/playlists";
const MSG_EDIT_DENIED: &str = "You are not authorized to edit that playlist.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_playlists).delete(delete_playlist))
        .route("/delete", post(delete_playlist))
        .route("/create", get(show_create).post(handle_create))
        .route("/{id}", get(show_edit).post(handle_edit))
}

/// Playlist editor body. `videos` is the comma separated id list the
/// video picker maintains.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PlaylistPage {
    name: String,
    #[serde(deserialize_with = "lenient_text")]
    user_id: String,
    videos: String,
}

impl PlaylistPage {
    fn form(&self) -> PlaylistForm {
        PlaylistForm {
            name: self.name.clone(),
            user_id: self.user_id.clone(),
        }
    }

    fn video_ids(&self) -> Vec<i64> {
        parse_id_list(&self.videos)
    }

    fn stored(playlist: &Playlist) -> Self {
        Self {
            name: playlist.name.clone(),
            user_id: playlist.owner_id().to_string(),
            videos: playlist
                .video_ids()
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

async fn list_playlists(
    State(state): State<AppState>,
    TeacherUser(session): TeacherUser,
    Query(query): Query<ListQuery>,
) -> PageResult {
    let all_playlists = state
        .playlists
        .dashboard_list(session.requester(), None)
        .await?;
    let name = ListQuery::filter(&query.name);
    let mut playlists = all_playlists.clone();
    retain_by_name(&mut playlists, name);

    let mut context = TeraContext::new();
    context.insert("playlists", &paged(playlists, &query));
    context.insert("allPlaylists", &all_playlists);
    context.insert("filterByName", &name);
    session
        .page(&state, "admin")
        .action("playlists")
        .render("admin/playlists.html", &context)
}

/// Editor inputs plus the videos the picker offers. Teachers can only pick
/// their own videos.
async fn playlist_inputs(
    state: &AppState,
    session: &WebUser,
    owner_id: i64,
    page: &PlaylistPage,
    errors: &FieldErrors,
) -> Result<(Vec<FormInput>, Vec<SelectOption>), ServiceError> {
    let mut inputs = vec![
        FormInput::hidden("videos", &page.videos),
        FormInput::text("Title", "name").required().value(&page.name),
    ];
    if session.role() == Role::Admin {
        let teachers = state.users.list_teachers().await?;
        inputs.push(
            FormInput::select("Teacher", "user_id", SelectOption::users(&teachers))
                .required()
                .value(&page.user_id),
        );
    } else {
        inputs.push(FormInput::hidden("user_id", owner_id));
    }
    attach_errors(&mut inputs, errors);

    let videos = state.videos.dashboard_list(session.requester(), None).await?;
    Ok((inputs, SelectOption::videos(&videos)))
}

#[allow(clippy::too_many_arguments)]
async fn render_editor(
    state: &AppState,
    session: &WebUser,
    title: &str,
    form_action: &str,
    owner_id: i64,
    page: &PlaylistPage,
    errors: &FieldErrors,
    handler_errors: &[Flash],
) -> PageResult {
    let (inputs, all_videos) = playlist_inputs(state, session, owner_id, page, errors).await?;
    let mut context = TeraContext::new();
    context.insert("title", title);
    context.insert("formAction", form_action);
    context.insert("inputs", &inputs);
    context.insert("handlerErrors", handler_errors);
    context.insert("allVideos", &all_videos);
    context.insert("selectedVideos", &page.video_ids());
    session
        .page(state, "admin")
        .action("playlists")
        .render("admin/playlist_form.html", &context)
}

async fn show_create(State(state): State<AppState>, TeacherUser(session): TeacherUser) -> PageResult {
    render_editor(
        &state,
        &session,
        "Add playlist",
        "/admin/playlists/create",
        session.user.id,
        &PlaylistPage::default(),
        &FieldErrors::new(),
        &[],
    )
    .await
}

async fn handle_create(
    State(state): State<AppState>,
    TeacherUser(session): TeacherUser,
    Form(page): Form<PlaylistPage>,
) -> PageResult {
    let result = state
        .playlists
        .create(session.requester(), &page.form(), &page.video_ids())
        .await;
    let (errors, handler_errors) = match result {
        Ok(_) => return Ok(Redirect::to(LIST).into_response()),
        Err(ServiceError::Forbidden(msg)) => {
            return Ok(redirect_with_flash(&state, LIST, Flash::danger(msg)))
        }
        Err(ServiceError::Validation(errors)) => (errors, Vec::new()),
        Err(ServiceError::NotFound(msg)) => (FieldErrors::new(), vec![Flash::danger(msg)]),
        Err(e) => return Err(e.into()),
    };
    render_editor(
        &state,
        &session,
        "Add playlist",
        "/admin/playlists/create",
        session.user.id,
        &page,
        &errors,
        &handler_errors,
    )
    .await
}

/// The playlist if the session may edit it.
async fn editable(state: &AppState, session: &WebUser, raw_id: &str) -> Loaded<Playlist> {
    let id = path_id(raw_id).map_err(IntoResponse::into_response)?;
    match state.playlists.get_editable(session.requester(), id).await {
        Ok(playlist) => Ok(playlist),
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
    let playlist = match editable(&state, &session, &id).await {
        Ok(playlist) => playlist,
        Err(response) => return Ok(response),
    };
    render_editor(
        &state,
        &session,
        &format!("Edit playlist: {}", playlist.name),
        &format!("/admin/playlists/{}", playlist.id),
        playlist.owner_id(),
        &PlaylistPage::stored(&playlist),
        &FieldErrors::new(),
        &[],
    )
    .await
}

/// Save the editor. The submitted videos become the playlist's whole set.
async fn handle_edit(
    State(state): State<AppState>,
    TeacherUser(session): TeacherUser,
    Path(id): Path<String>,
    Form(page): Form<PlaylistPage>,
) -> PageResult {
    let playlist = match editable(&state, &session, &id).await {
        Ok(playlist) => playlist,
        Err(response) => return Ok(response),
    };

    let result = state
        .playlists
        .update(
            session.requester(),
            playlist.id,
            &page.form(),
            &page.video_ids(),
            VideoSetMode::Replace,
        )
        .await;
    let (errors, handler_errors) = match result {
        Ok(_) => return Ok(Redirect::to(LIST).into_response()),
        Err(ServiceError::Forbidden(_)) => {
            return Ok(redirect_with_flash(
                &state,
                LIST,
                Flash::danger(MSG_EDIT_DENIED),
            ))
        }
        Err(ServiceError::Validation(errors)) => (errors, Vec::new()),
        Err(ServiceError::NotFound(msg)) => (FieldErrors::new(), vec![Flash::danger(msg)]),
        Err(e) => return Err(e.into()),
    };
    render_editor(
        &state,
        &session,
        &format!("Edit playlist: {}", playlist.name),
        &format!("/admin/playlists/{}", playlist.id),
        playlist.owner_id(),
        &page,
        &errors,
        &handler_errors,
    )
    .await
}

async fn delete_playlist(
    State(state): State<AppState>,
    TeacherUser(session): TeacherUser,
    Form(form): Form<DeleteForm>,
) -> PageResult {
    let result = match id_field(&form.id) {
        Some(id) => state.playlists.delete(session.requester(), id).await,
        None => Err(ServiceError::not_found(MSG_PLAYLIST_NOT_FOUND)),
    };
    after_delete(&state, LIST, form.page(), result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_video_ids() {
        let page = PlaylistPage {
            name: "Intro".to_string(),
            user_id: "2".to_string(),
            videos: "3, 1,,x,2".to_string(),
        };
        assert_eq!(page.video_ids(), vec![3, 1, 2]);
        assert_eq!(page.form().user_id, "2");
    }

    #[test]
    fn test_empty_picker_means_no_videos() {
        assert!(PlaylistPage::default().video_ids().is_empty());
    }
}
