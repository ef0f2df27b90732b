//! Browsing pages: videos, playlists, teachers, topics and stars

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect},
    routing::get,
    Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::AppState;
use crate::services::ServiceError;
use crate::views::Flash;
use crate::web::session::WebUser;
use crate::web::{path_id, redirect_with_flash, referer_path, PageResult};

const MSG_PLAYLIST_NOT_FOUND: &str = "Playlist was not found.";
const MSG_TEACHER_NOT_FOUND: &str = "Teacher was not found.";
const MSG_TOPIC_NOT_FOUND: &str = "Topic was not found.";
const MSG_VIDEO_NOT_FOUND: &str = "Video was not found.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/playlists", get(show_playlists))
        .route("/playlists/{id}", get(show_playlist))
        .route("/teachers", get(show_teachers))
        .route("/teachers/{id}", get(show_teacher))
        .route("/topics", get(show_topics))
        .route("/topics/{id}", get(show_topic))
        .route("/stars", get(show_stars))
        .route("/stars/addVideo/{id}", get(add_star))
        .route("/stars/deleteVideo/{id}", get(delete_star))
}

#[derive(Debug, Default, Deserialize)]
pub struct TopicFilter {
    pub topic: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UsernameFilter {
    pub username: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

async fn home(
    State(state): State<AppState>,
    session: WebUser,
    Query(filter): Query<TopicFilter>,
) -> PageResult {
    let topic = non_empty(&filter.topic);
    let videos = state.videos.list(topic).await?;
    let topics = state.topics.list(None).await?;
    let starred = state.stars.starred_ids(session.user.id).await?;

    let mut context = TeraContext::new();
    context.insert("videos", &videos);
    context.insert("topics", &topics);
    context.insert("videostarIds", &starred);
    context.insert("filterByTopic", &topic);
    session.page(&state, "videos").render("home.html", &context)
}

async fn show_playlists(
    State(state): State<AppState>,
    session: WebUser,
    Query(filter): Query<UsernameFilter>,
) -> PageResult {
    let username = non_empty(&filter.username);
    let playlists = state.playlists.list(username).await?;
    let teachers = state.users.list_teachers().await?;

    let mut context = TeraContext::new();
    context.insert("playlists", &playlists);
    context.insert("teachers", &teachers);
    context.insert("filterByUsername", &username);
    session
        .page(&state, "playlists")
        .render("reader/playlists/index.html", &context)
}

async fn show_playlist(
    State(state): State<AppState>,
    session: WebUser,
    Path(id): Path<String>,
) -> PageResult {
    let playlist = match state.playlists.get(path_id(&id)?).await {
        Ok(playlist) => playlist,
        Err(ServiceError::NotFound(_)) => {
            return Ok(redirect_with_flash(
                &state,
                "/playlists",
                Flash::danger(MSG_PLAYLIST_NOT_FOUND),
            ))
        }
        Err(e) => return Err(e.into()),
    };
    let starred = state.stars.starred_ids(session.user.id).await?;

    let mut context = TeraContext::new();
    context.insert("playlist", &playlist);
    context.insert("videostarIds", &starred);
    session
        .page(&state, "playlists")
        .render("reader/playlists/detail.html", &context)
}

async fn show_teachers(
    State(state): State<AppState>,
    session: WebUser,
    Query(filter): Query<UsernameFilter>,
) -> PageResult {
    let username = non_empty(&filter.username);
    let all_teachers = state.users.list_teachers().await?;
    let teachers = match username {
        Some(name) => state
            .users
            .find_teacher_by_username(name)
            .await?
            .into_iter()
            .collect(),
        None => all_teachers.clone(),
    };

    let mut context = TeraContext::new();
    context.insert("teachers", &teachers);
    context.insert("allTeachers", &all_teachers);
    context.insert("filterByUsername", &username);
    session
        .page(&state, "teachers")
        .render("reader/teachers/index.html", &context)
}

async fn show_teacher(
    State(state): State<AppState>,
    session: WebUser,
    Path(id): Path<String>,
) -> PageResult {
    let teacher = match state.users.get_teacher(path_id(&id)?).await {
        Ok(teacher) => teacher,
        Err(ServiceError::NotFound(_)) => {
            return Ok(redirect_with_flash(
                &state,
                "/teachers",
                Flash::danger(MSG_TEACHER_NOT_FOUND),
            ))
        }
        Err(e) => return Err(e.into()),
    };
    let videos = state.videos.list_by_owner(teacher.id).await?;
    let playlists = state.playlists.list_by_owner(teacher.id).await?;
    let starred = state.stars.starred_ids(session.user.id).await?;

    let mut context = TeraContext::new();
    context.insert("teacher", &teacher);
    context.insert("videos", &videos);
    context.insert("playlists", &playlists);
    context.insert("videostarIds", &starred);
    session
        .page(&state, "teachers")
        .render("reader/teachers/detail.html", &context)
}

async fn show_topics(
    State(state): State<AppState>,
    session: WebUser,
    Query(filter): Query<TopicFilter>,
) -> PageResult {
    let topic = non_empty(&filter.topic);
    let topics = state.topics.list(topic).await?;
    let all_topics = state.topics.list(None).await?;

    let mut context = TeraContext::new();
    context.insert("topics", &topics);
    context.insert("allTopics", &all_topics);
    context.insert("filterByTopic", &topic);
    session
        .page(&state, "topics")
        .render("reader/topics/index.html", &context)
}

async fn show_topic(
    State(state): State<AppState>,
    session: WebUser,
    Path(id): Path<String>,
) -> PageResult {
    let topic = match state.topics.get_with_videos(path_id(&id)?).await {
        Ok(topic) => topic,
        Err(ServiceError::NotFound(_)) => {
            return Ok(redirect_with_flash(
                &state,
                "/topics",
                Flash::danger(MSG_TOPIC_NOT_FOUND),
            ))
        }
        Err(e) => return Err(e.into()),
    };
    let starred = state.stars.starred_ids(session.user.id).await?;

    let mut context = TeraContext::new();
    context.insert("topic", &topic);
    context.insert("videostarIds", &starred);
    session
        .page(&state, "topics")
        .render("reader/topics/detail.html", &context)
}

async fn show_stars(State(state): State<AppState>, session: WebUser) -> PageResult {
    let stars = state.stars.list(session.user.id).await?;
    let starred: Vec<i64> = stars.iter().map(|s| s.video.id).collect();
    let videos: Vec<_> = stars.into_iter().map(|s| s.video).collect();

    let mut context = TeraContext::new();
    context.insert("videos", &videos);
    context.insert("videostarIds", &starred);
    session.page(&state, "stars").render("reader/stars.html", &context)
}

async fn add_star(
    State(state): State<AppState>,
    session: WebUser,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> PageResult {
    let back = referer_path(&headers, "/stars");
    match state.stars.add(session.user.id, path_id(&id)?).await {
        Ok(()) => Ok(Redirect::to(&back).into_response()),
        Err(ServiceError::NotFound(_)) => Ok(redirect_with_flash(
            &state,
            &back,
            Flash::danger(MSG_VIDEO_NOT_FOUND),
        )),
        Err(e) => Err(e.into()),
    }
}

async fn delete_star(
    State(state): State<AppState>,
    session: WebUser,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> PageResult {
    let back = referer_path(&headers, "/stars");
    state.stars.remove(session.user.id, path_id(&id)?).await?;
    Ok(Redirect::to(&back).into_response())
}
