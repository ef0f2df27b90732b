//! Shared SELECT fragments and row decoding
//!
//! Users, videos and playlists are always loaded together with the rows they
//! reference (profile, role, topic, owner), so the joins and column aliases
//! live here once.

use anyhow::{anyhow, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::models::{Role, Topic, User, UserMeta, Video};

/// Columns for a user joined with its profile, aliased `u_*` / `m_*`.
pub(super) const USER_COLUMNS: &str = "u.id AS u_id, u.email AS u_email, u.password AS u_password, \
     u.role_id AS u_role_id, u.created_at AS u_created_at, u.updated_at AS u_updated_at, \
     m.id AS m_id, m.firstname AS m_firstname, m.lastname AS m_lastname, \
     m.username AS m_username, m.avatar AS m_avatar";

pub(super) const USER_FROM: &str = "FROM users u JOIN user_meta m ON m.user_id = u.id";

/// Columns for a video with its topic and owner.
pub(super) const VIDEO_COLUMNS: &str = "v.id AS v_id, v.name AS v_name, v.slug AS v_slug, \
     v.thumbnail AS v_thumbnail, v.youtube_id AS v_youtube_id, \
     t.id AS t_id, t.name AS t_name, t.slug AS t_slug, t.icon AS t_icon";

pub(super) const VIDEO_FROM: &str = "FROM videos v \
     JOIN topics t ON t.id = v.topic_id \
     JOIN users u ON u.id = v.user_id \
     JOIN user_meta m ON m.user_id = u.id";

pub(super) fn user_select(tail: &str) -> String {
    format!("SELECT {} {} {}", USER_COLUMNS, USER_FROM, tail)
}

pub(super) fn video_select(tail: &str) -> String {
    format!("SELECT {}, {} {} {}", VIDEO_COLUMNS, USER_COLUMNS, VIDEO_FROM, tail)
}

pub(super) fn user_from_row(row: &SqliteRow) -> Result<User> {
    let role_id: i64 = row.try_get("u_role_id")?;
    let role = Role::from_id(role_id).ok_or_else(|| anyhow!("Unknown role id in database: {}", role_id))?;

    Ok(User {
        id: row.try_get("u_id")?,
        email: row.try_get("u_email")?,
        password_hash: row.try_get("u_password")?,
        role,
        meta: UserMeta {
            id: row.try_get("m_id")?,
            firstname: row.try_get("m_firstname")?,
            lastname: row.try_get("m_lastname")?,
            username: row.try_get("m_username")?,
            avatar: row.try_get("m_avatar")?,
        },
        created_at: row.try_get("u_created_at")?,
        updated_at: row.try_get("u_updated_at")?,
    })
}

/// Topic from an aliased video query (`t_*`).
pub(super) fn joined_topic_from_row(row: &SqliteRow) -> Result<Topic> {
    Ok(Topic {
        id: row.try_get("t_id")?,
        name: row.try_get("t_name")?,
        slug: row.try_get("t_slug")?,
        icon: row.try_get("t_icon")?,
    })
}

/// Topic from a plain `SELECT * FROM topics` row.
pub(super) fn topic_from_row(row: &SqliteRow) -> Result<Topic> {
    Ok(Topic {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        icon: row.try_get("icon")?,
    })
}

pub(super) fn video_from_row(row: &SqliteRow) -> Result<Video> {
    Ok(Video {
        id: row.try_get("v_id")?,
        name: row.try_get("v_name")?,
        slug: row.try_get("v_slug")?,
        thumbnail: row.try_get("v_thumbnail")?,
        youtube_id: row.try_get("v_youtube_id")?,
        user: user_from_row(row)?,
        topic: joined_topic_from_row(row)?,
    })
}

pub(super) fn videos_from_rows(rows: &[SqliteRow]) -> Result<Vec<Video>> {
    rows.iter().map(video_from_row).collect()
}
