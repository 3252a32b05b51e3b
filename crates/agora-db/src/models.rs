//! Row mapping between SQLite and the agora-types domain structs.
//! Column lists live next to their mapper so SELECTs and field indices
//! stay in step.
use agora_types::models::{Comment, ExtraNote, Group, Topic, User};
use rusqlite::Row;

use crate::to_datetime;

pub(crate) const USER_COLUMNS: &str = "id, username, email, about, karma, is_banned, \
     is_superadmin, created_at, updated_at, passwdhash";

/// A user plus the stored password hash, which never leaves this crate.
pub(crate) struct UserRow {
    pub user: User,
    pub password_hash: String,
}

pub(crate) fn user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        user: User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            about: row.get(3)?,
            karma: row.get(4)?,
            is_banned: row.get(5)?,
            is_superadmin: row.get(6)?,
            created_at: to_datetime(row.get(7)?),
            updated_at: to_datetime(row.get(8)?),
        },
        password_hash: row.get(9)?,
    })
}

pub(crate) const GROUP_COLUMNS: &str = "id, name, description, header_msg, is_sticky, \
     is_private, is_closed, created_at, updated_at";

pub(crate) fn group_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        header_msg: row.get(3)?,
        is_sticky: row.get(4)?,
        is_private: row.get(5)?,
        is_closed: row.get(6)?,
        created_at: to_datetime(row.get(7)?),
        updated_at: to_datetime(row.get(8)?),
    })
}

pub(crate) const TOPIC_COLUMNS: &str = "id, title, content, author_id, group_id, is_deleted, \
     is_sticky, is_closed, num_comments, upvotes, downvotes, flagvotes, created_at, updated_at";

pub(crate) fn topic_row(row: &Row<'_>) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        author_id: row.get(3)?,
        group_id: row.get(4)?,
        is_deleted: row.get(5)?,
        is_sticky: row.get(6)?,
        is_closed: row.get(7)?,
        num_comments: row.get(8)?,
        upvotes: row.get(9)?,
        downvotes: row.get(10)?,
        flagvotes: row.get(11)?,
        created_at: to_datetime(row.get(12)?),
        updated_at: to_datetime(row.get(13)?),
    })
}

pub(crate) const COMMENT_COLUMNS: &str = "id, content, author_id, topic_id, parent_id, \
     is_deleted, is_sticky, upvotes, downvotes, flagvotes, created_at, updated_at";

pub(crate) fn comment_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        content: row.get(1)?,
        author_id: row.get(2)?,
        topic_id: row.get(3)?,
        parent_id: row.get(4)?,
        is_deleted: row.get(5)?,
        is_sticky: row.get(6)?,
        upvotes: row.get(7)?,
        downvotes: row.get(8)?,
        flagvotes: row.get(9)?,
        created_at: to_datetime(row.get(10)?),
        updated_at: to_datetime(row.get(11)?),
    })
}

pub(crate) const NOTE_COLUMNS: &str = "id, name, content, url, created_at, updated_at";

pub(crate) fn note_row(row: &Row<'_>) -> rusqlite::Result<ExtraNote> {
    Ok(ExtraNote {
        id: row.get(0)?,
        name: row.get(1)?,
        content: row.get(2)?,
        url: row.get(3)?,
        created_at: to_datetime(row.get(4)?),
        updated_at: to_datetime(row.get(5)?),
    })
}
