use agora_types::models::Comment;
use rusqlite::OptionalExtension;
use tracing::debug;

use crate::models::{COMMENT_COLUMNS, comment_row};
use crate::topics::require_live_topic;
use crate::{Database, DbError, Result, now};

impl Database {
    /// Reply to a topic, or to `parent_id` within the same topic. Bumps the
    /// topic's comment count in the same transaction. Deleted or closed
    /// topics and topics of closed groups take no replies.
    pub fn create_comment(
        &self,
        topic_id: i64,
        author_id: i64,
        parent_id: Option<i64>,
        content: &str,
    ) -> Result<i64> {
        if content.is_empty() {
            return Err(DbError::Validation("comment must not be empty".into()));
        }
        let ts = now();
        let id = self.with_tx(|tx| {
            let topic = require_live_topic(tx, topic_id)?;
            if topic.is_closed {
                return Err(DbError::Validation(format!("topic {} is closed", topic_id)));
            }

            if let Some(pid) = parent_id {
                let parent_topic: Option<i64> = tx
                    .query_row("SELECT topic_id FROM comments WHERE id = ?1", [pid], |row| {
                        row.get(0)
                    })
                    .optional()?;
                if parent_topic != Some(topic_id) {
                    return Err(DbError::Validation(format!(
                        "parent comment {} is not in topic {}",
                        pid, topic_id
                    )));
                }
            }

            tx.execute(
                "INSERT INTO comments (content, author_id, topic_id, parent_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                rusqlite::params![content, author_id, topic_id, parent_id, ts],
            )?;
            let id = tx.last_insert_rowid();
            tx.execute(
                "UPDATE topics SET num_comments = num_comments + 1 WHERE id = ?1",
                [topic_id],
            )?;
            Ok(id)
        })?;
        debug!("Comment {} created in topic {}", id, topic_id);
        Ok(id)
    }

    pub fn read_comment(&self, id: i64) -> Result<Comment> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
                    [id],
                    comment_row,
                )
                .optional()?)
        })?
        .ok_or_else(|| DbError::NotFound(format!("comment {}", id)))
    }

    /// Every comment of the topic in posting order, deleted ones included
    /// so threads keep their shape.
    pub fn read_comments(&self, topic_id: i64) -> Result<Vec<Comment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE topic_id = ?1 ORDER BY id"
            ))?;
            let comments = stmt
                .query_map([topic_id], comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(comments)
        })
    }

    pub fn update_comment(&self, id: i64, content: &str) -> Result<()> {
        if content.is_empty() {
            return Err(DbError::Validation("comment must not be empty".into()));
        }
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE comments SET content = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![content, now(), id],
            )?)
        })?;
        require_comment(changed, id)
    }

    pub fn delete_comment(&self, id: i64) -> Result<()> {
        self.set_comment_flag(id, "is_deleted", true)
    }

    pub fn undelete_comment(&self, id: i64) -> Result<()> {
        self.set_comment_flag(id, "is_deleted", false)
    }

    pub fn set_comment_sticky(&self, id: i64, sticky: bool) -> Result<()> {
        self.set_comment_flag(id, "is_sticky", sticky)
    }

    pub fn num_comments(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM comments")
    }

    fn set_comment_flag(&self, id: i64, column: &'static str, value: bool) -> Result<()> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                &format!("UPDATE comments SET {column} = ?1, updated_at = ?2 WHERE id = ?3"),
                rusqlite::params![value, now(), id],
            )?)
        })?;
        require_comment(changed, id)
    }
}

fn require_comment(changed: usize, id: i64) -> Result<()> {
    if changed == 0 {
        return Err(DbError::NotFound(format!("comment {}", id)));
    }
    Ok(())
}
