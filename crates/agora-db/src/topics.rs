use agora_types::models::Topic;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::groups::query_group;
use crate::models::{TOPIC_COLUMNS, topic_row};
use crate::{Database, DbError, Result, now};

impl Database {
    /// Post a new topic. The group must exist and be open.
    pub fn create_topic(
        &self,
        group_id: i64,
        author_id: i64,
        title: &str,
        content: &str,
    ) -> Result<i64> {
        if title.is_empty() {
            return Err(DbError::Validation("topic title must not be empty".into()));
        }
        let ts = now();
        let id = self.with_tx(|tx| {
            let group = query_group(tx, group_id)?
                .ok_or_else(|| DbError::NotFound(format!("group {}", group_id)))?;
            if group.is_closed {
                return Err(DbError::Validation(format!("group {} is closed", group_id)));
            }
            tx.execute(
                "INSERT INTO topics (title, content, author_id, group_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                rusqlite::params![title, content, author_id, group_id, ts],
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        debug!("Topic {} created in group {}", id, group_id);
        Ok(id)
    }

    pub fn read_topic(&self, id: i64) -> Result<Topic> {
        self.with_conn(|conn| query_topic(conn, id))?
            .ok_or_else(|| DbError::NotFound(format!("topic {}", id)))
    }

    /// Topics of a group, sticky first, newest first.
    pub fn read_topics(&self, group_id: i64, include_deleted: bool) -> Result<Vec<Topic>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TOPIC_COLUMNS} FROM topics
                 WHERE group_id = ?1 AND (?2 OR is_deleted = 0)
                 ORDER BY is_sticky DESC, created_at DESC, id DESC"
            ))?;
            let topics = stmt
                .query_map(rusqlite::params![group_id, include_deleted], topic_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(topics)
        })
    }

    pub fn update_topic(&self, id: i64, title: &str, content: &str) -> Result<()> {
        if title.is_empty() {
            return Err(DbError::Validation("topic title must not be empty".into()));
        }
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE topics SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
                rusqlite::params![title, content, now(), id],
            )?)
        })?;
        require_topic(changed, id)
    }

    pub fn delete_topic(&self, id: i64) -> Result<()> {
        self.set_topic_flag(id, "is_deleted", true)
    }

    pub fn undelete_topic(&self, id: i64) -> Result<()> {
        self.set_topic_flag(id, "is_deleted", false)
    }

    pub fn set_topic_sticky(&self, id: i64, sticky: bool) -> Result<()> {
        self.set_topic_flag(id, "is_sticky", sticky)
    }

    /// A closed topic accepts no new comments.
    pub fn close_topic(&self, id: i64) -> Result<()> {
        self.set_topic_flag(id, "is_closed", true)
    }

    pub fn reopen_topic(&self, id: i64) -> Result<()> {
        self.set_topic_flag(id, "is_closed", false)
    }

    pub fn num_topics(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM topics")
    }

    fn set_topic_flag(&self, id: i64, column: &'static str, value: bool) -> Result<()> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                &format!("UPDATE topics SET {column} = ?1, updated_at = ?2 WHERE id = ?3"),
                rusqlite::params![value, now(), id],
            )?)
        })?;
        require_topic(changed, id)
    }
}

pub(crate) fn query_topic(conn: &Connection, id: i64) -> Result<Option<Topic>> {
    let topic = conn
        .query_row(
            &format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE id = ?1"),
            [id],
            topic_row,
        )
        .optional()?;
    Ok(topic)
}

/// Topic that still accepts activity: present, not soft-deleted and in a
/// group that is not closed. Whether the topic itself is locked is left to
/// the caller.
pub(crate) fn require_live_topic(conn: &Connection, id: i64) -> Result<Topic> {
    let topic =
        query_topic(conn, id)?.ok_or_else(|| DbError::NotFound(format!("topic {}", id)))?;
    if topic.is_deleted {
        return Err(DbError::Validation(format!("topic {} is deleted", id)));
    }
    let group = query_group(conn, topic.group_id)?
        .ok_or_else(|| DbError::NotFound(format!("group {}", topic.group_id)))?;
    if group.is_closed {
        return Err(DbError::Validation(format!("group {} is closed", group.id)));
    }
    Ok(topic)
}

fn require_topic(changed: usize, id: i64) -> Result<()> {
    if changed == 0 {
        return Err(DbError::NotFound(format!("topic {}", id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::test_support::{test_db, user};

    #[test]
    fn create_stamps_and_defaults() {
        let db = test_db();
        let g = db.create_group("lisp", "", "").unwrap();
        let a = user(&db, "mccarthy");
        let id = db.create_topic(g, a, "Parens", "(((())))").unwrap();

        let topic = db.read_topic(id).unwrap();
        assert_eq!(topic.author_id, a);
        assert_eq!(topic.group_id, g);
        assert_eq!(topic.created_at, topic.updated_at);
        assert_eq!((topic.upvotes, topic.downvotes, topic.flagvotes), (0, 0, 0));
        assert_eq!(topic.num_comments, 0);
        assert!(!topic.is_deleted && !topic.is_sticky && !topic.is_closed);
    }

    #[test]
    fn group_must_exist_and_be_open() {
        let db = test_db();
        let a = user(&db, "someone");
        let err = db.create_topic(77, a, "t", "c").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let g = db.create_group("shut", "", "").unwrap();
        db.delete_group(g).unwrap();
        let err = db.create_topic(g, a, "t", "c").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(db.num_topics().unwrap(), 0);
    }

    #[test]
    fn soft_delete_hides_from_listing_only() {
        let db = test_db();
        let g = db.create_group("erlang", "", "").unwrap();
        let a = user(&db, "joe");
        let t1 = db.create_topic(g, a, "first", "").unwrap();
        let t2 = db.create_topic(g, a, "second", "").unwrap();

        db.delete_topic(t1).unwrap();
        let visible: Vec<i64> = db.read_topics(g, false).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(visible, vec![t2]);
        assert_eq!(db.read_topics(g, true).unwrap().len(), 2);
        assert!(db.read_topic(t1).unwrap().is_deleted);

        db.undelete_topic(t1).unwrap();
        assert_eq!(db.read_topics(g, false).unwrap().len(), 2);
    }

    #[test]
    fn sticky_topics_lead() {
        let db = test_db();
        let g = db.create_group("elixir", "", "").unwrap();
        let a = user(&db, "jose");
        let pinned = db.create_topic(g, a, "rules", "").unwrap();
        let newer = db.create_topic(g, a, "chat", "").unwrap();
        db.set_topic_sticky(pinned, true).unwrap();

        let order: Vec<i64> = db.read_topics(g, false).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(order, vec![pinned, newer]);
    }

    #[test]
    fn edits() {
        let db = test_db();
        let g = db.create_group("scheme", "", "").unwrap();
        let a = user(&db, "guy");
        let t = db.create_topic(g, a, "old", "old body").unwrap();

        db.update_topic(t, "new", "new body").unwrap();
        db.close_topic(t).unwrap();
        let topic = db.read_topic(t).unwrap();
        assert_eq!(topic.title, "new");
        assert_eq!(topic.content, "new body");
        assert!(topic.is_closed);

        db.reopen_topic(t).unwrap();
        assert!(!db.read_topic(t).unwrap().is_closed);
        assert_eq!(db.update_topic(999, "x", "").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(db.update_topic(t, "", "").unwrap_err().kind(), ErrorKind::Validation);
    }
}
