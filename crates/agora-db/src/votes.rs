use agora_types::models::VoteKind;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::topics::require_live_topic;
use crate::{Database, DbError, Result, now};

/// Votable content.
#[derive(Debug, Clone, Copy)]
enum Target {
    Topic,
    Comment,
}

impl Target {
    fn table(self) -> &'static str {
        match self {
            Self::Topic => "topics",
            Self::Comment => "comments",
        }
    }

    fn vote_table(self) -> &'static str {
        match self {
            Self::Topic => "topicvotes",
            Self::Comment => "commentvotes",
        }
    }

    /// Author of the target, provided it is still visible: not deleted and
    /// not inside a deleted topic or a closed group.
    fn live_author(self, conn: &Connection, id: i64) -> Result<i64> {
        match self {
            Self::Topic => Ok(require_live_topic(conn, id)?.author_id),
            Self::Comment => {
                let (author_id, topic_id, is_deleted): (i64, i64, bool) = conn
                    .query_row(
                        "SELECT author_id, topic_id, is_deleted FROM comments WHERE id = ?1",
                        [id],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                    )
                    .optional()?
                    .ok_or_else(|| DbError::NotFound(format!("comment {}", id)))?;
                if is_deleted {
                    return Err(DbError::Validation(format!("comment {} is deleted", id)));
                }
                require_live_topic(conn, topic_id)?;
                Ok(author_id)
            }
        }
    }

    fn id_column(self) -> &'static str {
        match self {
            Self::Topic => "topic_id",
            Self::Comment => "comment_id",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::Comment => "comment",
        }
    }
}

fn counter_column(kind: VoteKind) -> &'static str {
    match kind {
        VoteKind::Up => "upvotes",
        VoteKind::Down => "downvotes",
        VoteKind::Flag => "flagvotes",
    }
}

impl Database {
    /// Record `user_id`'s vote on a topic. Fails with `AlreadyExists` if the
    /// user has already voted on it.
    pub fn vote_topic(&self, user_id: i64, topic_id: i64, kind: VoteKind) -> Result<()> {
        self.cast_vote(Target::Topic, user_id, topic_id, kind)
    }

    /// Record `user_id`'s vote on a comment. Fails with `AlreadyExists` if
    /// the user has already voted on it.
    pub fn vote_comment(&self, user_id: i64, comment_id: i64, kind: VoteKind) -> Result<()> {
        self.cast_vote(Target::Comment, user_id, comment_id, kind)
    }

    pub fn read_topic_vote(&self, user_id: i64, topic_id: i64) -> Result<Option<VoteKind>> {
        self.read_vote(Target::Topic, user_id, topic_id)
    }

    pub fn read_comment_vote(&self, user_id: i64, comment_id: i64) -> Result<Option<VoteKind>> {
        self.read_vote(Target::Comment, user_id, comment_id)
    }

    /// Vote row, counter bump and author karma change commit together or
    /// not at all. Hidden content takes no votes.
    fn cast_vote(&self, target: Target, user_id: i64, target_id: i64, kind: VoteKind) -> Result<()> {
        self.with_tx(|tx| {
            let author_id = target.live_author(tx, target_id)?;

            tx.execute(
                &format!(
                    "INSERT INTO {} (user_id, {}, vote_type, created_at) VALUES (?1, ?2, ?3, ?4)",
                    target.vote_table(),
                    target.id_column()
                ),
                (user_id, target_id, kind.as_i64(), now()),
            )
            .map_err(|e| {
                DbError::from(e).or_exists(|| {
                    format!("vote by user {} on {} {}", user_id, target.noun(), target_id)
                })
            })?;

            let counter = counter_column(kind);
            tx.execute(
                &format!(
                    "UPDATE {} SET {counter} = {counter} + 1 WHERE id = ?1",
                    target.table()
                ),
                [target_id],
            )?;

            let delta = kind.karma_delta();
            if delta != 0 {
                tx.execute(
                    "UPDATE users SET karma = karma + ?1 WHERE id = ?2",
                    (delta, author_id),
                )?;
            }
            Ok(())
        })?;

        debug!(
            "User {} voted {:?} on {} {}",
            user_id,
            kind,
            target.noun(),
            target_id
        );
        Ok(())
    }

    fn read_vote(&self, target: Target, user_id: i64, target_id: i64) -> Result<Option<VoteKind>> {
        let stored: Option<i64> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT vote_type FROM {} WHERE user_id = ?1 AND {} = ?2",
                        target.vote_table(),
                        target.id_column()
                    ),
                    (user_id, target_id),
                    |row| row.get(0),
                )
                .optional()?)
        })?;
        Ok(stored.and_then(VoteKind::from_i64))
    }
}
