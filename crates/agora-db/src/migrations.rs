use agora_types::config::ForumConfig;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::config::upsert_config;
use crate::{Database, DbError, Result};

/// Schema version this build expects.
pub const MODEL_VERSION: i64 = 1;

impl Database {
    /// Create the schema on a fresh store and seed the default settings.
    /// Refuses to run against a store that already has a schema.
    pub fn migrate(&self) -> Result<()> {
        self.with_tx(|tx| {
            let current = schema_version(tx)?;
            if current != 0 {
                return Err(DbError::Internal(format!(
                    "schema already present (version {current}), refusing to migrate"
                )));
            }

            create_tables(tx)?;
            for (key, value) in ForumConfig::default().to_pairs() {
                upsert_config(tx, key.as_str(), &value)?;
            }
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [MODEL_VERSION],
            )?;
            Ok(())
        })?;

        info!("Database migrated to schema version {}", MODEL_VERSION);
        Ok(())
    }

    /// True when the stored schema version differs from `MODEL_VERSION`.
    /// A store that was never migrated reports version 0.
    pub fn is_migration_needed(&self) -> Result<bool> {
        let version = self.with_conn(schema_version)?;
        Ok(version != MODEL_VERSION)
    }

    pub fn schema_version(&self) -> Result<i64> {
        self.with_conn(schema_version)
    }
}

fn schema_version(conn: &Connection) -> Result<i64> {
    let has_table = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !has_table {
        return Ok(0);
    }

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;
    Ok(version)
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE schema_version (version INTEGER NOT NULL);

        CREATE TABLE users (
            id                INTEGER PRIMARY KEY,
            username          TEXT NOT NULL UNIQUE,
            passwdhash        TEXT NOT NULL,
            email             TEXT NOT NULL DEFAULT '',
            about             TEXT NOT NULL DEFAULT '',
            karma             INTEGER NOT NULL DEFAULT 0,
            is_banned         INTEGER NOT NULL DEFAULT 0,
            is_superadmin     INTEGER NOT NULL DEFAULT 0,
            reset_token       TEXT NOT NULL DEFAULT '',
            reset_token_date  INTEGER NOT NULL DEFAULT 0,
            created_at        INTEGER NOT NULL,
            updated_at        INTEGER NOT NULL
        );

        CREATE INDEX idx_users_reset_token ON users(reset_token);

        CREATE TABLE "groups" (
            id           INTEGER PRIMARY KEY,
            name         TEXT NOT NULL UNIQUE,
            description  TEXT NOT NULL DEFAULT '',
            header_msg   TEXT NOT NULL DEFAULT '',
            is_sticky    INTEGER NOT NULL DEFAULT 0,
            is_private   INTEGER NOT NULL DEFAULT 0,
            is_closed    INTEGER NOT NULL DEFAULT 0,
            created_at   INTEGER NOT NULL,
            updated_at   INTEGER NOT NULL
        );

        CREATE TABLE topics (
            id            INTEGER PRIMARY KEY,
            title         TEXT NOT NULL,
            content       TEXT NOT NULL DEFAULT '',
            author_id     INTEGER NOT NULL REFERENCES users(id),
            group_id      INTEGER NOT NULL REFERENCES "groups"(id),
            is_deleted    INTEGER NOT NULL DEFAULT 0,
            is_sticky     INTEGER NOT NULL DEFAULT 0,
            is_closed     INTEGER NOT NULL DEFAULT 0,
            num_comments  INTEGER NOT NULL DEFAULT 0,
            upvotes       INTEGER NOT NULL DEFAULT 0,
            downvotes     INTEGER NOT NULL DEFAULT 0,
            flagvotes     INTEGER NOT NULL DEFAULT 0,
            created_at    INTEGER NOT NULL,
            updated_at    INTEGER NOT NULL
        );

        CREATE INDEX idx_topics_group ON topics(group_id, is_sticky, created_at);

        CREATE TABLE comments (
            id          INTEGER PRIMARY KEY,
            content     TEXT NOT NULL,
            author_id   INTEGER NOT NULL REFERENCES users(id),
            topic_id    INTEGER NOT NULL REFERENCES topics(id),
            parent_id   INTEGER REFERENCES comments(id),
            is_deleted  INTEGER NOT NULL DEFAULT 0,
            is_sticky   INTEGER NOT NULL DEFAULT 0,
            upvotes     INTEGER NOT NULL DEFAULT 0,
            downvotes   INTEGER NOT NULL DEFAULT 0,
            flagvotes   INTEGER NOT NULL DEFAULT 0,
            created_at  INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL
        );

        CREATE INDEX idx_comments_topic ON comments(topic_id, id);

        CREATE TABLE mods (
            id          INTEGER PRIMARY KEY,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            group_id    INTEGER NOT NULL REFERENCES "groups"(id),
            created_at  INTEGER NOT NULL,
            UNIQUE(user_id, group_id)
        );

        CREATE TABLE admins (
            id          INTEGER PRIMARY KEY,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            group_id    INTEGER NOT NULL REFERENCES "groups"(id),
            created_at  INTEGER NOT NULL,
            UNIQUE(user_id, group_id)
        );

        CREATE TABLE topicvotes (
            id          INTEGER PRIMARY KEY,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            topic_id    INTEGER NOT NULL REFERENCES topics(id),
            vote_type   INTEGER NOT NULL CHECK (vote_type IN (1, 2, 3)),
            created_at  INTEGER NOT NULL,
            UNIQUE(user_id, topic_id)
        );

        CREATE TABLE commentvotes (
            id          INTEGER PRIMARY KEY,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            comment_id  INTEGER NOT NULL REFERENCES comments(id),
            vote_type   INTEGER NOT NULL CHECK (vote_type IN (1, 2, 3)),
            created_at  INTEGER NOT NULL,
            UNIQUE(user_id, comment_id)
        );

        CREATE TABLE topicsubscriptions (
            id          INTEGER PRIMARY KEY,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            topic_id    INTEGER NOT NULL REFERENCES topics(id),
            created_at  INTEGER NOT NULL,
            UNIQUE(user_id, topic_id)
        );

        CREATE TABLE groupsubscriptions (
            id          INTEGER PRIMARY KEY,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            group_id    INTEGER NOT NULL REFERENCES "groups"(id),
            created_at  INTEGER NOT NULL,
            UNIQUE(user_id, group_id)
        );

        CREATE TABLE extranotes (
            id          INTEGER PRIMARY KEY,
            name        TEXT NOT NULL,
            content     TEXT NOT NULL DEFAULT '',
            url         TEXT NOT NULL DEFAULT '',
            created_at  INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL
        );

        CREATE TABLE configs (
            key  TEXT PRIMARY KEY,
            val  TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn fresh_store_needs_migration() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), 0);
        assert!(db.is_migration_needed().unwrap());

        db.migrate().unwrap();
        assert_eq!(db.schema_version().unwrap(), MODEL_VERSION);
        assert!(!db.is_migration_needed().unwrap());
    }

    #[test]
    fn migrate_seeds_defaults() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();

        assert_eq!(db.config("forum_name"), "Agora");
        assert_eq!(db.config("smtp_port"), "25");
        assert_eq!(db.config("default_from_mail"), "admin@example.com");
        assert_eq!(db.config("signup_disabled"), "0");
        assert_eq!(db.config("header_msg"), "");
    }

    #[test]
    fn second_migrate_is_refused_and_leaves_data() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.write_config("forum_name", "Kept").unwrap();

        let err = db.migrate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(db.config("forum_name"), "Kept");
    }

    #[test]
    fn version_mismatch_is_reported() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.with_conn(|conn| {
            conn.execute("UPDATE schema_version SET version = 99", [])?;
            Ok(())
        })
        .unwrap();
        assert!(db.is_migration_needed().unwrap());
    }
}
