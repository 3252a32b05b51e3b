use agora_types::config::ForumConfig;
use agora_types::session::{CommonData, Session};
use rusqlite::OptionalExtension;
use tracing::warn;

use crate::Database;

impl Database {
    /// Page-independent view data for the session's caller. Best effort:
    /// lookup failures leave the affected fields empty.
    pub fn read_common_data<S>(&self, config: &ForumConfig, session: &mut S) -> CommonData
    where
        S: Session + ?Sized,
    {
        let (username, karma) = match session.user_id() {
            Some(id) => self.username_and_karma(id),
            None => (String::new(), 0),
        };

        let extra_notes_short = self.read_extra_notes_short().unwrap_or_else(|e| {
            warn!("Could not load notes for common data: {}", e);
            Vec::new()
        });

        CommonData {
            csrf: session.csrf_token().to_string(),
            msg: session.take_flash().unwrap_or_default(),
            username,
            karma,
            forum_name: config.forum_name.clone(),
            extra_notes_short,
        }
    }

    fn username_and_karma(&self, user_id: i64) -> (String, i64) {
        let found: crate::Result<Option<(String, i64)>> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT username, karma FROM users WHERE id = ?1",
                    [user_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?)
        });
        match found {
            Ok(pair) => pair.unwrap_or_default(),
            Err(e) => {
                warn!("Could not load user {} for common data: {}", user_id, e);
                (String::new(), 0)
            }
        }
    }
}
