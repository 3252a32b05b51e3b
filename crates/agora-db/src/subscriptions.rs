use rusqlite::OptionalExtension;

use crate::{Database, Result, now};

#[derive(Debug, Clone, Copy)]
enum Scope {
    Topic,
    Group,
}

impl Scope {
    fn table(self) -> &'static str {
        match self {
            Self::Topic => "topicsubscriptions",
            Self::Group => "groupsubscriptions",
        }
    }

    fn id_column(self) -> &'static str {
        match self {
            Self::Topic => "topic_id",
            Self::Group => "group_id",
        }
    }
}

impl Database {
    pub fn subscribe_topic(&self, user_id: i64, topic_id: i64) -> Result<()> {
        self.subscribe(Scope::Topic, user_id, topic_id)
    }

    pub fn unsubscribe_topic(&self, user_id: i64, topic_id: i64) -> Result<()> {
        self.unsubscribe(Scope::Topic, user_id, topic_id)
    }

    pub fn is_subscribed_topic(&self, user_id: i64, topic_id: i64) -> Result<bool> {
        self.is_subscribed(Scope::Topic, user_id, topic_id)
    }

    /// Addresses to notify about activity in a topic.
    pub fn read_topic_subscriber_emails(&self, topic_id: i64) -> Result<Vec<String>> {
        self.subscriber_emails(Scope::Topic, topic_id)
    }

    pub fn subscribe_group(&self, user_id: i64, group_id: i64) -> Result<()> {
        self.subscribe(Scope::Group, user_id, group_id)
    }

    pub fn unsubscribe_group(&self, user_id: i64, group_id: i64) -> Result<()> {
        self.unsubscribe(Scope::Group, user_id, group_id)
    }

    pub fn is_subscribed_group(&self, user_id: i64, group_id: i64) -> Result<bool> {
        self.is_subscribed(Scope::Group, user_id, group_id)
    }

    /// Addresses to notify about new topics in a group.
    pub fn read_group_subscriber_emails(&self, group_id: i64) -> Result<Vec<String>> {
        self.subscriber_emails(Scope::Group, group_id)
    }

    fn subscribe(&self, scope: Scope, user_id: i64, target_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT OR IGNORE INTO {} (user_id, {}, created_at) VALUES (?1, ?2, ?3)",
                    scope.table(),
                    scope.id_column()
                ),
                (user_id, target_id, now()),
            )?;
            Ok(())
        })
    }

    fn unsubscribe(&self, scope: Scope, user_id: i64, target_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "DELETE FROM {} WHERE user_id = ?1 AND {} = ?2",
                    scope.table(),
                    scope.id_column()
                ),
                (user_id, target_id),
            )?;
            Ok(())
        })
    }

    fn is_subscribed(&self, scope: Scope, user_id: i64, target_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    &format!(
                        "SELECT 1 FROM {} WHERE user_id = ?1 AND {} = ?2",
                        scope.table(),
                        scope.id_column()
                    ),
                    (user_id, target_id),
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    // Banned users and users without an address are skipped.
    fn subscriber_emails(&self, scope: Scope, target_id: i64) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT u.email FROM users u
                 INNER JOIN {} s ON u.id = s.user_id
                 WHERE s.{} = ?1 AND u.email != '' AND u.is_banned = 0
                 ORDER BY s.id",
                scope.table(),
                scope.id_column()
            ))?;
            let emails = stmt
                .query_map([target_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(emails)
        })
    }
}
