use std::collections::HashMap;

use agora_types::config::{ConfigKey, ForumConfig, MISSING_VALUE};
use rusqlite::{Connection, OptionalExtension};
use tracing::{info, warn};

use crate::{Database, Result};

impl Database {
    /// Raw setting value, or "0" when the key is absent or unreadable.
    pub fn config(&self, key: &str) -> String {
        let result = self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT val FROM configs WHERE key = ?1", [key], |row| {
                    row.get::<_, String>(0)
                })
                .optional()?)
        });
        match result {
            Ok(Some(value)) => value,
            Ok(None) => MISSING_VALUE.to_string(),
            Err(e) => {
                warn!("Config read for {} failed: {}", key, e);
                MISSING_VALUE.to_string()
            }
        }
    }

    pub fn config_value(&self, key: ConfigKey) -> String {
        self.config(key.as_str())
    }

    /// Upsert a setting. The value is stored as given.
    pub fn write_config(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| upsert_config(conn, key, value))
    }

    /// Typed snapshot of every known setting. Meant to be loaded once at
    /// startup and passed around by reference.
    pub fn load_config(&self) -> Result<ForumConfig> {
        let stored: HashMap<String, String> = self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, val FROM configs")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<HashMap<_, _>, _>>()?;
            Ok(rows)
        })?;

        Ok(ForumConfig::from_lookup(|key| {
            stored
                .get(key.as_str())
                .cloned()
                .unwrap_or_else(|| MISSING_VALUE.to_string())
        }))
    }

    /// Persist every setting of `config` in one transaction.
    pub fn write_forum_config(&self, config: &ForumConfig) -> Result<()> {
        self.with_tx(|tx| {
            for (key, value) in config.to_pairs() {
                upsert_config(tx, key.as_str(), &value)?;
            }
            Ok(())
        })?;
        info!("Forum settings updated");
        Ok(())
    }
}

pub(crate) fn upsert_config(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO configs (key, val) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET val = excluded.val",
        [key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_db;

    use super::*;

    #[test]
    fn missing_key_reads_as_zero() {
        let db = test_db();
        assert_eq!(db.config("nonexistent_key"), "0");
    }

    #[test]
    fn write_then_read() {
        let db = test_db();
        db.write_config("k", "v").unwrap();
        assert_eq!(db.config("k"), "v");

        db.write_config("k", "w").unwrap();
        assert_eq!(db.config("k"), "w");
    }

    #[test]
    fn unmigrated_store_degrades_to_zero() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.config("forum_name"), "0");
    }

    #[test]
    fn forum_config_snapshot() {
        let db = test_db();
        assert_eq!(db.load_config().unwrap(), ForumConfig::default());

        db.write_config(ConfigKey::SignupDisabled.as_str(), "1").unwrap();
        db.write_config(ConfigKey::SmtpPort.as_str(), "2525").unwrap();
        let loaded = db.load_config().unwrap();
        assert!(loaded.signup_disabled);
        assert_eq!(loaded.smtp_port, 2525);

        let updated = ForumConfig {
            forum_name: "Renamed".into(),
            allow_group_subscription: true,
            ..loaded
        };
        db.write_forum_config(&updated).unwrap();
        assert_eq!(db.config_value(ConfigKey::ForumName), "Renamed");
        assert_eq!(db.config_value(ConfigKey::AllowGroupSubscription), "1");
        assert_eq!(db.load_config().unwrap(), updated);
    }
}
