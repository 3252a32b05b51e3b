use agora_types::models::Group;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::models::{GROUP_COLUMNS, group_row};
use crate::{Database, DbError, Result, now};

impl Database {
    pub fn create_group(&self, name: &str, description: &str, header_msg: &str) -> Result<i64> {
        if name.is_empty() {
            return Err(DbError::Validation("group name must not be empty".into()));
        }
        let ts = now();
        let id = self.with_conn(|conn| {
            conn.execute(
                r#"INSERT INTO "groups" (name, description, header_msg, created_at, updated_at)
                   VALUES (?1, ?2, ?3, ?4, ?4)"#,
                rusqlite::params![name, description, header_msg, ts],
            )
            .map_err(|e| DbError::from(e).or_exists(|| format!("group {}", name)))?;
            Ok(conn.last_insert_rowid())
        })?;
        info!("Group {} created with id {}", name, id);
        Ok(id)
    }

    pub fn read_group(&self, id: i64) -> Result<Group> {
        self.with_conn(|conn| query_group(conn, id))?
            .ok_or_else(|| DbError::NotFound(format!("group {}", id)))
    }

    pub fn read_group_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(r#"SELECT id FROM "groups" WHERE name = ?1"#, [name], |row| {
                    row.get(0)
                })
                .optional()?)
        })
    }

    /// All groups, sticky ones first, then by name. Closed groups are only
    /// included when asked for.
    pub fn read_groups(&self, include_closed: bool) -> Result<Vec<Group>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                r#"SELECT {GROUP_COLUMNS} FROM "groups"
                   WHERE ?1 OR is_closed = 0
                   ORDER BY is_sticky DESC, name"#
            ))?;
            let groups = stmt
                .query_map([include_closed], group_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(groups)
        })
    }

    pub fn read_group_name(&self, id: i64) -> String {
        self.read_or_default(r#"SELECT name FROM "groups" WHERE id = ?1"#, [id])
    }

    pub fn read_group_desc(&self, id: i64) -> String {
        self.read_or_default(r#"SELECT description FROM "groups" WHERE id = ?1"#, [id])
    }

    pub fn read_group_header_msg(&self, id: i64) -> String {
        self.read_or_default(r#"SELECT header_msg FROM "groups" WHERE id = ?1"#, [id])
    }

    /// False for unknown groups.
    pub fn read_group_is_deleted(&self, id: i64) -> bool {
        self.read_or_default(r#"SELECT is_closed FROM "groups" WHERE id = ?1"#, [id])
    }

    pub fn update_group(
        &self,
        id: i64,
        name: &str,
        description: &str,
        header_msg: &str,
    ) -> Result<()> {
        let changed = self.with_conn(|conn| {
            conn.execute(
                r#"UPDATE "groups" SET name = ?1, description = ?2, header_msg = ?3, updated_at = ?4
                   WHERE id = ?5"#,
                rusqlite::params![name, description, header_msg, now(), id],
            )
            .map_err(|e| DbError::from(e).or_exists(|| format!("group {}", name)))
        })?;
        require_group(changed, id)
    }

    /// Soft delete: the group is hidden but its topics stay in place.
    pub fn delete_group(&self, id: i64) -> Result<()> {
        self.set_group_flag(id, "is_closed", true)?;
        info!("Group {} closed", id);
        Ok(())
    }

    pub fn undelete_group(&self, id: i64) -> Result<()> {
        self.set_group_flag(id, "is_closed", false)?;
        info!("Group {} reopened", id);
        Ok(())
    }

    pub fn set_group_sticky(&self, id: i64, sticky: bool) -> Result<()> {
        self.set_group_flag(id, "is_sticky", sticky)
    }

    pub fn set_group_private(&self, id: i64, private: bool) -> Result<()> {
        self.set_group_flag(id, "is_private", private)
    }

    pub fn num_groups(&self) -> Result<i64> {
        self.count(r#"SELECT COUNT(*) FROM "groups""#)
    }

    fn set_group_flag(&self, id: i64, column: &'static str, value: bool) -> Result<()> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                &format!(r#"UPDATE "groups" SET {column} = ?1, updated_at = ?2 WHERE id = ?3"#),
                rusqlite::params![value, now(), id],
            )?)
        })?;
        require_group(changed, id)
    }
}

pub(crate) fn query_group(conn: &Connection, id: i64) -> Result<Option<Group>> {
    let group = conn
        .query_row(
            &format!(r#"SELECT {GROUP_COLUMNS} FROM "groups" WHERE id = ?1"#),
            [id],
            group_row,
        )
        .optional()?;
    Ok(group)
}

fn require_group(changed: usize, id: i64) -> Result<()> {
    if changed == 0 {
        return Err(DbError::NotFound(format!("group {}", id)));
    }
    Ok(())
}
