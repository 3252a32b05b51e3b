use agora_types::models::Role;
use rusqlite::OptionalExtension;
use tracing::{debug, info};

use crate::{Database, DbError, Result, now};

/// The two per-group grant tables.
#[derive(Debug, Clone, Copy)]
enum Grant {
    Mod,
    Admin,
}

impl Grant {
    fn table(self) -> &'static str {
        match self {
            Self::Mod => "mods",
            Self::Admin => "admins",
        }
    }
}

impl Database {
    /// Grant moderator rights in `group_id`. Unknown usernames are ignored.
    pub fn create_mod(&self, username: &str, group_id: i64) -> Result<()> {
        self.grant(Grant::Mod, username, group_id)
    }

    /// Grant admin rights in `group_id`. Unknown usernames are ignored.
    pub fn create_admin(&self, username: &str, group_id: i64) -> Result<()> {
        self.grant(Grant::Admin, username, group_id)
    }

    pub fn is_group_mod(&self, user_id: i64, group_id: i64) -> Result<bool> {
        self.has_grant(Grant::Mod, user_id, group_id)
    }

    pub fn is_group_admin(&self, user_id: i64, group_id: i64) -> Result<bool> {
        self.has_grant(Grant::Admin, user_id, group_id)
    }

    /// Usernames of the group's moderators, in store order.
    pub fn read_mods(&self, group_id: i64) -> Result<Vec<String>> {
        self.grantees(Grant::Mod, group_id)
    }

    /// Usernames of the group's admins, in store order.
    pub fn read_admins(&self, group_id: i64) -> Result<Vec<String>> {
        self.grantees(Grant::Admin, group_id)
    }

    /// Remove every moderator grant of the group. Returns rows removed.
    pub fn clear_mods(&self, group_id: i64) -> Result<usize> {
        self.clear(Grant::Mod, group_id)
    }

    /// Remove every admin grant of the group. Returns rows removed.
    pub fn clear_admins(&self, group_id: i64) -> Result<usize> {
        self.clear(Grant::Admin, group_id)
    }

    /// Strongest role `user_id` holds over an item in `group_id` written by
    /// `author_id`. Logged-out, unknown and banned users resolve to
    /// `Role::Anonymous`, as does a signed-in user with no grant who is not
    /// the author.
    pub fn resolve_role(
        &self,
        user_id: Option<i64>,
        group_id: i64,
        author_id: Option<i64>,
    ) -> Result<Role> {
        let Some(uid) = user_id else {
            return Ok(Role::Anonymous);
        };
        let Some(user) = self.read_user_by_id(uid)? else {
            return Ok(Role::Anonymous);
        };
        if user.is_banned {
            return Ok(Role::Anonymous);
        }

        let role = if user.is_superadmin {
            Role::SuperAdmin
        } else if self.is_group_admin(uid, group_id)? {
            Role::GroupAdmin
        } else if self.is_group_mod(uid, group_id)? {
            Role::GroupMod
        } else if author_id == Some(uid) {
            Role::Author
        } else {
            Role::Anonymous
        };
        Ok(role)
    }

    fn grant(&self, grant: Grant, username: &str, group_id: i64) -> Result<()> {
        let user_id = match self.read_user_id_by_name(username) {
            Ok(id) => id,
            Err(DbError::NotFound(_)) => {
                debug!("Skipping {} grant for unknown user {}", grant.table(), username);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT OR IGNORE INTO {} (user_id, group_id, created_at) VALUES (?1, ?2, ?3)",
                    grant.table()
                ),
                (user_id, group_id, now()),
            )?;
            Ok(())
        })?;
        info!("Granted {} in group {} to {}", grant.table(), group_id, username);
        Ok(())
    }

    fn has_grant(&self, grant: Grant, user_id: i64, group_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    &format!(
                        "SELECT 1 FROM {} WHERE user_id = ?1 AND group_id = ?2",
                        grant.table()
                    ),
                    (user_id, group_id),
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    fn grantees(&self, grant: Grant, group_id: i64) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT u.username FROM users u
                 INNER JOIN {} g ON u.id = g.user_id
                 WHERE g.group_id = ?1",
                grant.table()
            ))?;
            let names = stmt
                .query_map([group_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(names)
        })
    }

    fn clear(&self, grant: Grant, group_id: i64) -> Result<usize> {
        let removed = self.with_conn(|conn| {
            Ok(conn.execute(
                &format!("DELETE FROM {} WHERE group_id = ?1", grant.table()),
                [group_id],
            )?)
        })?;
        debug!("Cleared {} {} rows from group {}", removed, grant.table(), group_id);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_db, user};

    #[test]
    fn grants_and_membership() {
        let db = test_db();
        let g = db.create_group("rust", "", "").unwrap();
        let ann = user(&db, "ann");
        let ben = user(&db, "ben");

        db.create_admin("ann", g).unwrap();
        db.create_mod("ben", g).unwrap();

        assert!(db.is_group_admin(ann, g).unwrap());
        assert!(!db.is_group_admin(ben, g).unwrap());
        assert!(db.is_group_mod(ben, g).unwrap());
        assert_eq!(db.read_admins(g).unwrap(), vec!["ann".to_string()]);
        assert_eq!(db.read_mods(g).unwrap(), vec!["ben".to_string()]);
    }

    #[test]
    fn unknown_user_grant_is_a_no_op() {
        let db = test_db();
        let g = db.create_group("go", "", "").unwrap();
        db.create_mod("ghost", g).unwrap();
        db.create_admin("ghost", g).unwrap();
        assert!(db.read_mods(g).unwrap().is_empty());
        assert!(db.read_admins(g).unwrap().is_empty());
    }

    #[test]
    fn duplicate_grant_is_ignored() {
        let db = test_db();
        let g = db.create_group("zig", "", "").unwrap();
        user(&db, "cat");
        db.create_mod("cat", g).unwrap();
        db.create_mod("cat", g).unwrap();
        assert_eq!(db.read_mods(g).unwrap().len(), 1);
    }

    #[test]
    fn clearing_each_role_touches_only_its_table() {
        let db = test_db();
        let g = db.create_group("c", "", "").unwrap();
        let other = db.create_group("cpp", "", "").unwrap();
        for name in ["m1", "m2", "m3"] {
            user(&db, name);
            db.create_mod(name, g).unwrap();
        }
        user(&db, "boss");
        db.create_admin("boss", g).unwrap();
        db.create_mod("m1", other).unwrap();

        assert_eq!(db.clear_mods(g).unwrap(), 3);
        assert!(db.read_mods(g).unwrap().is_empty());
        assert_eq!(db.read_admins(g).unwrap(), vec!["boss".to_string()]);
        assert_eq!(db.read_mods(other).unwrap(), vec!["m1".to_string()]);

        assert_eq!(db.clear_admins(g).unwrap(), 1);
        assert!(db.read_admins(g).unwrap().is_empty());

        // nothing left to clear
        assert_eq!(db.clear_mods(g).unwrap(), 0);
        assert_eq!(db.clear_admins(g).unwrap(), 0);
    }

    #[test]
    fn role_resolution() {
        let db = test_db();
        let g = db.create_group("haskell", "", "").unwrap();
        let root = db.create_super_user("root", "rootpw").unwrap();
        let adm = user(&db, "adm");
        let moder = user(&db, "moder");
        let author = user(&db, "author");
        let stranger = user(&db, "stranger");
        db.create_admin("adm", g).unwrap();
        db.create_mod("moder", g).unwrap();

        let item = Some(author);
        assert_eq!(db.resolve_role(Some(root), g, item).unwrap(), Role::SuperAdmin);
        assert_eq!(db.resolve_role(Some(adm), g, item).unwrap(), Role::GroupAdmin);
        assert_eq!(db.resolve_role(Some(moder), g, item).unwrap(), Role::GroupMod);
        assert_eq!(db.resolve_role(Some(author), g, item).unwrap(), Role::Author);
        assert_eq!(db.resolve_role(Some(stranger), g, item).unwrap(), Role::Anonymous);
        assert_eq!(db.resolve_role(None, g, item).unwrap(), Role::Anonymous);
        assert_eq!(db.resolve_role(Some(9999), g, item).unwrap(), Role::Anonymous);

        db.ban_user("moder").unwrap();
        assert_eq!(db.resolve_role(Some(moder), g, item).unwrap(), Role::Anonymous);
    }
}
