use agora_types::models::User;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::models::{USER_COLUMNS, UserRow, user_row};
use crate::password::{generate_reset_token, hash_password, verify_password};
use crate::{Database, DbError, Result, now};

/// How long a reset token stays valid after issuance.
pub const RESET_TOKEN_TTL_SECS: i64 = 48 * 60 * 60;

impl Database {
    // -- Accounts --

    pub fn create_user(&self, username: &str, password: &str, email: &str) -> Result<i64> {
        self.insert_user(username, password, email, false)
    }

    pub fn create_super_user(&self, username: &str, password: &str) -> Result<i64> {
        let id = self.insert_user(username, password, "", true)?;
        info!("Super user {} created", username);
        Ok(id)
    }

    fn insert_user(
        &self,
        username: &str,
        password: &str,
        email: &str,
        is_superadmin: bool,
    ) -> Result<i64> {
        if username.is_empty() {
            return Err(DbError::Validation("username must not be empty".into()));
        }
        let password_hash = hash_password(password)?;
        let ts = now();

        self.with_tx(|tx| {
            if query_user_id(tx, username)?.is_some() {
                return Err(DbError::AlreadyExists(format!("username {}", username)));
            }
            tx.execute(
                "INSERT INTO users (username, passwdhash, email, is_superadmin, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                rusqlite::params![username, password_hash, email, is_superadmin, ts],
            )
            .map_err(|e| DbError::from(e).or_exists(|| format!("username {}", username)))?;
            Ok(tx.last_insert_rowid())
        })
    }

    /// Look up `username` and check `password` against the stored hash.
    pub fn verify_credentials(&self, username: &str, password: &str) -> Result<User> {
        let row = self
            .with_conn(|conn| query_user_by_username(conn, username))?
            .ok_or_else(|| DbError::NotFound(format!("user {}", username)))?;

        if !verify_password(password, &row.password_hash) {
            warn!("Rejected credentials for {}", username);
            return Err(DbError::InvalidCredential);
        }
        Ok(row.user)
    }

    pub fn read_user(&self, username: &str) -> Result<Option<User>> {
        let row = self.with_conn(|conn| query_user_by_username(conn, username))?;
        Ok(row.map(|r| r.user))
    }

    pub fn read_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                    [id],
                    user_row,
                )
                .optional()?;
            Ok(row.map(|r| r.user))
        })
    }

    pub fn read_user_id_by_name(&self, username: &str) -> Result<i64> {
        self.with_conn(|conn| query_user_id(conn, username))?
            .ok_or_else(|| DbError::NotFound(format!("user {}", username)))
    }

    pub fn probe_user(&self, username: &str) -> Result<bool> {
        Ok(self.with_conn(|conn| query_user_id(conn, username))?.is_some())
    }

    pub fn num_users(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM users")
    }

    // -- Profile (best effort) --

    /// "" when the user is unknown. Not an existence check.
    pub fn read_user_about(&self, username: &str) -> String {
        self.read_or_default("SELECT about FROM users WHERE username = ?1", [username])
    }

    /// 0 when the user is unknown. Not an existence check.
    pub fn read_user_karma(&self, username: &str) -> i64 {
        self.read_or_default("SELECT karma FROM users WHERE username = ?1", [username])
    }

    /// "" when the user is unknown. Not an existence check.
    pub fn read_user_email(&self, username: &str) -> String {
        self.read_or_default("SELECT email FROM users WHERE username = ?1", [username])
    }

    pub fn update_user_profile(&self, username: &str, email: &str, about: &str) -> Result<()> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE users SET email = ?1, about = ?2, updated_at = ?3 WHERE username = ?4",
                rusqlite::params![email, about, now(), username],
            )?)
        })?;
        require_user(changed, username)
    }

    pub fn ban_user(&self, username: &str) -> Result<()> {
        self.set_banned(username, true)
    }

    pub fn unban_user(&self, username: &str) -> Result<()> {
        self.set_banned(username, false)
    }

    fn set_banned(&self, username: &str, banned: bool) -> Result<()> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE users SET is_banned = ?1, updated_at = ?2 WHERE username = ?3",
                rusqlite::params![banned, now(), username],
            )?)
        })?;
        require_user(changed, username)?;
        info!("User {} banned={}", username, banned);
        Ok(())
    }

    // -- Passwords and reset tokens --

    /// Replace the password hash. Clears any outstanding reset token in
    /// the same statement.
    pub fn update_password(&self, username: &str, new_password: &str) -> Result<()> {
        let password_hash = hash_password(new_password)?;
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE users SET passwdhash = ?1, reset_token = '', reset_token_date = 0, updated_at = ?2
                 WHERE username = ?3",
                rusqlite::params![password_hash, now(), username],
            )?)
        })?;
        require_user(changed, username)
    }

    /// Issue a reset token for out-of-band delivery. Replaces any previous
    /// token for the user.
    pub fn create_reset_token(&self, username: &str) -> Result<String> {
        self.create_reset_token_at(username, now())
    }

    /// `create_reset_token` with an explicit issuance time (epoch seconds).
    pub fn create_reset_token_at(&self, username: &str, issued_at: i64) -> Result<String> {
        let token = generate_reset_token();
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE users SET reset_token = ?1, reset_token_date = ?2 WHERE username = ?3",
                rusqlite::params![token, issued_at, username],
            )?)
        })?;
        require_user(changed, username)?;
        debug!("Reset token issued for {}", username);
        Ok(token)
    }

    /// Username owning `token`, if it was issued less than 48 hours ago.
    pub fn resolve_reset_token(&self, token: &str) -> Result<String> {
        self.resolve_reset_token_at(token, now())
    }

    /// `resolve_reset_token` evaluated at `now` (epoch seconds).
    pub fn resolve_reset_token_at(&self, token: &str, now: i64) -> Result<String> {
        if token.is_empty() {
            return Err(DbError::InvalidOrExpiredToken);
        }
        let found: Option<(String, i64)> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT username, reset_token_date FROM users WHERE reset_token = ?1",
                    [token],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?)
        })?;

        match found {
            Some((username, issued_at)) if now - issued_at < RESET_TOKEN_TTL_SECS => Ok(username),
            _ => Err(DbError::InvalidOrExpiredToken),
        }
    }
}

fn require_user(changed: usize, username: &str) -> Result<()> {
    if changed == 0 {
        return Err(DbError::NotFound(format!("user {}", username)));
    }
    Ok(())
}

pub(crate) fn query_user_id(conn: &Connection, username: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row("SELECT id FROM users WHERE username = ?1", [username], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(id)
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            [username],
            user_row,
        )
        .optional()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::test_support::{test_db, user};

    #[test]
    fn duplicate_username_is_rejected() {
        let db = test_db();
        db.create_user("alice", "pw-one", "a@example.com").unwrap();
        let err = db.create_user("alice", "pw-two", "b@example.com").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(db.num_users().unwrap(), 1);
        assert_eq!(db.read_user_email("alice"), "a@example.com");
    }

    #[test]
    fn credentials() {
        let db = test_db();
        db.create_user("bob", "s3cret-pass", "").unwrap();

        let user = db.verify_credentials("bob", "s3cret-pass").unwrap();
        assert_eq!(user.username, "bob");
        assert!(!user.is_superadmin);

        let err = db.verify_credentials("bob", "wrong").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCredential);

        let err = db.verify_credentials("nobody", "s3cret-pass").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn password_is_not_stored_in_clear() {
        let db = test_db();
        db.create_user("carol", "plaintext-pw", "").unwrap();
        let stored: String = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT passwdhash FROM users WHERE username = 'carol'",
                    [],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert!(!stored.contains("plaintext-pw"));
        assert!(stored.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn super_user_flag() {
        let db = test_db();
        db.create_super_user("root", "rootpw").unwrap();
        let root = db.read_user("root").unwrap().unwrap();
        assert!(root.is_superadmin);
        assert_eq!(root.email, "");
    }

    #[test]
    fn profile_reads_default_on_miss() {
        let db = test_db();
        assert_eq!(db.read_user_about("ghost"), "");
        assert_eq!(db.read_user_karma("ghost"), 0);
        assert_eq!(db.read_user_email("ghost"), "");
        assert!(!db.probe_user("ghost").unwrap());
        assert_eq!(
            db.read_user_id_by_name("ghost").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn profile_update_bumps_updated_at() {
        let db = test_db();
        let id = user(&db, "dave");
        db.with_conn(|conn| {
            conn.execute("UPDATE users SET updated_at = 0 WHERE id = ?1", [id])?;
            Ok(())
        })
        .unwrap();

        db.update_user_profile("dave", "new@example.com", "hello").unwrap();
        let dave = db.read_user_by_id(id).unwrap().unwrap();
        assert_eq!(dave.email, "new@example.com");
        assert_eq!(dave.about, "hello");
        assert!(dave.updated_at.timestamp() > 0);

        let err = db.update_user_profile("ghost", "", "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn reset_token_window() {
        let db = test_db();
        user(&db, "erin");
        let t = 1_700_000_000;
        let token = db.create_reset_token_at("erin", t).unwrap();

        let just_inside = t + 47 * 3600 + 59 * 60;
        assert_eq!(db.resolve_reset_token_at(&token, just_inside).unwrap(), "erin");

        let just_outside = t + 48 * 3600 + 60;
        let err = db.resolve_reset_token_at(&token, just_outside).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOrExpiredToken);
    }

    #[test]
    fn reset_token_rejects_empty_and_unknown() {
        let db = test_db();
        user(&db, "frank");
        // a user without a token has reset_token = ''
        assert_eq!(
            db.resolve_reset_token("").unwrap_err().kind(),
            ErrorKind::InvalidOrExpiredToken
        );
        assert_eq!(
            db.resolve_reset_token("nope").unwrap_err().kind(),
            ErrorKind::InvalidOrExpiredToken
        );
        assert_eq!(
            db.create_reset_token("ghost").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn password_update_clears_reset_token() {
        let db = test_db();
        user(&db, "grace");
        let token = db.create_reset_token("grace").unwrap();
        assert_eq!(db.resolve_reset_token(&token).unwrap(), "grace");

        db.update_password("grace", "brand-new-pw").unwrap();
        assert_eq!(
            db.resolve_reset_token(&token).unwrap_err().kind(),
            ErrorKind::InvalidOrExpiredToken
        );
        db.verify_credentials("grace", "brand-new-pw").unwrap();
        assert_eq!(
            db.verify_credentials("grace", "password123").unwrap_err().kind(),
            ErrorKind::InvalidCredential
        );
    }

    #[test]
    fn ban_and_unban() {
        let db = test_db();
        user(&db, "heidi");
        db.ban_user("heidi").unwrap();
        assert!(db.read_user("heidi").unwrap().unwrap().is_banned);
        db.unban_user("heidi").unwrap();
        assert!(!db.read_user("heidi").unwrap().unwrap().is_banned);
        assert_eq!(db.ban_user("ghost").unwrap_err().kind(), ErrorKind::NotFound);
    }
}
