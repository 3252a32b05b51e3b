use rusqlite::ffi;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

/// Every failure the forum core reports. Raw store errors never cross the
/// crate boundary; they are classified on conversion.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("incorrect username/password")]
    InvalidCredential,

    #[error("invalid or expired reset token")]
    InvalidOrExpiredToken,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal store error: {0}")]
    Internal(String),
}

/// Fieldless mirror of `DbError` for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidCredential,
    InvalidOrExpiredToken,
    Validation,
    Internal,
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::InvalidCredential => ErrorKind::InvalidCredential,
            Self::InvalidOrExpiredToken => ErrorKind::InvalidOrExpiredToken,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Replace the detail of an `AlreadyExists` with something the caller
    /// can show. Other kinds pass through.
    pub(crate) fn or_exists(self, what: impl FnOnce() -> String) -> Self {
        match self {
            Self::AlreadyExists(_) => Self::AlreadyExists(what()),
            other => other,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, detail) = &e {
            let detail = detail.clone().unwrap_or_else(|| err.to_string());
            match err.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return Self::AlreadyExists(detail);
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return Self::NotFound(format!("referenced record ({detail})"));
                }
                _ => {}
            }
        }
        Self::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn unique_violation_is_already_exists() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err: DbError = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn other_store_errors_are_internal() {
        let conn = Connection::open_in_memory().unwrap();
        let err: DbError = conn
            .execute("INSERT INTO missing_table VALUES (1)", [])
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn or_exists_only_rewrites_conflicts() {
        let err = DbError::AlreadyExists("raw".into()).or_exists(|| "username bob".into());
        assert_eq!(err.to_string(), "already exists: username bob");

        let err = DbError::Validation("bad".into()).or_exists(|| "unused".into());
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
