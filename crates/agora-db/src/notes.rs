use agora_types::models::{ExtraNote, ExtraNoteShort};
use rusqlite::OptionalExtension;

use crate::models::{NOTE_COLUMNS, note_row};
use crate::{Database, DbError, Result, now};

impl Database {
    pub fn create_extra_note(&self, name: &str, url: &str, content: &str) -> Result<i64> {
        let ts = now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO extranotes (name, url, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                rusqlite::params![name, url, content, ts],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn read_extra_notes(&self) -> Result<Vec<ExtraNote>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {NOTE_COLUMNS} FROM extranotes ORDER BY id"))?;
            let notes = stmt
                .query_map([], note_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(notes)
        })
    }

    pub fn read_extra_note(&self, id: i64) -> Result<ExtraNote> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {NOTE_COLUMNS} FROM extranotes WHERE id = ?1"),
                    [id],
                    note_row,
                )
                .optional()?)
        })?
        .ok_or_else(|| DbError::NotFound(format!("note {}", id)))
    }

    pub fn read_extra_notes_short(&self) -> Result<Vec<ExtraNoteShort>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM extranotes ORDER BY id")?;
            let notes = stmt
                .query_map([], |row| {
                    Ok(ExtraNoteShort {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(notes)
        })
    }

    pub fn update_extra_note(&self, id: i64, name: &str, url: &str, content: &str) -> Result<()> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE extranotes SET name = ?1, url = ?2, content = ?3, updated_at = ?4 WHERE id = ?5",
                rusqlite::params![name, url, content, now(), id],
            )?)
        })?;
        if changed == 0 {
            return Err(DbError::NotFound(format!("note {}", id)));
        }
        Ok(())
    }

    /// Notes are not part of the forum hierarchy and are removed outright.
    pub fn delete_extra_note(&self, id: i64) -> Result<()> {
        let removed = self
            .with_conn(|conn| Ok(conn.execute("DELETE FROM extranotes WHERE id = ?1", [id])?))?;
        if removed == 0 {
            return Err(DbError::NotFound(format!("note {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::ErrorKind;
    use crate::test_support::test_db;

    #[test]
    fn note_crud() {
        let db = test_db();
        let about = db.create_extra_note("About", "/about", "We talk.").unwrap();
        let faq = db.create_extra_note("FAQ", "", "Ask away.").unwrap();

        let note = db.read_extra_note(about).unwrap();
        assert_eq!((note.name.as_str(), note.url.as_str()), ("About", "/about"));
        assert_eq!(db.read_extra_notes().unwrap().len(), 2);

        let short: Vec<String> = db
            .read_extra_notes_short()
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(short, ["About", "FAQ"]);

        db.update_extra_note(faq, "FAQ", "/faq", "Read first.").unwrap();
        assert_eq!(db.read_extra_note(faq).unwrap().content, "Read first.");

        db.delete_extra_note(about).unwrap();
        assert_eq!(db.read_extra_note(about).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            db.update_extra_note(about, "x", "", "").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn deleting_twice_reports_missing_note() {
        let db = test_db();
        let id = db.create_extra_note("Rules", "/rules", "Be kind.").unwrap();
        db.delete_extra_note(id).unwrap();
        assert_eq!(db.delete_extra_note(id).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(db.delete_extra_note(77).unwrap_err().kind(), ErrorKind::NotFound);
    }
}
