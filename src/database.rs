use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use crate::error::StoreError;
use crate::record;
use crate::store::RecordStore;
use crate::types::DrawRecord;
use crate::utils::{format_date, parse_calendar_date};

/// SQLite-backed alternative to the per-file store.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

pub fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS draws (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            draw_date TEXT NOT NULL UNIQUE,
            draw_id TEXT NOT NULL,
            special INTEGER NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS draw_numbers (
            draw_date TEXT NOT NULL,
            position INTEGER NOT NULL,
            value INTEGER NOT NULL,
            PRIMARY KEY (draw_date, position),
            FOREIGN KEY (draw_date) REFERENCES draws (draw_date)
        )",
        [],
    )?;

    Ok(())
}

impl SqliteRecordStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        // a poisoned lock still holds a usable connection
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut conn)
    }
}

fn numbers_for(conn: &Connection, draw_date: &str) -> rusqlite::Result<Vec<u8>> {
    let mut stmt = conn.prepare(
        "SELECT value FROM draw_numbers WHERE draw_date = ?1 ORDER BY position",
    )?;
    let number_iter = stmt.query_map([draw_date], |row| row.get::<_, u8>(0))?;

    let mut numbers = Vec::new();
    for number in number_iter {
        numbers.push(number?);
    }
    Ok(numbers)
}

fn row_to_record(
    conn: &Connection,
    draw_date: String,
    draw_id: String,
    special: u8,
) -> Result<DrawRecord, StoreError> {
    let date = parse_calendar_date(&draw_date).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(0, draw_date.clone(), rusqlite::types::Type::Text)
    })?;
    Ok(DrawRecord {
        date,
        draw_id,
        numbers: numbers_for(conn, &draw_date)?,
        special,
    })
}

impl RecordStore for SqliteRecordStore {
    fn list_persisted_dates(&self) -> Result<BTreeSet<NaiveDate>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT draw_date FROM draws")?;
            let date_iter = stmt.query_map([], |row| row.get::<_, String>(0))?;

            let mut dates = BTreeSet::new();
            for draw_date in date_iter {
                if let Some(date) = parse_calendar_date(&draw_date?) {
                    dates.insert(date);
                }
            }
            Ok(dates)
        })
    }

    fn save(&self, draw: &DrawRecord) -> Result<(DrawRecord, String), StoreError> {
        let prepared = record::prepare_for_save(draw).map_err(|source| StoreError::Invalid {
            date: draw.date,
            source,
        })?;
        let draw_date = format_date(prepared.date);

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO draws (draw_date, draw_id, special) VALUES (?1, ?2, ?3)
                 ON CONFLICT(draw_date) DO UPDATE SET draw_id = excluded.draw_id, special = excluded.special",
                (&draw_date, &prepared.draw_id, prepared.special),
            )?;
            tx.execute("DELETE FROM draw_numbers WHERE draw_date = ?1", [&draw_date])?;
            for (position, value) in prepared.numbers.iter().enumerate() {
                tx.execute(
                    "INSERT INTO draw_numbers (draw_date, position, value) VALUES (?1, ?2, ?3)",
                    (&draw_date, position as i64, *value),
                )?;
            }
            tx.commit()?;
            Ok(())
        })?;

        Ok((prepared, draw_date))
    }

    fn get(&self, date: NaiveDate) -> Result<Option<DrawRecord>, StoreError> {
        let draw_date = format_date(date);
        self.with_conn(|conn| {
            let conn: &Connection = conn;
            let row = conn
                .query_row(
                    "SELECT draw_date, draw_id, special FROM draws WHERE draw_date = ?1",
                    [&draw_date],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, u8>(2)?)),
                )
                .optional()?;

            match row {
                Some((draw_date, draw_id, special)) => {
                    row_to_record(conn, draw_date, draw_id, special).map(Some)
                }
                None => Ok(None),
            }
        })
    }

    fn find_all(&self) -> Result<Vec<DrawRecord>, StoreError> {
        self.with_conn(|conn| {
            let conn: &Connection = conn;
            let mut stmt =
                conn.prepare("SELECT draw_date, draw_id, special FROM draws ORDER BY draw_date")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, u8>(2)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(draw_date, draw_id, special)| row_to_record(conn, draw_date, draw_id, special))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn draw(date: NaiveDate, draw_id: &str, numbers: Vec<u8>, special: u8) -> DrawRecord {
        DrawRecord {
            date,
            draw_id: draw_id.to_string(),
            numbers,
            special,
        }
    }

    #[test]
    fn save_and_get_round_trip_sorted() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let (saved, key) = store
            .save(&draw(d(1993, 1, 5), "93/001", vec![23, 4, 49, 1, 17, 30], 8))
            .unwrap();
        assert_eq!(key, "1993-01-05");
        assert_eq!(saved.numbers, vec![1, 4, 17, 23, 30, 49]);

        let loaded = store.get(d(1993, 1, 5)).unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(store.get(d(1993, 1, 6)).unwrap(), None);
    }

    #[test]
    fn save_replaces_existing_date() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store
            .save(&draw(d(1993, 1, 5), "93/001", vec![1, 2, 3, 4, 5, 6], 7))
            .unwrap();
        store
            .save(&draw(d(1993, 1, 5), "93/001", vec![11, 12, 13, 14, 15, 16], 17))
            .unwrap();

        let all = store.find_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].numbers, vec![11, 12, 13, 14, 15, 16]);
        assert_eq!(all[0].special, 17);
    }

    #[test]
    fn invalid_record_leaves_no_row() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let err = store
            .save(&draw(d(1993, 1, 5), "", vec![1, 2, 3, 4, 5, 6], 7))
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid { .. }));
        assert!(store.list_persisted_dates().unwrap().is_empty());
    }

    #[test]
    fn lists_dates_in_order() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store
            .save(&draw(d(1993, 1, 9), "93/002", vec![1, 2, 3, 4, 5, 6], 7))
            .unwrap();
        store
            .save(&draw(d(1993, 1, 5), "93/001", vec![1, 2, 3, 4, 5, 6], 7))
            .unwrap();

        let dates: Vec<_> = store.list_persisted_dates().unwrap().into_iter().collect();
        assert_eq!(dates, vec![d(1993, 1, 5), d(1993, 1, 9)]);
        let all = store.find_all().unwrap();
        assert_eq!(all[0].draw_id, "93/001");
        assert_eq!(all[1].draw_id, "93/002");
    }
}
