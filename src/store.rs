//! Persisted draw records.
//!
//! [`FileRecordStore`] keeps one pretty-printed JSON file per draw, named
//! after the draw date. Writes land in a temporary file first and are renamed
//! into place, so a listing never sees half a record.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::StoreError;
use crate::record;
use crate::types::DrawRecord;
use crate::utils::{parse_calendar_date, record_filename};

pub trait RecordStore {
    /// Dates of every record saved so far.
    fn list_persisted_dates(&self) -> Result<BTreeSet<NaiveDate>, StoreError>;

    /// Validates, sorts and stores `record`, replacing any record of the same
    /// date. Returns the stored record and the name it was stored under.
    fn save(&self, record: &DrawRecord) -> Result<(DrawRecord, String), StoreError>;

    fn get(&self, date: NaiveDate) -> Result<Option<DrawRecord>, StoreError>;

    /// All records, oldest first.
    fn find_all(&self) -> Result<Vec<DrawRecord>, StoreError>;
}

pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    /// Opens the store, creating the directory when needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(record_filename(date))
    }

    fn read(&self, path: &Path) -> Result<DrawRecord, StoreError> {
        let json = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        record::from_json(&json).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Record file names in the directory, skipping temp files and strays.
    pub(crate) fn record_files(&self) -> Result<Vec<(NaiveDate, PathBuf)>, StoreError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.starts_with('.') {
                continue;
            }
            match parse_calendar_date(stem) {
                Some(date) => files.push((date, path)),
                None => warn!(path = %path.display(), "ignoring file without a date name"),
            }
        }
        files.sort();
        Ok(files)
    }
}

impl RecordStore for FileRecordStore {
    fn list_persisted_dates(&self) -> Result<BTreeSet<NaiveDate>, StoreError> {
        Ok(self
            .record_files()?
            .into_iter()
            .map(|(date, _)| date)
            .collect())
    }

    fn save(&self, draw: &DrawRecord) -> Result<(DrawRecord, String), StoreError> {
        let prepared = record::prepare_for_save(draw).map_err(|source| StoreError::Invalid {
            date: draw.date,
            source,
        })?;

        let filename = prepared.filename();
        let path = self.dir.join(&filename);
        let json = record::to_json(&prepared).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        write_atomic(&path, json.as_bytes())?;

        Ok((prepared, filename))
    }

    fn get(&self, date: NaiveDate) -> Result<Option<DrawRecord>, StoreError> {
        match self.read(&self.path_for(date)) {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn find_all(&self) -> Result<Vec<DrawRecord>, StoreError> {
        self.record_files()?
            .iter()
            .map(|(_, path)| self.read(path))
            .collect()
    }
}

/// Writes `contents` to a temp file beside `path`, then renames it over `path`.
/// The temp file is removed if any step fails.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut file = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    file.write_all(contents)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| StoreError::io(file.path(), e))?;

    file.persist(path)
        .map(|_| ())
        .map_err(|e| StoreError::io(path, e.error))
}
