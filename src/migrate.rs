//! Rewrites record files still in the `{date, number, result}` layout.

use std::fs;
use tracing::info;

use crate::error::StoreError;
use crate::record;
use crate::store::{FileRecordStore, RecordStore};
use crate::types::LegacyDrawRecord;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated: usize,
    pub canonical: usize,
}

pub fn migrate_legacy_records(store: &FileRecordStore) -> Result<MigrationReport, StoreError> {
    let mut report = MigrationReport::default();

    for (_, path) in store.record_files()? {
        let json = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        if record::from_json(&json).is_ok() {
            report.canonical += 1;
            continue;
        }

        let legacy: LegacyDrawRecord =
            serde_json::from_str(&json).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?;
        let draw = record::from_legacy(&legacy)
            .and_then(|draw| record::validate(&draw).map(|()| draw))
            .map_err(|source| StoreError::InvalidFile {
                path: path.clone(),
                source,
            })?;

        let (saved, filename) = store.save(&draw)?;
        let target = store.dir().join(&filename);
        if target != path {
            fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
        }
        info!("{}, migrated {} to {}", saved.date, saved.draw_id, filename);
        report.migrated += 1;
    }

    Ok(report)
}
