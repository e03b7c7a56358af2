pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod migrate;
pub mod no_draw;
pub mod reconcile;
pub mod record;
pub mod reports;
pub mod retry;
pub mod stats;
pub mod store;
pub mod types;
pub mod utils;

pub use api::{DrawSource, HkjcClient};
pub use error::{FetchError, ReconcileError, RunAborted, StoreError, ValidationError};
pub use no_draw::NoDrawDates;
pub use reconcile::Reconciler;
pub use store::{FileRecordStore, RecordStore};
pub use types::{DateRange, DrawRecord, RawDrawEntry, RunEvent, RunSummary};
