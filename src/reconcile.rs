//! One incremental pass over the draw history.
//!
//! Every calendar day since the first draw ends up either stored as a record
//! or listed in the no-draw file. A pass computes the days that are neither,
//! oldest first, and settles them one at a time:
//!
//! - an entry for the day comes back: it is validated and saved;
//! - the source answers without an entry for the day: the day is added to
//!   the no-draw list, which is flushed right away;
//! - the source fails, or answers with an entry whose date cannot be read:
//!   the pass stops. Nothing is written for that day, so the next pass picks
//!   it up again.
//!
//! Nothing is rolled back on failure, which is what makes a rerun resume
//! where the previous one stopped.

use chrono::{Months, NaiveDate};
use tracing::{debug, info};

use crate::api::DrawSource;
use crate::error::{ReconcileError, RunAborted};
use crate::no_draw::NoDrawDates;
use crate::record;
use crate::store::RecordStore;
use crate::types::{DateRange, DrawRecord, RawDrawEntry, RunEvent, RunSummary};
use crate::utils::{format_date, missing_dates};

/// The site asks for search periods of three months or less.
pub const WINDOW_MONTHS: u32 = 3;

/// Windows already requested during this run, with what came back.
#[derive(Debug, Default)]
pub struct QueryWindows {
    windows: Vec<(DateRange, Vec<RawDrawEntry>)>,
}

impl QueryWindows {
    pub fn find(&self, date: NaiveDate) -> Option<&[RawDrawEntry]> {
        self.windows
            .iter()
            .find(|(range, _)| range.contains(date))
            .map(|(_, entries)| entries.as_slice())
    }

    pub fn insert(&mut self, range: DateRange, entries: Vec<RawDrawEntry>) {
        self.windows.push((range, entries));
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// `[date, date + months]`, clamped at the end of the calendar.
pub fn window_starting_at(date: NaiveDate, months: u32) -> DateRange {
    let end = date
        .checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX);
    DateRange { start: date, end }
}

pub struct Reconciler<'a, S> {
    source: &'a S,
    store: &'a dyn RecordStore,
    no_draw: NoDrawDates,
    series_start: NaiveDate,
    window_months: u32,
    windows: QueryWindows,
}

impl<'a, S: DrawSource> Reconciler<'a, S> {
    pub fn new(
        source: &'a S,
        store: &'a dyn RecordStore,
        no_draw: NoDrawDates,
        series_start: NaiveDate,
    ) -> Self {
        Self {
            source,
            store,
            no_draw,
            series_start,
            window_months: WINDOW_MONTHS,
            windows: QueryWindows::default(),
        }
    }

    /// Length of each query window. `0` asks for one day at a time.
    pub fn with_window_months(mut self, months: u32) -> Self {
        self.window_months = months;
        self
    }

    pub fn no_draw_dates(&self) -> &NoDrawDates {
        &self.no_draw
    }

    pub fn into_no_draw_dates(self) -> NoDrawDates {
        self.no_draw
    }

    /// Days in `[series_start, today)` not yet accounted for.
    pub fn missing(&self, today: NaiveDate) -> Result<Vec<NaiveDate>, ReconcileError> {
        let persisted = self.store.list_persisted_dates()?;
        Ok(missing_dates(
            self.series_start,
            today,
            &persisted,
            self.no_draw.dates(),
        ))
    }

    /// Settles every missing day before `today`, one at a time.
    pub async fn run(&mut self, today: NaiveDate) -> Result<RunSummary, RunAborted> {
        let mut summary = RunSummary::default();

        let missing = match self.missing(today) {
            Ok(missing) => missing,
            Err(source) => {
                return Err(RunAborted {
                    summary,
                    date: None,
                    source,
                });
            }
        };
        info!(
            count = missing.len(),
            from = %self.series_start,
            to = %today,
            "dates to fetch"
        );

        for date in missing {
            match self.settle(date).await {
                Ok(Settled::Saved { record, filename }) => {
                    info!("{}, saved {} to {}", date, record.draw_id, filename);
                    summary.events.push(RunEvent::Saved {
                        date,
                        draw_id: record.draw_id.clone(),
                        filename,
                    });
                    summary.saved.push(record);
                }
                Ok(Settled::NoDraw) => {
                    info!("{}, no draw", date);
                    summary.events.push(RunEvent::NoDraw { date });
                }
                Err(source) => {
                    return Err(RunAborted {
                        summary,
                        date: Some(date),
                        source,
                    });
                }
            }
        }

        Ok(summary)
    }

    async fn settle(&mut self, date: NaiveDate) -> Result<Settled, ReconcileError> {
        debug!(date = %format_date(date), "fetching");
        let entries = self.entries_covering(date).await?;

        // every date in the window must be readable: an unreadable entry
        // might be this day's draw
        let mut found = None;
        for entry in entries {
            if record::entry_date(entry)? == date && found.is_none() {
                found = Some(entry.clone());
            }
        }

        match found {
            Some(entry) => {
                let draw = record::normalize(&entry)?;
                let (record, filename) = self.store.save(&draw)?;
                Ok(Settled::Saved { record, filename })
            }
            None => {
                self.no_draw.record(date)?;
                debug!(count = self.no_draw.len(), "updated no draw dates list");
                Ok(Settled::NoDraw)
            }
        }
    }

    async fn entries_covering(&mut self, date: NaiveDate) -> Result<&[RawDrawEntry], ReconcileError> {
        if self.windows.find(date).is_none() {
            let window = window_starting_at(date, self.window_months);
            let entries = self.source.fetch_window(&window).await?;
            debug!(
                start = %window.start,
                end = %window.end,
                entries = entries.len(),
                "cached query window"
            );
            self.windows.insert(window, entries);
        } else {
            debug!(date = %date, "query window cache hit");
        }
        Ok(self.windows.find(date).unwrap_or(&[]))
    }
}

enum Settled {
    Saved { record: DrawRecord, filename: String },
    NoDraw,
}
