use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// One persisted draw. Field order is the on-disk order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRecord {
    pub date: NaiveDate,
    #[serde(rename = "id")]
    pub draw_id: String,
    pub numbers: Vec<u8>,
    pub special: u8,
}

impl DrawRecord {
    /// File name the record is stored under, `YYYY-MM-DD.json`.
    pub fn filename(&self) -> String {
        crate::utils::record_filename(self.date)
    }
}

/// An entry as served by `getJSON.aspx`. Only the fields we keep are mapped.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct RawDrawEntry {
    #[serde(default)]
    pub id: String,
    /// `DD/MM/YYYY`. Required: an entry without a date cannot answer a day.
    pub date: String,
    /// Six numbers joined by `+`.
    #[serde(default)]
    pub no: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub sno: Option<String>,
}

/// Shape written by the old page scraper: `{date, number, result: {numbers, extra}}`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LegacyDrawRecord {
    pub date: String,
    pub number: String,
    pub result: LegacyResult,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LegacyResult {
    pub numbers: Vec<u8>,
    pub extra: u8,
}

/// A closed query window `[start, end]` already sent to the remote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    Saved {
        date: NaiveDate,
        draw_id: String,
        filename: String,
    },
    NoDraw {
        date: NaiveDate,
    },
}

/// What one reconciliation pass accomplished, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub saved: Vec<DrawRecord>,
    pub events: Vec<RunEvent>,
}

impl RunSummary {
    pub fn no_draw_dates(&self) -> Vec<NaiveDate> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RunEvent::NoDraw { date } => Some(*date),
                RunEvent::Saved { .. } => None,
            })
            .collect()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_record_serializes_in_stable_order() {
        let record = DrawRecord {
            date: NaiveDate::from_ymd_opt(1993, 1, 5).unwrap(),
            draw_id: "93/001".to_string(),
            numbers: vec![1, 4, 17, 23, 30, 49],
            special: 8,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"date":"1993-01-05","id":"93/001","numbers":[1,4,17,23,30,49],"special":8}"#
        );
        assert_eq!(record.filename(), "1993-01-05.json");
    }

    #[test]
    fn raw_entry_accepts_numeric_special_and_ignores_extra_fields() {
        let entry: RawDrawEntry = serde_json::from_str(
            r#"{"id":"93/001","date":"05/01/1993","no":"1+2+3+4+5+6","sno":7,"sbcode":"","inv":"1,000"}"#,
        )
        .unwrap();
        assert_eq!(entry.sno.as_deref(), Some("7"));
        assert_eq!(entry.no, "1+2+3+4+5+6");

        let entry: RawDrawEntry =
            serde_json::from_str(r#"{"id":"93/001","date":"05/01/1993","no":"1+2"}"#).unwrap();
        assert_eq!(entry.sno, None);
    }

    #[test]
    fn raw_entry_without_date_is_rejected() {
        let result = serde_json::from_str::<RawDrawEntry>(
            r#"{"id":"93/001","drawDate":"05/01/1993","no":"1+2+3+4+5+6","sno":"7"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn date_range_is_closed() {
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        };
        assert!(range.contains(range.start));
        assert!(range.contains(range.end));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 4, 2).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()));
    }
}
