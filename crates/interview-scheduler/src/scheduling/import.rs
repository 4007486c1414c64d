//! Busy-time import from calendar CSV exports.
//!
//! Expected header: `participant_id,start,end[,label]`, instants in RFC 3339.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::domain::ParticipantId;
use super::interval::{BusySet, Interval, IntervalError};

#[derive(Debug, thiserror::Error)]
pub enum CalendarImportError {
    #[error("failed to read calendar export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid calendar CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: '{value}' is not an RFC 3339 timestamp")]
    Timestamp { row: usize, value: String },
    #[error("row {row}: {source}")]
    Interval {
        row: usize,
        #[source]
        source: IntervalError,
    },
}

#[derive(Debug, Deserialize)]
struct CalendarRow {
    participant_id: String,
    start: String,
    end: String,
}

/// Busy sets per participant, normalized on ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarImport {
    pub busy: BTreeMap<ParticipantId, BusySet>,
    pub rows: usize,
}

pub struct CalendarCsvImporter;

impl CalendarCsvImporter {
    pub fn from_path(path: impl AsRef<Path>) -> Result<CalendarImport, CalendarImportError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<CalendarImport, CalendarImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut collected: BTreeMap<ParticipantId, Vec<Interval>> = BTreeMap::new();
        let mut rows = 0;

        for (index, record) in csv_reader.deserialize::<CalendarRow>().enumerate() {
            let row = record?;
            // Header is line 1.
            let line = index + 2;
            let start = parse_instant(&row.start, line)?;
            let end = parse_instant(&row.end, line)?;
            let interval = Interval::new(start, end)
                .map_err(|source| CalendarImportError::Interval { row: line, source })?;

            collected
                .entry(ParticipantId(row.participant_id))
                .or_default()
                .push(interval);
            rows += 1;
        }

        let busy = collected
            .into_iter()
            .map(|(participant, intervals)| (participant, BusySet::from_intervals(intervals)))
            .collect();
        Ok(CalendarImport { busy, rows })
    }
}

fn parse_instant(value: &str, row: usize) -> Result<DateTime<Utc>, CalendarImportError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|_| CalendarImportError::Timestamp {
            row,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, hour, minute, 0)
            .single()
            .expect("valid")
    }

    #[test]
    fn groups_rows_by_participant_and_merges() {
        let csv = "participant_id,start,end,label\n\
lee@example.com,2025-03-04T10:00:00Z,2025-03-04T11:00:00Z,standup\n\
lee@example.com,2025-03-04T11:00:00Z,2025-03-04T11:30:00Z,\n\
cand-7,2025-03-04T09:00:00-05:00,2025-03-04T10:00:00-05:00,commute\n";

        let import = CalendarCsvImporter::from_reader(csv.as_bytes()).expect("import");

        assert_eq!(import.rows, 3);
        let lee = &import.busy[&ParticipantId("lee@example.com".to_string())];
        assert_eq!(
            lee.as_slice(),
            &[Interval::new(at(10, 0), at(11, 30)).expect("valid")]
        );
        let candidate = &import.busy[&ParticipantId("cand-7".to_string())];
        assert_eq!(candidate.as_slice()[0].start(), at(14, 0));
    }

    #[test]
    fn label_column_is_optional() {
        let csv = "participant_id,start,end\nlee,2025-03-04T10:00:00Z,2025-03-04T11:00:00Z\n";
        let import = CalendarCsvImporter::from_reader(csv.as_bytes()).expect("import");
        assert_eq!(import.rows, 1);
    }

    #[test]
    fn reports_row_of_bad_timestamp() {
        let csv = "participant_id,start,end\n\
lee,2025-03-04T10:00:00Z,2025-03-04T11:00:00Z\n\
lee,tomorrow,2025-03-04T11:00:00Z\n";
        let err = CalendarCsvImporter::from_reader(csv.as_bytes()).expect_err("bad row");
        assert!(matches!(err, CalendarImportError::Timestamp { row: 3, .. }));
    }

    #[test]
    fn rejects_inverted_rows() {
        let csv = "participant_id,start,end\nlee,2025-03-04T11:00:00Z,2025-03-04T10:00:00Z\n";
        let err = CalendarCsvImporter::from_reader(csv.as_bytes()).expect_err("inverted");
        assert!(matches!(err, CalendarImportError::Interval { row: 2, .. }));
    }
}
