//! CSV loading and date filtering of chat logs

use crate::error::{ChatlensError, Result};
use crate::types::{DateRange, Message};
use crate::config::MAX_RANGE_DAYS;
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const TIMESTAMP_COLUMN: &str = "timestamp";
const USER_COLUMN: &str = "user_id";
const MESSAGE_COLUMN: &str = "message";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

pub fn load_messages(path: impl AsRef<Path>) -> Result<Vec<Message>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let messages = load_messages_from_reader(file)?;
    debug!("Loaded {} messages from {}", messages.len(), path.display());
    Ok(messages)
}

pub fn load_messages_from_reader<R: Read>(reader: R) -> Result<Vec<Message>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}') == name)
            .ok_or_else(|| ChatlensError::MissingColumn(name.to_string()))
    };
    let ts_idx = position(TIMESTAMP_COLUMN)?;
    let user_idx = position(USER_COLUMN)?;
    let text_idx = position(MESSAGE_COLUMN)?;

    let mut messages = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        // Header is line 1
        let line = record.position().map(|p| p.line() as usize).unwrap_or(messages.len() + 2);

        let raw_ts = record.get(ts_idx).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| ChatlensError::InvalidTimestamp {
            line,
            value: raw_ts.to_string(),
        })?;

        messages.push(Message::new(
            timestamp,
            record.get(user_idx).unwrap_or_default(),
            record.get(text_idx).unwrap_or_default(),
        ));
    }
    Ok(messages)
}

/// Parse the timestamp shapes seen in exported chat logs.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ChatlensError::Config(format!(
                "date range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Window of `days` days back from `end`, both ends inclusive.
    /// `days` is clamped to `0..=MAX_RANGE_DAYS`; the start saturates at the
    /// earliest representable date.
    pub fn ending_at(end: NaiveDate, days: i64) -> Self {
        let days = days.clamp(0, MAX_RANGE_DAYS) as u64;
        Self {
            start: end.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN),
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Messages whose date falls inside `range`, in input order
pub fn filter_messages(messages: &[Message], range: &DateRange) -> Vec<Message> {
    messages
        .iter()
        .filter(|m| range.contains(m.date()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_load_with_bom_and_extra_columns() {
        let csv = "\u{feff}timestamp,user_id,message,channel\n\
                   2024-05-01 09:15:00,u1,ログインできない,web\n\
                   2024-05-02 10:00:00,u2,\"保存, 印刷\",app\n";
        let messages = load_messages_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].user_id, "u1");
        assert_eq!(messages[1].text, "保存, 印刷");
        assert_eq!(messages[1].date(), date(2024, 5, 2));
    }

    #[test]
    fn test_missing_column() {
        let csv = "timestamp,message\n2024-05-01 09:15:00,hi\n";
        let err = load_messages_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ChatlensError::MissingColumn(ref c) if c == "user_id"));
    }

    #[test]
    fn test_invalid_timestamp_reports_line() {
        let csv = "timestamp,user_id,message\n2024-05-01 09:15:00,u1,a\nyesterday,u2,b\n";
        let err = load_messages_from_reader(csv.as_bytes()).unwrap_err();
        match err {
            ChatlensError::InvalidTimestamp { line, value } => {
                assert_eq!(line, 3);
                assert_eq!(value, "yesterday");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_timestamp_formats() {
        for raw in [
            "2024-05-01 09:15:00",
            "2024-05-01T09:15:00",
            "2024/05/01 09:15:00",
            "2024-05-01 09:15",
            "2024-05-01T09:15:00+09:00",
        ] {
            let ts = parse_timestamp(raw).unwrap_or_else(|| panic!("{raw}"));
            assert_eq!(ts.date(), date(2024, 5, 1));
        }
        assert_eq!(parse_timestamp("2024-05-01").unwrap().date(), date(2024, 5, 1));
        assert!(parse_timestamp("05/01/2024").is_none());
    }

    #[test]
    fn test_filter_is_inclusive_and_ordered() {
        let at = |d: u32, text: &str| {
            Message::new(date(2024, 5, d).and_hms_opt(12, 0, 0).unwrap(), "u", text)
        };
        let messages = vec![at(3, "c"), at(1, "a"), at(5, "e"), at(2, "b"), at(4, "d")];
        let range = DateRange::new(date(2024, 5, 2), date(2024, 5, 4)).unwrap();
        let texts: Vec<String> = filter_messages(&messages, &range)
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["c", "b", "d"]);
    }

    #[test]
    fn test_range_validation_and_default_window() {
        assert!(DateRange::new(date(2024, 5, 2), date(2024, 5, 1)).is_err());
        let window = DateRange::ending_at(date(2024, 5, 31), 60);
        assert_eq!(window.start, date(2024, 4, 1));
        assert!(window.contains(date(2024, 4, 1)));
        assert!(!window.contains(date(2024, 3, 31)));
    }

    #[test]
    fn test_huge_window_does_not_panic() {
        let window = DateRange::ending_at(date(2024, 5, 31), i64::MAX);
        assert!(window.start < date(1925, 1, 1));
        assert_eq!(window.end, date(2024, 5, 31));

        let early = DateRange::ending_at(NaiveDate::MIN, 10);
        assert_eq!(early.start, NaiveDate::MIN);
        assert_eq!(DateRange::ending_at(date(2024, 5, 31), -5).start, date(2024, 5, 31));
    }
}
