//! Raw rating records and CSV adapters.
//!
//! The feature engine only needs the four-field record shape; these helpers
//! read the common headerless `rater,ratee,rating,time` export and write the
//! resulting feature table back out.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use csv::{ReaderBuilder, Writer};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::store::RatingStore;
use super::types::{RatingEvent, UserId};
use crate::error::{FeatureError, Result};
use crate::features::FeatureTable;

/// Unparsed rating record as produced by an external loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub rater: String,
    pub ratee: String,
    pub rating: String,
    pub timestamp: String,
}

impl RatingRecord {
    /// Create a record from raw field values
    pub fn new(
        rater: impl Into<String>,
        ratee: impl Into<String>,
        rating: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            rater: rater.into(),
            ratee: ratee.into(),
            rating: rating.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Validate and convert into a [`RatingEvent`].
    ///
    /// `record` is the 1-based position used in error messages.
    pub fn parse(&self, record: usize) -> Result<RatingEvent> {
        let rater = parse_user(&self.rater, record, "rater")?;
        let ratee = parse_user(&self.ratee, record, "ratee")?;

        let rating: i32 = self.rating.trim().parse().map_err(|_| {
            FeatureError::data_format(
                record,
                "rating",
                format!("is not an integer: {:?}", self.rating),
            )
        })?;
        if rating == 0 {
            return Err(FeatureError::data_format(record, "rating", "must be nonzero"));
        }

        let timestamp = parse_timestamp(&self.timestamp).ok_or_else(|| {
            FeatureError::data_format(
                record,
                "timestamp",
                format!("is not a recognised date-time: {:?}", self.timestamp),
            )
        })?;

        Ok(RatingEvent::new(rater, ratee, rating, timestamp))
    }
}

fn parse_user(value: &str, record: usize, field: &'static str) -> Result<UserId> {
    value.trim().parse().map_err(|_| {
        FeatureError::data_format(record, field, format!("is not a user id: {:?}", value))
    })
}

/// Parse unix seconds (fraction truncated), RFC 3339 or `YYYY-MM-DD HH:MM:SS`
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(secs) = value.parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single();
    }
    if let Ok(secs) = value.parse::<f64>() {
        if secs.is_finite() {
            return Utc.timestamp_opt(secs.trunc() as i64, 0).single();
        }
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Utc.timestamp_opt(dt.timestamp(), 0).single();
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// File adapters for ratings and feature tables
pub struct DataLoader;

impl DataLoader {
    /// Read raw records from a headerless `rater,ratee,rating,time` CSV file
    pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<RatingRecord>> {
        let file = File::open(&path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut records = Vec::new();
        for result in reader.deserialize() {
            let record: RatingRecord = result?;
            records.push(record);
        }
        Ok(records)
    }

    /// Load a rating store from a headerless CSV file
    pub fn load_ratings<P: AsRef<Path>>(path: P) -> Result<RatingStore> {
        info!("Reading ratings from {:?}", path.as_ref());
        let records = Self::read_records(&path)?;
        RatingStore::load(records)
    }

    /// Write a feature table as CSV with a header row
    pub fn save_features<P: AsRef<Path>>(table: &FeatureTable, path: P) -> Result<()> {
        let file = File::create(&path)?;
        let mut writer = Writer::from_writer(file);

        let mut header = vec![
            "rater".to_string(),
            "ratee".to_string(),
            "rating".to_string(),
            "timestamp".to_string(),
        ];
        header.extend(table.columns().iter().cloned());
        writer.write_record(&header)?;

        for (event, values) in table.events().iter().zip(table.data().rows()) {
            let mut row = vec![
                event.rater.to_string(),
                event.ratee.to_string(),
                event.rating.to_string(),
                event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            ];
            row.extend(values.iter().map(|v| v.to_string()));
            writer.write_record(&row)?;
        }

        writer.flush()?;
        info!("Wrote {} feature rows to {:?}", table.len(), path.as_ref());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2010, 11, 8, 18, 45, 11).unwrap();
        assert_eq!(parse_timestamp("1289241911"), Some(expected));
        assert_eq!(parse_timestamp("1289241911.72836"), Some(expected));
        assert_eq!(parse_timestamp("2010-11-08T18:45:11Z"), Some(expected));
        assert_eq!(parse_timestamp("2010-11-08 18:45:11"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_parse_record() {
        let event = RatingRecord::new("6", "2", "4", "1289241911").parse(1).unwrap();
        assert_eq!(event.rater, 6);
        assert_eq!(event.ratee, 2);
        assert_eq!(event.rating, 4);
    }

    #[test]
    fn test_malformed_records_name_the_field() {
        let err = RatingRecord::new("6", "2", "4.5", "1289241911").parse(7).unwrap_err();
        match err {
            FeatureError::DataFormat { record, field, .. } => {
                assert_eq!(record, 7);
                assert_eq!(field, "rating");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = RatingRecord::new("6", "2", "0", "1289241911").parse(1).unwrap_err();
        assert!(matches!(err, FeatureError::DataFormat { field: "rating", .. }));

        let err = RatingRecord::new("6", "2", "3", "soon").parse(2).unwrap_err();
        assert!(matches!(err, FeatureError::DataFormat { field: "timestamp", .. }));

        let err = RatingRecord::new("x", "2", "3", "1289241911").parse(3).unwrap_err();
        assert!(matches!(err, FeatureError::DataFormat { field: "rater", .. }));
    }

    #[test]
    fn test_load_ratings_from_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ratings.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "6,2,4,1289241911.72836").unwrap();
        writeln!(file, "6,5,2,1289241941.53378").unwrap();
        writeln!(file, "1,15,1,1289243140.39049").unwrap();

        let store = DataLoader::load_ratings(&path).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.events()[0].ratee, 2);
    }

    #[test]
    fn test_load_reports_bad_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ratings.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "6,2,4,1289241911").unwrap();
        writeln!(file, "6,5,two,1289241941").unwrap();

        let err = DataLoader::load_ratings(&path).unwrap_err();
        assert!(matches!(err, FeatureError::DataFormat { record: 2, field: "rating", .. }));
    }
}
