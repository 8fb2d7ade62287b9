//! Record cleaning: raw metadata rows in, validated [`Document`]s out.
//!
//! Cleaning never fails on a bad row. Rows without a title are dropped, dates
//! that cannot be read become absent, and every such decision is recorded in a
//! [`CleaningReport`] so callers can see what was left out.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use log::{debug, warn};
use serde::Serialize;

use crate::error::Result;

/// Column names the cleaner reads. Any other column is ignored.
pub const FIELD_TITLE: &str = "title";
pub const FIELD_JOURNAL: &str = "journal";
pub const FIELD_SOURCE: &str = "source";
pub const FIELD_PUBLISH_TIME: &str = "publish_time";
pub const FIELD_ABSTRACT: &str = "abstract";

// CORD-19 metadata ships the source column as `source_x`.
const SOURCE_ALIASES: [&str; 2] = [FIELD_SOURCE, "source_x"];

const TRACKED_FIELDS: [&str; 5] = [
    FIELD_TITLE,
    FIELD_JOURNAL,
    FIELD_SOURCE,
    FIELD_PUBLISH_TIME,
    FIELD_ABSTRACT,
];

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

const DATE_FORMATS: [&str; 10] = [
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y %b %d", "%Y %B %d", "%d %b %Y", "%d %B %Y",
    "%b %d, %Y", "%B %d, %Y", "%Y.%m.%d",
];

/// One untyped input row: column name to raw cell text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for tests and in-memory corpora.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields
            .insert(key.into().trim().to_lowercase(), value.into());
    }

    /// Value of `key`, or `None` when the column is missing or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn source(&self) -> Option<&str> {
        SOURCE_ALIASES.iter().find_map(|k| self.get(k))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = RawRecord::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// A cleaned bibliographic record.
///
/// Only [`Document::from_raw`] constructs one, so `year` always agrees with
/// `publish_time` and `abstract_word_count` with the abstract it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    title: String,
    journal: Option<String>,
    source: Option<String>,
    publish_time: Option<NaiveDate>,
    year: Option<i32>,
    abstract_word_count: usize,
}

impl Document {
    /// Returns `None` when the row has no usable title.
    pub fn from_raw(raw: &RawRecord) -> Option<Self> {
        let title = raw.get(FIELD_TITLE)?.to_string();
        let publish_time = raw.get(FIELD_PUBLISH_TIME).and_then(parse_publish_time);
        Some(Document {
            title,
            journal: raw.get(FIELD_JOURNAL).map(str::to_string),
            source: raw.source().map(str::to_string),
            publish_time,
            year: publish_time.map(|d| d.year()),
            abstract_word_count: raw
                .get(FIELD_ABSTRACT)
                .map_or(0, |a| a.split_whitespace().count()),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn journal(&self) -> Option<&str> {
        self.journal.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn publish_time(&self) -> Option<NaiveDate> {
        self.publish_time
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn abstract_word_count(&self) -> usize {
        self.abstract_word_count
    }
}

/// What the cleaner dropped or downgraded. Row indices are 0-based positions in
/// the input sequence (the CSV header is not counted).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub dropped_untitled: Vec<usize>,
    pub unparsed_dates: Vec<usize>,
    pub missing: BTreeMap<String, usize>,
}

/// Output of [`clean_records`]: the documents in input order plus diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanedCorpus {
    pub documents: Vec<Document>,
    pub report: CleaningReport,
}

/// Clean a batch of raw rows.
pub fn clean_records<'a, I>(rows: I) -> CleanedCorpus
where
    I: IntoIterator<Item = &'a RawRecord>,
{
    let mut documents = Vec::new();
    let mut report = CleaningReport {
        missing: TRACKED_FIELDS.iter().map(|f| (f.to_string(), 0)).collect(),
        ..Default::default()
    };

    for (index, raw) in rows.into_iter().enumerate() {
        report.rows_read += 1;
        for field in TRACKED_FIELDS {
            let present = if field == FIELD_SOURCE {
                raw.source().is_some()
            } else {
                raw.get(field).is_some()
            };
            if !present {
                *report.missing.entry(field.to_string()).or_insert(0) += 1;
            }
        }

        let Some(doc) = Document::from_raw(raw) else {
            report.dropped_untitled.push(index);
            continue;
        };
        if raw.get(FIELD_PUBLISH_TIME).is_some() && doc.publish_time.is_none() {
            report.unparsed_dates.push(index);
        }
        documents.push(doc);
    }

    report.rows_kept = documents.len();
    if !report.dropped_untitled.is_empty() {
        warn!(
            "Dropped {} of {} rows without a title",
            report.dropped_untitled.len(),
            report.rows_read
        );
    }
    if !report.unparsed_dates.is_empty() {
        warn!(
            "{} rows have an unreadable publish_time; their year is left empty",
            report.unparsed_dates.len()
        );
    }
    debug!("Cleaned {} of {} rows", report.rows_kept, report.rows_read);

    CleanedCorpus { documents, report }
}

/// Interpret a free-form publication date. Returns `None` instead of failing.
///
/// Full timestamps keep only their date; `2020-03` and `2020 Mar` resolve to the
/// first of the month and a bare `2020` to January 1st.
pub fn parse_publish_time(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        return Some(dt.date());
    }
    if let Some(d) = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
    {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{s} 01"), "%Y %b %d") {
        return Some(d);
    }
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().ok().and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1));
    }
    None
}

/// Read CSV rows (with a header line) into raw records.
///
/// Short or long rows are accepted; missing cells simply read as absent.
/// Invalid UTF-8 is replaced rather than rejected.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);
    let headers: Vec<String> = rdr
        .byte_headers()?
        .iter()
        .map(|h| {
            String::from_utf8_lossy(h)
                .trim_start_matches('\u{feff}')
                .to_string()
        })
        .collect();

    let mut records = Vec::new();
    for row in rdr.byte_records() {
        let row = row?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(h, v)| (h.clone(), String::from_utf8_lossy(v).into_owned()))
            .collect();
        records.push(record);
    }
    debug!("Read {} rows with columns {:?}", records.len(), headers);
    Ok(records)
}

/// Read a CSV file from disk. See [`read_records`].
pub fn load_csv(path: &Path) -> Result<Vec<RawRecord>> {
    let file = std::fs::File::open(path)?;
    read_records(file)
}
