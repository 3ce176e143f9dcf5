//! Attempt History Store
//!
//! Persistence seam for the adaptive selector. History lives in flat
//! append-only files, one per calendar day per drill type, named
//! `YYYY_MM_DD<suffix>`. Each line is one answered problem:
//!
//! ```text
//! 100;-40;7,3.25,67,true,2024-03-01-19:22:05,ARABIC
//! ```
//!
//! i.e. semicolon-joined operands, response time in seconds (two decimals),
//! the submitted response, a correctness flag, the submission timestamp, and
//! the presentation style tag. The store never mutates or deletes records.

use chrono::{NaiveDate, NaiveDateTime};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::error::{DrillError, DrillResult};
use crate::types::{AttemptRecord, PresentationStyle};

/// File suffix for the addition/subtraction drill history
pub const DEFAULT_SUFFIX: &str = "_abacus_as.dat";

/// Date component of history filenames
pub(crate) const FILE_DATE_FORMAT: &str = "%Y_%m_%d";

/// Timestamp format inside records
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";

/// Read access to per-day attempt history, as consumed by the selector
pub trait HistoryStore {
    /// All session dates with recorded history, sorted ascending
    fn session_dates(&self) -> DrillResult<Vec<NaiveDate>>;

    /// Every attempt recorded for the given session date.
    ///
    /// A date with no file yields an empty list; an unparsable file is a
    /// `CorruptHistory` error.
    fn read_records(&self, date: NaiveDate) -> DrillResult<Vec<AttemptRecord>>;
}

/// Flat-file history store rooted at a directory
#[derive(Clone, Debug)]
pub struct FileHistoryStore {
    dir: PathBuf,
    suffix: String,
}

impl FileHistoryStore {
    /// Store for the addition/subtraction drill
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_suffix(dir, DEFAULT_SUFFIX)
    }

    /// Store with a custom per-drill-type suffix
    pub fn with_suffix(dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the history file for a session date
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}{}", date.format(FILE_DATE_FORMAT), self.suffix))
    }

    /// Append one attempt to its day's file, creating directory and file as
    /// needed. The file is chosen by the record's timestamp date.
    pub fn append(&self, record: &AttemptRecord) -> DrillResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(record.timestamp.date());

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", serialize_record(record))?;
        trace!(path = %path.display(), "appended attempt record");
        Ok(())
    }
}

impl HistoryStore for FileHistoryStore {
    fn session_dates(&self) -> DrillResult<Vec<NaiveDate>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut dates = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();

            let Some(prefix) = name.strip_suffix(self.suffix.as_str()) else {
                continue;
            };
            let date = NaiveDate::parse_from_str(prefix, FILE_DATE_FORMAT).map_err(|err| {
                DrillError::CorruptHistory(format!(
                    "history file {} has an unparsable date: {}",
                    name, err
                ))
            })?;
            dates.push(date);
        }

        dates.sort();
        Ok(dates)
    }

    fn read_records(&self, date: NaiveDate) -> DrillResult<Vec<AttemptRecord>> {
        let path = self.path_for(date);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&path)?;
        let mut records = Vec::new();
        for (line_no, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = parse_record(line).map_err(|err| {
                DrillError::CorruptHistory(format!(
                    "{} line {}: {}",
                    path.display(),
                    line_no + 1,
                    err
                ))
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

/// Render a record as one history line
pub fn serialize_record(record: &AttemptRecord) -> String {
    let operands = record
        .operands
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(";");

    format!(
        "{},{:.2},{},{},{},{}",
        operands,
        record.response_time_secs,
        record.response,
        record.is_correct,
        record.timestamp.format(TIMESTAMP_FORMAT),
        record.style.name()
    )
}

/// Parse one history line. Errors carry the offending field, not the whole
/// line, so callers can point at what broke.
pub fn parse_record(line: &str) -> Result<AttemptRecord, String> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 6 {
        return Err(format!("expected 6 fields, found {}", fields.len()));
    }

    let operands = fields[0]
        .split(';')
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| format!("bad operand {:?}", part))
        })
        .collect::<Result<Vec<i64>, String>>()?;
    if operands.is_empty() {
        return Err("empty operand list".to_string());
    }

    let response_time_secs = fields[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("bad response time {:?}", fields[1]))?;

    let response = fields[2]
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("bad response {:?}", fields[2]))?;

    // Historical files carry Python-style capitalized booleans
    let is_correct = match fields[3].trim() {
        "true" | "True" => true,
        "false" | "False" => false,
        other => return Err(format!("bad correctness flag {:?}", other)),
    };

    let timestamp = NaiveDateTime::parse_from_str(fields[4].trim(), TIMESTAMP_FORMAT)
        .map_err(|_| format!("bad timestamp {:?}", fields[4]))?;

    let style = PresentationStyle::from_name(fields[5].trim())
        .ok_or_else(|| format!("unknown presentation style {:?}", fields[5]))?;

    Ok(AttemptRecord {
        operands,
        response_time_secs,
        response,
        is_correct,
        timestamp,
        style,
    })
}

// ==================== Tests ====================
