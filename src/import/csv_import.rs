//! CSV Import
//!
//! Reads meter exports with six columns in fixed order:
//! timestamp, autoconsumption, export, import, consumption, production.
//! Each data line, blank ones included, is either inserted into the index
//! or rejected with a reason; a bad line never aborts the import.

use super::{ImportError, ImportLog, LineError};
use crate::index::EnergyIndex;
use crate::storage::{Measurement, Timestamp};
use serde::Serialize;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Timestamp layout of the meter export, e.g. `01.02.2021 00:15`
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Layouts tried after the configured one
pub const FALLBACK_TIMESTAMP_FORMATS: &[&str] = &[
    "%d.%m.%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const FIELD_COUNT: usize = 6;

/// Maximum number of error messages kept in a report
const MAX_REPORTED_ERRORS: usize = 100;

/// Delimited-text importer with configurable layout
pub struct CsvImporter {
    delimiter: u8,
    has_header: bool,
    timestamp_format: String,
    log_dir: Option<PathBuf>,
}

/// Result of an import operation
#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    /// Lines inserted into the index
    pub accepted: usize,
    /// Lines rejected for any reason, duplicates included
    pub rejected: usize,
    /// Of the rejected lines, those that repeated a known timestamp
    pub duplicates: usize,
    pub errors: Vec<String>,
    /// Log file written for this import, if logging was enabled
    pub log_file: Option<PathBuf>,
    /// Companion log holding only the rejected lines
    pub errors_log_file: Option<PathBuf>,
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvImporter {
    /// Create a new importer with the meter export defaults
    pub fn new() -> Self {
        Self {
            delimiter: b';',
            has_header: true,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            log_dir: None,
        }
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set whether the first line is a header
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Set the primary timestamp format string
    pub fn with_timestamp_format(mut self, format: &str) -> Self {
        self.timestamp_format = format.to_string();
        self
    }

    /// Write import log files into this directory
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Import a file into the index
    pub fn import(&self, path: &Path, index: &mut EnergyIndex) -> Result<ImportReport, ImportError> {
        let file = std::fs::File::open(path)?;
        let report = self.import_reader(file, index)?;

        tracing::info!(
            "Imported {:?}: {} accepted, {} rejected",
            path,
            report.accepted,
            report.rejected
        );
        Ok(report)
    }

    /// Import from a string (useful for testing)
    pub fn import_str(&self, data: &str, index: &mut EnergyIndex) -> Result<ImportReport, ImportError> {
        self.import_reader(data.as_bytes(), index)
    }

    /// Import line by line; each line is split as one CSV record
    ///
    /// Blank lines are rejected like any other bad line. Bytes that are not
    /// valid UTF-8 are replaced rather than aborting the import.
    pub fn import_reader<R: Read>(
        &self,
        reader: R,
        index: &mut EnergyIndex,
    ) -> Result<ImportReport, ImportError> {
        let mut log = match &self.log_dir {
            Some(dir) => Some(ImportLog::create(dir)?),
            None => None,
        };

        let mut report = ImportReport::default();
        let lines = BufReader::new(reader).split(b'\n');

        for (i, bytes) in lines.enumerate().skip(usize::from(self.has_header)) {
            let bytes = bytes?;
            let line_num = i + 1;
            let decoded = String::from_utf8_lossy(&bytes);
            let text = decoded.trim_end_matches('\r');

            let outcome = self.parse_line(text).and_then(|measurement| {
                if index.insert(measurement) {
                    Ok(())
                } else {
                    Err(LineError::Duplicate(measurement.timestamp))
                }
            });

            match outcome {
                Ok(()) => {
                    report.accepted += 1;
                    if let Some(log) = log.as_mut() {
                        log.accepted(text)?;
                    }
                }
                Err(error) => {
                    tracing::debug!("Line {} rejected: {}", line_num, error);
                    report.rejected += 1;
                    if matches!(error, LineError::Duplicate(_)) {
                        report.duplicates += 1;
                    }
                    if let Some(log) = log.as_mut() {
                        log.rejected(&error.to_string(), text)?;
                    }
                    report.errors.push(format!("Line {}: {}", line_num, error));
                }
            }
        }

        // Truncate errors if too many
        if report.errors.len() > MAX_REPORTED_ERRORS {
            let total = report.errors.len();
            report.errors.truncate(MAX_REPORTED_ERRORS);
            report
                .errors
                .push(format!("... and {} more errors", total - MAX_REPORTED_ERRORS));
        }

        if let Some(log) = log {
            let (all, errors) = log.finish()?;
            report.log_file = Some(all);
            report.errors_log_file = Some(errors);
        }

        Ok(report)
    }

    /// Split one line into fields and turn it into a reading
    fn parse_line(&self, line: &str) -> Result<Measurement, LineError> {
        if line.trim().is_empty() {
            return Err(LineError::Empty);
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .buffer_capacity(line.len().max(64))
            .from_reader(line.as_bytes());

        let mut record = csv::StringRecord::new();
        match reader.read_record(&mut record) {
            Ok(true) => self.parse_record(&record),
            Ok(false) => Err(LineError::Empty),
            Err(e) => Err(LineError::Malformed(e.to_string())),
        }
    }

    /// Turn one record into a reading
    fn parse_record(&self, record: &csv::StringRecord) -> Result<Measurement, LineError> {
        if record.len() < FIELD_COUNT {
            return Err(LineError::Incomplete(record.len()));
        }

        let timestamp = self.parse_timestamp(clean_field(&record[0]))?;

        let mut values = [0.0f64; FIELD_COUNT - 1];
        for (i, value) in values.iter_mut().enumerate() {
            let column = i + 1;
            *value = parse_number(clean_field(&record[column])).ok_or_else(|| LineError::Number {
                column,
                value: record[column].to_string(),
            })?;
        }

        let [autoconsumption, export, import, consumption, production] = values;
        Ok(Measurement {
            timestamp,
            autoconsumption,
            export,
            import,
            consumption,
            production,
        })
    }

    /// Parse a timestamp using the configured format, then the fallbacks
    fn parse_timestamp(&self, ts_str: &str) -> Result<Timestamp, LineError> {
        let mut formats = vec![self.timestamp_format.as_str()];
        formats.extend_from_slice(FALLBACK_TIMESTAMP_FORMATS);

        Timestamp::parse(ts_str, &formats).ok_or_else(|| LineError::Timestamp(ts_str.to_string()))
    }
}

/// Strip whitespace and stray quotes left around a field
fn clean_field(field: &str) -> &str {
    field.trim().trim_matches('"').trim()
}

/// Parse a number, accepting a decimal comma
fn parse_number(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>()
        .ok()
        .or_else(|| s.replace(',', ".").parse::<f64>().ok())
}
