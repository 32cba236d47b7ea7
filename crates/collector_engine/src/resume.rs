use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use collector_core::{ProgressSet, Row, Schema, WorkId};
use collector_logging::{collector_debug, collector_warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse csv {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path:?} has no {column} column")]
    MissingColumn { path: PathBuf, column: String },
    #[error("{0:?} is missing or empty")]
    EmptyInput(PathBuf),
}

/// A CSV file read into memory. Empty cells are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    pub header: Vec<String>,
    pub records: Vec<Vec<Option<String>>>,
}

impl CsvTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }
}

/// Identifiers already recorded in `path`.
///
/// A missing or zero-length file, or one without the identifier column,
/// yields an empty set. Records that cannot be decoded or whose identifier
/// does not parse are left out, so those items are fetched again.
pub fn load_progress<I: WorkId>(path: &Path, id_field: &str) -> Result<ProgressSet<I>, ResumeError> {
    let mut progress = ProgressSet::new();
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(progress),
        Err(source) => {
            return Err(ResumeError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    // A record cut off by a crash is not finished work.
    let complete = complete_records_len(&bytes);
    if complete < bytes.len() {
        collector_debug!(
            "Ignoring {} byte(s) of unterminated record at the end of {:?}",
            bytes.len() - complete,
            path
        );
    }
    if complete == 0 {
        return Ok(progress);
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(&bytes[..complete]);

    let header = match reader.byte_headers() {
        Ok(header) => header.clone(),
        Err(err) => {
            collector_warn!("Unreadable header in {:?}, starting fresh: {}", path, err);
            return Ok(progress);
        }
    };
    let Some(id_idx) = header.iter().position(|h| h == id_field.as_bytes()) else {
        collector_warn!("{:?} has no {} column, starting fresh", path, id_field);
        return Ok(progress);
    };

    let mut ignored = 0usize;
    for record in reader.byte_records() {
        let record = match record {
            Ok(record) => record,
            Err(err) if err.is_io_error() => {
                return Err(ResumeError::Csv {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
            Err(err) => {
                collector_debug!("Skipping undecodable record in {:?}: {}", path, err);
                ignored += 1;
                continue;
            }
        };
        let recorded = record
            .get(id_idx)
            .and_then(|raw| std::str::from_utf8(raw).ok())
            .map(|raw| progress.insert_raw(raw))
            .unwrap_or(false);
        if !recorded {
            ignored += 1;
        }
    }

    if ignored > 0 {
        collector_debug!(
            "Ignored {} record(s) without a usable {} in {:?}",
            ignored,
            id_field,
            path
        );
    }
    Ok(progress)
}

/// Reads a prior artifact and re-projects its records onto `schema` by field
/// name. Only the first record per identifier is kept, and records whose
/// identifier does not parse as `I` are dropped so they can be refetched.
pub fn load_rows<I: WorkId>(path: &Path, schema: &Arc<Schema>) -> Result<Vec<Row>, ResumeError> {
    let Some(table) = read_table(path)? else {
        return Ok(Vec::new());
    };
    let Some(id_idx) = table.column(schema.id_field()) else {
        collector_warn!(
            "{:?} has no {} column, ignoring its rows",
            path,
            schema.id_field()
        );
        return Ok(Vec::new());
    };

    let mut seen: HashSet<I> = HashSet::new();
    let mut rows = Vec::with_capacity(table.records.len());
    for record in table.records {
        let id = record
            .get(id_idx)
            .and_then(|cell| cell.as_deref())
            .and_then(|raw| raw.trim().parse::<I>().ok());
        let Some(id) = id else {
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        let pairs = table
            .header
            .iter()
            .map(String::as_str)
            .zip(record);
        rows.push(Row::project(schema, pairs));
    }
    Ok(rows)
}

/// Reads a whole CSV file. Returns `None` for a missing or zero-length file.
/// Records with a different field count are padded or truncated to the
/// header; records that fail to decode are skipped.
pub fn read_table(path: &Path) -> Result<Option<CsvTable>, ResumeError> {
    let Some(mut reader) = open_artifact(path)? else {
        return Ok(None);
    };

    let header: Vec<String> = reader
        .headers()
        .map_err(|source| ResumeError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(ToOwned::to_owned)
        .collect();

    let mut records = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) if err.is_io_error() => {
                return Err(ResumeError::Csv {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
            Err(err) => {
                collector_debug!("Skipping undecodable record in {:?}: {}", path, err);
                continue;
            }
        };
        let mut cells: Vec<Option<String>> = record
            .iter()
            .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
            .collect();
        cells.resize(header.len(), None);
        records.push(cells);
    }

    Ok(Some(CsvTable { header, records }))
}

/// Length of the prefix of `bytes` that ends with a record terminator
/// outside of any quoted field. Anything after it is an unfinished record.
pub(crate) fn complete_records_len(bytes: &[u8]) -> usize {
    let mut in_quotes = false;
    let mut end = 0;
    for (i, byte) in bytes.iter().enumerate() {
        match byte {
            b'"' => in_quotes = !in_quotes,
            b'\n' if !in_quotes => end = i + 1,
            _ => {}
        }
    }
    end
}

fn open_artifact(path: &Path) -> Result<Option<csv::Reader<File>>, ResumeError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ResumeError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let len = file
        .metadata()
        .map_err(|source| ResumeError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    if len == 0 {
        return Ok(None);
    }
    Ok(Some(
        csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(file),
    ))
}
