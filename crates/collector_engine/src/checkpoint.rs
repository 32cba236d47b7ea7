use std::cmp::Ordering;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use collector_core::{Row, Schema};
use collector_logging::{collector_debug, collector_info, collector_warn};
use thiserror::Error;

use crate::persist::{ensure_output_dir, AtomicFileWriter, PersistError};
use crate::resume::complete_records_len;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("{path:?} has header {found:?}, expected {expected:?}")]
    HeaderMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("row does not match the output schema")]
    SchemaMismatch,
}

/// Destination for committed rows.
pub trait RowSink: Send {
    fn commit(&mut self, row: Row) -> Result<(), CheckpointError>;

    /// Called every N processed items.
    fn checkpoint(&mut self) -> Result<(), CheckpointError>;

    /// Called once after the last item, regardless of checkpoint boundaries.
    fn finish(&mut self) -> Result<(), CheckpointError>;
}

/// Appends one CSV record per committed row and flushes it immediately.
pub struct AppendSink {
    path: PathBuf,
    schema: Arc<Schema>,
    writer: csv::Writer<File>,
    rows_written: usize,
}

impl AppendSink {
    /// Opens `path` for append, creating it if needed. The header is written
    /// only when the file is new or empty.
    ///
    /// An existing file must start with the schema's header. A trailing
    /// record left unterminated by an interrupted run is cut off, so its item
    /// is fetched again.
    pub fn open(path: &Path, schema: &Arc<Schema>) -> Result<Self, CheckpointError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_output_dir(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;
        let mut existing = Vec::new();
        file.read_to_end(&mut existing)?;

        let complete = complete_records_len(&existing);
        if complete > 0 {
            let found = first_record(&existing[..complete])?;
            if found.as_slice() != schema.fields() {
                return Err(CheckpointError::HeaderMismatch {
                    path: path.to_path_buf(),
                    expected: schema.fields().to_vec(),
                    found,
                });
            }
        }

        if complete < existing.len() {
            collector_warn!(
                "Dropping {} byte(s) of unterminated record at the end of {:?}",
                existing.len() - complete,
                path
            );
            file.set_len(complete as u64)?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if complete == 0 {
            writer.write_record(schema.fields())?;
            writer.flush()?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            schema: Arc::clone(schema),
            writer,
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

impl RowSink for AppendSink {
    fn commit(&mut self, row: Row) -> Result<(), CheckpointError> {
        ensure_schema(&self.schema, &row)?;
        self.writer.write_record(row.to_record())?;
        self.writer.flush()?;
        self.rows_written += 1;
        Ok(())
    }

    fn checkpoint(&mut self) -> Result<(), CheckpointError> {
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), CheckpointError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        collector_debug!("Appended {} row(s) to {:?}", self.rows_written, self.path);
        Ok(())
    }
}

/// Keeps every row in memory and rewrites the whole artifact on each
/// checkpoint. An optional ordering is applied to the final write only.
#[derive(Debug)]
pub struct RewriteSink {
    path: PathBuf,
    schema: Arc<Schema>,
    writer: AtomicFileWriter,
    file_name: String,
    rows: Vec<Row>,
    final_order: Option<SortOrder>,
}

impl RewriteSink {
    /// `existing` rows (usually from [`crate::load_rows`]) are carried into
    /// every snapshot ahead of the rows committed in this run.
    pub fn new(path: &Path, schema: &Arc<Schema>, existing: Vec<Row>) -> Result<Self, CheckpointError> {
        let (writer, file_name) = AtomicFileWriter::for_target(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            schema: Arc::clone(schema),
            writer,
            file_name,
            rows: existing,
            final_order: None,
        })
    }

    pub fn with_final_order(mut self, order: SortOrder) -> Self {
        self.final_order = Some(order);
        self
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    fn write_snapshot(&self) -> Result<(), CheckpointError> {
        let mut csv_writer = csv::Writer::from_writer(Vec::new());
        csv_writer.write_record(self.schema.fields())?;
        for row in &self.rows {
            csv_writer.write_record(row.to_record())?;
        }
        let bytes = csv_writer
            .into_inner()
            .map_err(|err| CheckpointError::Io(err.into_error()))?;
        self.writer.write(&self.file_name, &bytes)?;
        Ok(())
    }
}

impl RowSink for RewriteSink {
    fn commit(&mut self, row: Row) -> Result<(), CheckpointError> {
        ensure_schema(&self.schema, &row)?;
        self.rows.push(row);
        Ok(())
    }

    fn checkpoint(&mut self) -> Result<(), CheckpointError> {
        self.write_snapshot()?;
        collector_info!("Saved {} row(s) to {:?}", self.rows.len(), self.path);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), CheckpointError> {
        if let Some(order) = &self.final_order {
            self.rows.sort_by(|a, b| order.compare(a, b));
        }
        self.write_snapshot()?;
        collector_info!("Wrote {} row(s) to {:?}", self.rows.len(), self.path);
        Ok(())
    }
}

/// Ordering on one field. Cells that parse as storefront dates compare as
/// dates and sort after free text in ascending order; nulls always go last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    pub field: String,
    pub descending: bool,
}

impl SortOrder {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        match (a.get(&self.field), b.get(&self.field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => {
                let ord = compare_values(x, y);
                if self.descending {
                    ord.reverse()
                } else {
                    ord
                }
            }
        }
    }
}

const DATE_FORMATS: [&str; 5] = ["%b %d, %Y", "%d %b, %Y", "%B %d, %Y", "%d %B, %Y", "%Y-%m-%d"];

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

fn compare_values(x: &str, y: &str) -> Ordering {
    match (parse_date(x), parse_date(y)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => x.cmp(y),
    }
}

fn ensure_schema(schema: &Arc<Schema>, row: &Row) -> Result<(), CheckpointError> {
    if Arc::ptr_eq(schema, row.schema()) || **schema == **row.schema() {
        Ok(())
    } else {
        Err(CheckpointError::SchemaMismatch)
    }
}

fn first_record(bytes: &[u8]) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut record = csv::StringRecord::new();
    reader.read_record(&mut record)?;
    Ok(record.iter().map(ToOwned::to_owned).collect())
}
