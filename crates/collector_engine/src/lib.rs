//! Collector engine: rate-limited fetching, resume bookkeeping and checkpointed
//! CSV output.
mod checkpoint;
mod driver;
mod fetch;
mod pacing;
mod persist;
mod resume;
mod retry;
mod sources;
mod types;

pub use checkpoint::{AppendSink, CheckpointError, RewriteSink, RowSink, SortOrder};
pub use driver::{run, DriverOptions, FailurePolicy, FetchedItem, ItemSource};
pub use fetch::{FetchSettings, HttpFetcher, JsonFetcher};
pub use pacing::Pacer;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use resume::{load_progress, load_rows, read_table, CsvTable, ResumeError};
pub use retry::with_retry;
pub use sources::cell::{join_cells, scalar_cell, LIST_DELIMITER};
pub use sources::stats::{
    read_stats_input, stats_schema, StatsInput, StatsSource, DEFAULT_STATS_URL, STATS_FIELDS,
};
pub use sources::store::{
    store_row, store_schema, AppListEntry, ReviewSummary, StoreEndpoints, StoreSource,
    STORE_FIELDS,
};
pub use types::{FailureKind, FetchError};
