//! Collector core: pure data types shared by the fetch engine and the app.
mod id;
mod outcome;
mod progress;
mod retry;
mod schema;

pub use id::{AppId, WorkId};
pub use outcome::{DropReason, ItemOutcome, RunSummary};
pub use progress::ProgressSet;
pub use retry::RetryPolicy;
pub use schema::{Row, Schema, SchemaError};
