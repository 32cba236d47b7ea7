//! The two collection jobs.
pub mod stats;
pub mod store;
