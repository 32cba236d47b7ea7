//! Upstream APIs and their mapping onto output rows.
pub(crate) mod cell;
pub(crate) mod stats;
pub(crate) mod store;
