use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;

/// Storefront application identifier.
pub type AppId = u64;

/// Anything that can name one unit of work: unique, printable and parseable
/// back from a CSV cell.
pub trait WorkId: Clone + Eq + Hash + Debug + Display + FromStr + Send + Sync {}

impl<T> WorkId for T where T: Clone + Eq + Hash + Debug + Display + FromStr + Send + Sync {}
