use std::fmt;

/// Why an item produced no row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The upstream answered but reported no data for the identifier.
    NoData,
    /// The fetch failed; the message is the rendered fetch error.
    FetchFailed(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::NoData => write!(f, "no data"),
            DropReason::FetchFailed(message) => write!(f, "fetch failed: {message}"),
        }
    }
}

/// Terminal state of one work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Already present in the output; no request was made.
    Skipped,
    /// A row was written. `degraded` marks rows with null-filled fields
    /// because a secondary fetch, or the fetch itself, failed.
    Committed { degraded: bool },
    /// No row was written; the item stays eligible for the next run.
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub committed: usize,
    pub degraded: usize,
    pub dropped: usize,
    pub checkpoints: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &ItemOutcome) {
        self.processed += 1;
        match outcome {
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Committed { degraded } => {
                self.committed += 1;
                if *degraded {
                    self.degraded += 1;
                }
            }
            ItemOutcome::Dropped(_) => self.dropped += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} committed={} degraded={} skipped={} dropped={} checkpoints={}",
            self.processed,
            self.committed,
            self.degraded,
            self.skipped,
            self.dropped,
            self.checkpoints
        )
    }
}
