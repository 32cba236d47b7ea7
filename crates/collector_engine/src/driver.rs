use collector_core::{DropReason, ItemOutcome, ProgressSet, Row, RunSummary, WorkId};
use collector_logging::{collector_debug, collector_info, collector_warn};

use crate::checkpoint::{CheckpointError, RowSink};
use crate::FetchError;

/// A row produced for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedItem {
    pub row: Row,
    /// A secondary lookup failed and its fields were left null.
    pub degraded: bool,
}

/// Per-identifier fetch plus transform.
#[async_trait::async_trait]
pub trait ItemSource<I: WorkId>: Send + Sync {
    /// `Ok(None)` means the upstream has no data for `id`; the item is
    /// dropped without error.
    async fn fetch_item(&self, id: &I) -> Result<Option<FetchedItem>, FetchError>;

    /// Row committed under [`FailurePolicy::NullFill`] when the fetch fails.
    fn placeholder_row(&self, id: &I) -> Row;
}

/// What to do with an item whose fetch returned an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Write nothing; the item is fetched again on the next run.
    #[default]
    Drop,
    /// Commit the source's placeholder row with null fields.
    NullFill,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOptions {
    /// Call [`RowSink::checkpoint`] after this many items that were not
    /// skipped.
    pub checkpoint_every: Option<usize>,
    pub on_error: FailurePolicy,
    /// Log a progress line after this many committed rows; 0 disables it.
    pub report_every: usize,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            checkpoint_every: None,
            on_error: FailurePolicy::Drop,
            report_every: 100,
        }
    }
}

/// Processes `items` in order, one at a time.
///
/// Items in `progress` are skipped without a request, as are repeats of items
/// committed earlier in the same run. Fetch errors never abort the run; only
/// sink errors do. The sink is finished once all items are processed.
pub async fn run<I, S>(
    items: impl IntoIterator<Item = I>,
    mut progress: ProgressSet<I>,
    source: &S,
    sink: &mut dyn RowSink,
    options: &DriverOptions,
) -> Result<RunSummary, CheckpointError>
where
    I: WorkId,
    S: ItemSource<I> + ?Sized,
{
    let mut summary = RunSummary::default();

    for id in items {
        let outcome = process_item(&id, &mut progress, source, sink, options.on_error).await?;
        match &outcome {
            ItemOutcome::Skipped => collector_debug!("Skipping {} as already done", id),
            ItemOutcome::Committed { degraded: false } => collector_debug!("Committed {}", id),
            ItemOutcome::Committed { degraded: true } => {
                collector_debug!("Committed {} with missing fields", id)
            }
            ItemOutcome::Dropped(reason) => collector_info!("Dropped {}: {}", id, reason),
        }
        summary.record(&outcome);

        if let ItemOutcome::Committed { .. } = outcome {
            if options.report_every > 0 && summary.committed % options.report_every == 0 {
                collector_info!("Processed {} new items...", summary.committed);
            }
        }

        if outcome == ItemOutcome::Skipped {
            continue;
        }
        let handled = summary.processed - summary.skipped;
        if let Some(every) = options.checkpoint_every.filter(|n| *n > 0) {
            if handled % every == 0 {
                sink.checkpoint()?;
                summary.checkpoints += 1;
                collector_info!("Checkpoint after {} new items", handled);
            }
        }
    }

    sink.finish()?;
    collector_info!("Run complete: {}", summary);
    Ok(summary)
}

async fn process_item<I, S>(
    id: &I,
    progress: &mut ProgressSet<I>,
    source: &S,
    sink: &mut dyn RowSink,
    on_error: FailurePolicy,
) -> Result<ItemOutcome, CheckpointError>
where
    I: WorkId,
    S: ItemSource<I> + ?Sized,
{
    if progress.contains(id) {
        return Ok(ItemOutcome::Skipped);
    }

    let (row, degraded) = match source.fetch_item(id).await {
        Ok(Some(item)) => (item.row, item.degraded),
        Ok(None) => return Ok(ItemOutcome::Dropped(DropReason::NoData)),
        Err(err) => {
            collector_warn!("Fetch failed for {}: {}", id, err);
            match on_error {
                FailurePolicy::Drop => {
                    return Ok(ItemOutcome::Dropped(DropReason::FetchFailed(
                        err.to_string(),
                    )))
                }
                FailurePolicy::NullFill => (source.placeholder_row(id), true),
            }
        }
    };

    sink.commit(row)?;
    progress.insert(id.clone());
    Ok(ItemOutcome::Committed { degraded })
}
