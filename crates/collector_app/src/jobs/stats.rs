//! Statistics job: enrich each row of the store export with per-app
//! statistics and rewrite the merged table periodically.

use std::sync::Arc;

use anyhow::Context;
use collector_core::{AppId, RunSummary};
use collector_engine::{
    load_progress, load_rows, read_stats_input, run, DriverOptions, FailurePolicy, HttpFetcher,
    RewriteSink, SortOrder, StatsSource,
};
use collector_logging::{collector_info, collector_warn};

use crate::config::{HttpConfig, StatsJobConfig};

const ID_FIELD: &str = "appid";

pub async fn execute(config: &StatsJobConfig, http: &HttpConfig) -> anyhow::Result<RunSummary> {
    let input = read_stats_input(&config.input, ID_FIELD)
        .with_context(|| format!("reading input {}", config.input.display()))?;
    collector_info!(
        "Read {} apps from {}",
        input.records.len(),
        config.input.display()
    );

    let fetcher = HttpFetcher::new(config.fetch_settings(http)).context("building HTTP client")?;
    let source = StatsSource::new(Arc::new(fetcher), config.url.clone(), &input)?;
    let schema = source.schema();

    let progress = load_progress::<AppId>(&config.output, ID_FIELD)?;
    let existing = load_rows::<AppId>(&config.output, schema)?;
    collector_info!(
        "Found {} apps already in {}",
        progress.len(),
        config.output.display()
    );

    let mut sink = RewriteSink::new(&config.output, schema, existing)?;
    if let Some(field) = &config.sort_by {
        if schema.index_of(field).is_some() {
            sink = sink.with_final_order(SortOrder::descending(field.clone()));
        } else {
            collector_warn!("Sort field {} is not an output column; leaving input order", field);
        }
    }

    let options = DriverOptions {
        checkpoint_every: Some(config.checkpoint_every),
        on_error: FailurePolicy::NullFill,
        report_every: config.report_every,
    };
    let summary = run(source.work_items(), progress, &source, &mut sink, &options).await?;
    Ok(summary)
}
