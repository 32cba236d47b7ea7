//! Store job: list every app, fetch store details and review summary, append
//! one row per app.

use std::sync::Arc;

use anyhow::Context;
use collector_core::{AppId, RunSummary};
use collector_engine::{
    load_progress, run, AppendSink, DriverOptions, FailurePolicy, HttpFetcher, StoreSource,
};
use collector_logging::collector_info;

use crate::config::{HttpConfig, StoreJobConfig};

pub async fn execute(config: &StoreJobConfig, http: &HttpConfig) -> anyhow::Result<RunSummary> {
    let fetcher = HttpFetcher::new(config.fetch_settings(http)).context("building HTTP client")?;
    let source = StoreSource::new(Arc::new(fetcher), config.endpoints())?;
    // Repairs an interrupted tail and rejects a foreign header before any
    // request is made.
    let mut sink = AppendSink::open(&config.output, source.schema())
        .with_context(|| format!("opening {}", config.output.display()))?;

    let apps = source
        .fetch_app_list()
        .await
        .context("fetching the app list")?;
    collector_info!("Listed {} apps", apps.len());

    let mut ids: Vec<AppId> = apps.into_iter().map(|app| app.appid).collect();
    if let Some(limit) = config.limit {
        ids.truncate(limit);
        collector_info!("Limiting run to the first {} apps", ids.len());
    }

    let progress = load_progress::<AppId>(&config.output, source.schema().id_field())?;
    collector_info!("Found {} apps already in CSV.", progress.len());

    let options = DriverOptions {
        checkpoint_every: None,
        on_error: FailurePolicy::Drop,
        report_every: config.report_every,
    };
    let summary = run(ids, progress, &source, &mut sink, &options).await?;
    Ok(summary)
}
