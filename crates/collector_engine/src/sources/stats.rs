use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use collector_core::{AppId, Row, Schema, SchemaError};
use collector_logging::collector_warn;
use serde_json::Value;

use super::cell;
use crate::driver::{FetchedItem, ItemSource};
use crate::fetch::JsonFetcher;
use crate::resume::{read_table, ResumeError};
use crate::FetchError;

pub const DEFAULT_STATS_URL: &str = "https://steamspy.com/api.php";

/// Fields returned by the statistics API's `appdetails` request.
pub const STATS_FIELDS: [&str; 20] = [
    "appid",
    "name",
    "developer",
    "publisher",
    "score_rank",
    "positive",
    "negative",
    "userscore",
    "owners",
    "average_forever",
    "average_2weeks",
    "median_forever",
    "median_2weeks",
    "price",
    "initialprice",
    "discount",
    "ccu",
    "languages",
    "genre",
    "tags",
];

/// Input columns followed by every statistics field the input lacks.
pub fn stats_schema(input_fields: &[String], id_field: &str) -> Result<Arc<Schema>, SchemaError> {
    let extra = STATS_FIELDS
        .iter()
        .filter(|field| !input_fields.iter().any(|f| f == *field))
        .map(|field| field.to_string());
    Schema::new(input_fields.iter().cloned().chain(extra), id_field)
}

/// The store export the statistics job enriches, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsInput {
    pub fields: Vec<String>,
    pub id_field: String,
    pub records: Vec<(AppId, Vec<Option<String>>)>,
}

/// Reads the input CSV. Records whose identifier does not parse are skipped
/// with a warning.
pub fn read_stats_input(path: &Path, id_field: &str) -> Result<StatsInput, ResumeError> {
    let table = read_table(path)?.ok_or_else(|| ResumeError::EmptyInput(path.to_path_buf()))?;
    let id_idx = table
        .column(id_field)
        .ok_or_else(|| ResumeError::MissingColumn {
            path: path.to_path_buf(),
            column: id_field.to_string(),
        })?;

    let mut records = Vec::with_capacity(table.records.len());
    for cells in table.records {
        let appid = cells[id_idx]
            .as_deref()
            .and_then(|raw| raw.trim().parse::<AppId>().ok());
        match appid {
            Some(appid) => records.push((appid, cells)),
            None => collector_warn!(
                "Skipping input record with unusable {}: {:?}",
                id_field,
                cells[id_idx]
            ),
        }
    }

    Ok(StatsInput {
        fields: table.header,
        id_field: id_field.to_string(),
        records,
    })
}

/// Per-app statistics merged onto the input record.
pub struct StatsSource {
    fetcher: Arc<dyn JsonFetcher>,
    url: String,
    schema: Arc<Schema>,
    /// Statistics fields not already supplied by the input.
    added_fields: Vec<&'static str>,
    base_rows: HashMap<AppId, Row>,
    order: Vec<AppId>,
}

impl StatsSource {
    pub fn new(
        fetcher: Arc<dyn JsonFetcher>,
        url: impl Into<String>,
        input: &StatsInput,
    ) -> Result<Self, SchemaError> {
        let schema = stats_schema(&input.fields, &input.id_field)?;
        let added_fields = STATS_FIELDS
            .iter()
            .copied()
            .filter(|field| !input.fields.iter().any(|f| f == field))
            .collect();

        let mut base_rows = HashMap::with_capacity(input.records.len());
        let mut order = Vec::with_capacity(input.records.len());
        for (appid, cells) in &input.records {
            let row = Row::project(
                &schema,
                input.fields.iter().map(String::as_str).zip(cells.iter().cloned()),
            );
            base_rows.entry(*appid).or_insert(row);
            order.push(*appid);
        }

        Ok(Self {
            fetcher,
            url: url.into(),
            schema,
            added_fields,
            base_rows,
            order,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Identifiers in input order.
    pub fn work_items(&self) -> Vec<AppId> {
        self.order.clone()
    }

    pub async fn fetch_stats(&self, appid: AppId) -> Result<Value, FetchError> {
        self.fetcher
            .get_json(
                &self.url,
                &[
                    ("request", "appdetails".to_string()),
                    ("appid", appid.to_string()),
                ],
            )
            .await
    }

    fn merge(&self, appid: AppId, stats: &Value) -> Row {
        let mut row = self.placeholder_row(&appid);
        for field in &self.added_fields {
            let value = if *field == "tags" {
                cell::object_keys(stats, field)
            } else {
                cell::field(stats, field)
            };
            row.set(field, value);
        }
        row
    }
}

#[async_trait::async_trait]
impl ItemSource<AppId> for StatsSource {
    async fn fetch_item(&self, id: &AppId) -> Result<Option<FetchedItem>, FetchError> {
        let stats = self.fetch_stats(*id).await?;
        Ok(Some(FetchedItem {
            row: self.merge(*id, &stats),
            degraded: false,
        }))
    }

    fn placeholder_row(&self, id: &AppId) -> Row {
        self.base_rows
            .get(id)
            .cloned()
            .unwrap_or_else(|| Row::with_id(&self.schema, id))
    }
}
