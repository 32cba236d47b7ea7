use std::sync::Arc;

use collector_core::{AppId, Row, Schema, SchemaError};
use collector_logging::{collector_debug, collector_warn};
use serde::Deserialize;
use serde_json::Value;

use super::cell;
use crate::driver::{FetchedItem, ItemSource};
use crate::fetch::JsonFetcher;
use crate::{FailureKind, FetchError};

/// Output columns of the store collection job.
pub const STORE_FIELDS: [&str; 19] = [
    "appid",
    "name",
    "type",
    "is_free",
    "price_initial",
    "price_final",
    "short_description",
    "release_date",
    "developers",
    "publishers",
    "genres",
    "categories",
    "metacritic_score",
    "dlc",
    "num_reviews",
    "review_score",
    "positive_total",
    "negative_total",
    "total_reviews",
];

pub fn store_schema() -> Result<Arc<Schema>, SchemaError> {
    Schema::new(STORE_FIELDS, "appid")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEndpoints {
    pub app_list_url: String,
    pub details_url: String,
    /// The app id is appended as a path segment.
    pub reviews_url: String,
}

impl Default for StoreEndpoints {
    fn default() -> Self {
        Self {
            app_list_url: "https://api.steampowered.com/ISteamApps/GetAppList/v2/".to_string(),
            details_url: "https://store.steampowered.com/api/appdetails".to_string(),
            reviews_url: "https://store.steampowered.com/appreviews".to_string(),
        }
    }
}

impl StoreEndpoints {
    /// All three endpoints on one host, with the storefront's paths.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            app_list_url: format!("{base}/ISteamApps/GetAppList/v2/"),
            details_url: format!("{base}/api/appdetails"),
            reviews_url: format!("{base}/appreviews"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppListEntry {
    pub appid: AppId,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct AppListResponse {
    applist: AppList,
}

#[derive(Debug, Deserialize)]
struct AppList {
    apps: Vec<AppListEntry>,
}

/// Aggregate review counts from the review endpoint's `query_summary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReviewSummary {
    pub num_reviews: u64,
    pub review_score: Option<i64>,
    pub positive_total: u64,
    pub negative_total: u64,
    pub total_reviews: u64,
}

impl ReviewSummary {
    fn from_query_summary(summary: &Value) -> Self {
        let count = |key: &str| summary.get(key).and_then(Value::as_u64).unwrap_or(0);
        Self {
            num_reviews: count("num_reviews"),
            review_score: summary.get("review_score").and_then(Value::as_i64),
            positive_total: count("total_positive"),
            negative_total: count("total_negative"),
            total_reviews: count("total_reviews"),
        }
    }
}

/// Store details plus review summary, one row per app.
pub struct StoreSource {
    fetcher: Arc<dyn JsonFetcher>,
    endpoints: StoreEndpoints,
    schema: Arc<Schema>,
}

impl StoreSource {
    pub fn new(fetcher: Arc<dyn JsonFetcher>, endpoints: StoreEndpoints) -> Result<Self, SchemaError> {
        Ok(Self {
            fetcher,
            endpoints,
            schema: store_schema()?,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Every listed app. A failed request is an error, never an empty list.
    pub async fn fetch_app_list(&self) -> Result<Vec<AppListEntry>, FetchError> {
        let value = self.fetcher.get_json(&self.endpoints.app_list_url, &[]).await?;
        let response: AppListResponse = serde_json::from_value(value)
            .map_err(|err| FetchError::new(FailureKind::MalformedBody, err.to_string()))?;
        Ok(response.applist.apps)
    }

    /// The `data` object for `appid`, or `None` when the store reports no
    /// successful lookup.
    pub async fn fetch_app_details(&self, appid: AppId) -> Result<Option<Value>, FetchError> {
        let mut value = self
            .fetcher
            .get_json(&self.endpoints.details_url, &[("appids", appid.to_string())])
            .await?;
        let Some(entry) = value.get_mut(appid.to_string()) else {
            return Ok(None);
        };
        if entry.get("success").and_then(Value::as_bool) != Some(true) {
            return Ok(None);
        }
        Ok(entry.get_mut("data").map(Value::take))
    }

    pub async fn fetch_review_summary(&self, appid: AppId) -> Result<Option<ReviewSummary>, FetchError> {
        let url = format!(
            "{}/{}",
            self.endpoints.reviews_url.trim_end_matches('/'),
            appid
        );
        let value = self
            .fetcher
            .get_json(
                &url,
                &[
                    ("json", "1".to_string()),
                    ("language", "all".to_string()),
                    ("purchase_type", "all".to_string()),
                ],
            )
            .await?;
        if value.get("success").and_then(Value::as_i64) != Some(1) {
            return Ok(None);
        }
        let summary = value
            .get("query_summary")
            .map(ReviewSummary::from_query_summary)
            .unwrap_or_default();
        Ok(Some(summary))
    }
}

#[async_trait::async_trait]
impl ItemSource<AppId> for StoreSource {
    async fn fetch_item(&self, id: &AppId) -> Result<Option<FetchedItem>, FetchError> {
        let Some(details) = self.fetch_app_details(*id).await? else {
            collector_debug!("No store details for {}", id);
            return Ok(None);
        };

        let reviews = match self.fetch_review_summary(*id).await {
            Ok(reviews) => reviews,
            Err(err) => {
                collector_warn!("Review lookup failed for {}: {}", id, err);
                None
            }
        };

        Ok(Some(FetchedItem {
            row: store_row(&self.schema, *id, &details, reviews.as_ref()),
            degraded: reviews.is_none(),
        }))
    }

    fn placeholder_row(&self, id: &AppId) -> Row {
        Row::with_id(&self.schema, id)
    }
}

/// Maps a store `data` object and optional review summary onto the store
/// schema. Absent fields and empty lists are null.
pub fn store_row(
    schema: &Arc<Schema>,
    appid: AppId,
    details: &Value,
    reviews: Option<&ReviewSummary>,
) -> Row {
    let mut row = Row::with_id(schema, appid);
    row.set("name", cell::field(details, "name"));
    row.set("type", cell::field(details, "type"));
    row.set("is_free", cell::field(details, "is_free"));
    row.set("price_initial", cell::nested(details, "price_overview", "initial"));
    row.set("price_final", cell::nested(details, "price_overview", "final"));
    row.set("short_description", cell::field(details, "short_description"));
    row.set("release_date", cell::nested(details, "release_date", "date"));
    row.set("developers", cell::field(details, "developers"));
    row.set("publishers", cell::field(details, "publishers"));
    row.set("genres", cell::descriptions(details, "genres"));
    row.set("categories", cell::descriptions(details, "categories"));
    row.set("metacritic_score", cell::nested(details, "metacritic", "score"));
    row.set("dlc", cell::field(details, "dlc"));

    if let Some(reviews) = reviews {
        row.set("num_reviews", Some(reviews.num_reviews.to_string()));
        row.set("review_score", reviews.review_score.map(|s| s.to_string()));
        row.set("positive_total", Some(reviews.positive_total.to_string()));
        row.set("negative_total", Some(reviews.negative_total.to_string()));
        row.set("total_reviews", Some(reviews.total_reviews.to_string()));
    }
    row
}
