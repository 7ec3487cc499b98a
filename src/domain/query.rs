// Query domain models: panel targets, backend queries and time ranges
use super::dashboard::RawDatasource;
use super::datasource::DatasourceRef;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_FROM: &str = "now-24h";
pub const DEFAULT_TO: &str = "now";

/// A panel target as stored in the dashboard JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTarget {
    #[serde(default)]
    pub ref_id: Option<String>,
    #[serde(default)]
    pub hide: Option<bool>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub alias: Option<Value>,
    #[serde(default)]
    pub bucket_aggs: Option<Vec<BucketAgg>>,
    #[serde(default)]
    pub metrics: Option<Value>,
    #[serde(default)]
    pub time_field: Option<Value>,
    #[serde(default)]
    pub format: Option<Value>,
    #[serde(default)]
    pub query_type: Option<Value>,
    #[serde(default)]
    pub lucene_query_type: Option<Value>,
    #[serde(default)]
    pub datasource: Option<RawDatasource>,
}

impl QueryTarget {
    pub fn is_hidden(&self) -> bool {
        self.hide.unwrap_or(false)
    }
}

/// Bucket aggregation; only `settings` is interpreted, the rest is forwarded as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketAgg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl BucketAgg {
    /// Convert digit-only string settings (`"size": "10"`) into integers.
    pub fn normalize_settings(&mut self) {
        let Some(settings) = self.settings.as_mut() else {
            return;
        };

        for value in settings.values_mut() {
            let parsed = match value {
                Value::String(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) => {
                    s.parse::<u64>().ok()
                }
                _ => None,
            };
            if let Some(number) = parsed {
                *value = Value::from(number);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendQuery {
    pub ref_id: String,
    pub datasource: DatasourceRef,
    pub datasource_id: i64,
    pub interval_ms: u64,
    pub max_data_points: u64,
    pub panel_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_aggs: Option<Vec<BucketAgg>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_field: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lucene_query_type: Option<Value>,
}

/// Body of `POST /api/ds/query`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub from: String,
    pub to: String,
    pub queries: Vec<BackendQuery>,
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default = "default_from")]
    pub from: String,
    #[serde(default = "default_to")]
    pub to: String,
}

fn default_from() -> String {
    DEFAULT_FROM.to_string()
}

fn default_to() -> String {
    DEFAULT_TO.to_string()
}

impl Default for TimeRange {
    fn default() -> Self {
        Self {
            from: default_from(),
            to: default_to(),
        }
    }
}

impl TimeRange {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Bounds in the form the query endpoint accepts.
    pub fn normalized(&self) -> (String, String) {
        (normalize_time_bound(&self.from), normalize_time_bound(&self.to))
    }
}

/// Relative expressions pass through; absolute instants become epoch milliseconds.
pub fn normalize_time_bound(bound: &str) -> String {
    if bound.starts_with("now") {
        return bound.to_string();
    }

    match parse_instant_ms(bound) {
        Some(ms) => ms.to_string(),
        None => {
            tracing::debug!("Could not parse time bound {:?}, passing through", bound);
            bound.to_string()
        }
    }
}

// Naive date-times and bare dates are read as UTC.
fn parse_instant_ms(bound: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(bound) {
        return Some(dt.timestamp_millis());
    }

    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(bound, pattern) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }

    NaiveDate::parse_from_str(bound, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}
