// Panel data service - Use case for fetching and normalizing panel data
use crate::application::aggregator::aggregate;
use crate::application::monitoring_backend::MonitoringBackend;
use crate::application::query_builder::QueryBuilder;
use crate::domain::dashboard::{DashboardDescriptor, PanelDescriptor, PanelSummary};
use crate::domain::datasource::resolve_default;
use crate::domain::error::{BatchError, PanelError};
use crate::domain::frame::normalize_frames;
use crate::domain::panel_result::{PanelInfo, PanelResult};
use crate::domain::query::TimeRange;
use crate::infrastructure::config::QuerySettings;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Panels requested from one dashboard.
#[derive(Debug, Clone, Deserialize)]
pub struct PanelSelection {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub panels: Vec<i64>,
}

#[cfg(test)]
impl PanelSelection {
    pub fn new(uid: impl Into<String>, panels: Vec<i64>) -> Self {
        Self {
            uid: uid.into(),
            panels,
        }
    }
}

struct PanelOutcome {
    result: PanelResult,
    /// Whether the panel definition was located before anything failed
    resolved: bool,
}

#[derive(Clone)]
pub struct PanelDataService {
    backend: Arc<dyn MonitoringBackend>,
    query_builder: QueryBuilder,
    datasource_type: String,
    query_timeout: Duration,
    max_concurrency: usize,
}

impl PanelDataService {
    pub fn new(backend: Arc<dyn MonitoringBackend>, settings: &QuerySettings) -> Self {
        Self {
            backend,
            query_builder: QueryBuilder::new(settings.interval_ms, settings.max_data_points),
            datasource_type: settings.datasource_type.clone(),
            query_timeout: Duration::from_secs(settings.timeout_secs),
            max_concurrency: settings.max_concurrency.max(1),
        }
    }

    /// Flattened panel list of a dashboard, for panel pickers
    pub async fn list_panels(&self, dashboard_uid: &str) -> Result<Vec<PanelSummary>, PanelError> {
        let dashboard = self.backend.get_dashboard(dashboard_uid).await?;
        Ok(dashboard.panels.iter().map(PanelDescriptor::summary).collect())
    }

    /// Fetch one panel. Failures come back as an error placeholder, never as `Err`.
    pub async fn fetch_panel_data(
        &self,
        dashboard_uid: &str,
        panel_id: i64,
        time_range: &TimeRange,
    ) -> PanelResult {
        self.fetch_outcome(dashboard_uid, panel_id, time_range)
            .await
            .result
    }

    /// Fetch many panels concurrently, returning results in request order.
    pub async fn fetch_batch(
        &self,
        selections: &[PanelSelection],
        time_range: &TimeRange,
    ) -> Result<Vec<PanelResult>, BatchError> {
        let units: Vec<(String, i64)> = selections
            .iter()
            .filter(|s| !s.uid.is_empty())
            .flat_map(|s| s.panels.iter().map(move |id| (s.uid.clone(), *id)))
            .collect();

        if units.is_empty() {
            return Err(BatchError::NothingResolved);
        }

        tracing::info!(
            "Fetching {} panels (concurrency {})",
            units.len(),
            self.max_concurrency
        );

        let outcomes: Vec<PanelOutcome> = stream::iter(units)
            .map(move |(uid, panel_id)| async move {
                self.fetch_outcome(&uid, panel_id, time_range).await
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        if outcomes.iter().all(|o| !o.resolved) {
            return Err(BatchError::NothingResolved);
        }

        Ok(outcomes.into_iter().map(|o| o.result).collect())
    }

    async fn fetch_outcome(
        &self,
        dashboard_uid: &str,
        panel_id: i64,
        time_range: &TimeRange,
    ) -> PanelOutcome {
        let dashboard = match self.backend.get_dashboard(dashboard_uid).await {
            Ok(dashboard) => dashboard,
            Err(e) => {
                tracing::error!("Error fetching dashboard {}: {}", dashboard_uid, e);
                return PanelOutcome {
                    result: PanelResult::error(PanelInfo::unknown(panel_id), e.to_string()),
                    resolved: false,
                };
            }
        };

        let Some(panel) = dashboard.find_panel(panel_id) else {
            tracing::warn!("Panel {} not found in dashboard {}", panel_id, dashboard_uid);
            return PanelOutcome {
                result: PanelResult::error(
                    PanelInfo::unknown(panel_id),
                    PanelError::PanelNotFound.to_string(),
                ),
                resolved: false,
            };
        };

        let result = match self.run_panel(&dashboard, panel, time_range).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    "Error fetching panel {} from dashboard {}: {}",
                    panel_id,
                    dashboard_uid,
                    e
                );
                PanelResult::error(PanelInfo::from_panel(panel), e.to_string())
            }
        };

        PanelOutcome {
            result,
            resolved: true,
        }
    }

    async fn run_panel(
        &self,
        dashboard: &DashboardDescriptor,
        panel: &PanelDescriptor,
        time_range: &TimeRange,
    ) -> Result<PanelResult, PanelError> {
        if panel.targets.is_empty() {
            return Err(PanelError::NoTargets);
        }

        let datasources = self.backend.list_datasources().await?;
        let datasource = resolve_default(&self.datasource_type, &datasources)?;

        let queries = self
            .query_builder
            .build_queries(panel, datasource, &dashboard.templating);
        if queries.is_empty() {
            return Err(PanelError::NoQueries);
        }

        let primary_ref_id = queries[0].ref_id.clone();
        let request = self.query_builder.build_request(panel.id, queries, time_range);
        tracing::debug!(
            "Query payload for panel {}: {}",
            panel.id,
            serde_json::to_string(&request).unwrap_or_default()
        );

        let response = tokio::time::timeout(self.query_timeout, self.backend.query(&request))
            .await
            .map_err(|_| PanelError::Timeout(self.query_timeout))??;

        let info = PanelInfo::from_panel(panel);
        let frames = response.primary_frames(Some(&primary_ref_id))?;
        if frames.is_empty() {
            tracing::warn!("No frames for panel {} ({})", panel.id, panel.title);
            return Ok(PanelResult {
                fields: Vec::new(),
                rows: Vec::new(),
                summary: None,
                panel: info,
            });
        }

        let table = normalize_frames(frames);
        let aggregated = aggregate(&panel.panel_type, frames, table)?;
        tracing::debug!(
            "Panel {} normalized to {} fields, {} rows",
            panel.id,
            aggregated.fields.len(),
            aggregated.rows.len()
        );

        Ok(PanelResult {
            fields: aggregated.fields,
            rows: aggregated.rows,
            summary: aggregated.summary,
            panel: info,
        })
    }
}
