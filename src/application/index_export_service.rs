// Index export service - Use case for browsing search indices and exporting hits
use crate::application::monitoring_backend::MonitoringBackend;
use crate::application::report_service::{report_filename, GeneratedReport, ReportError};
use crate::domain::error::PanelError;
use crate::domain::search::{
    build_search_query, hits_to_rows, mapping_fields, IndexField, SearchRequest,
    SEARCH_DATASOURCE_TYPES,
};
use crate::infrastructure::xlsx_report::build_index_workbook;
use chrono::Local;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
pub struct IndexExportRequest {
    pub datasource_id: String,
    pub index: String,
    pub fields: Vec<String>,
    #[serde(default)]
    pub filters: Map<String, Value>,
    pub report_title: Option<String>,
}

#[derive(Clone)]
pub struct IndexExportService {
    backend: Arc<dyn MonitoringBackend>,
    max_hits: u64,
    default_title: String,
}

impl IndexExportService {
    pub fn new(backend: Arc<dyn MonitoringBackend>, max_hits: u64, default_title: String) -> Self {
        Self {
            backend,
            max_hits,
            default_title,
        }
    }

    /// Indices of an Elasticsearch or OpenSearch datasource
    pub async fn list_indices(&self, datasource_id: &str) -> Result<Vec<String>, PanelError> {
        let datasource = self.backend.get_datasource(datasource_id).await?;
        if !SEARCH_DATASOURCE_TYPES.contains(&datasource.kind.as_str()) {
            return Err(PanelError::UnsupportedDatasource(datasource.kind));
        }

        tracing::debug!(
            "Listing indices of {} ({}, id {})",
            datasource.name,
            datasource.kind,
            datasource.id
        );
        self.backend
            .list_indices(&datasource.id.to_string())
            .await
    }

    /// Flattened, sorted field list of an index
    pub async fn list_fields(
        &self,
        datasource_id: &str,
        index: &str,
    ) -> Result<Vec<IndexField>, PanelError> {
        let mapping = self.backend.index_mapping(datasource_id, index).await?;
        Ok(mapping_fields(&mapping))
    }

    /// Rows of the selected fields for every hit matching the filters
    pub async fn fetch_rows(
        &self,
        datasource_id: &str,
        index: &str,
        fields: &[String],
        filters: &Map<String, Value>,
    ) -> Result<Vec<Vec<Value>>, PanelError> {
        if fields.is_empty() {
            return Err(PanelError::NoFieldsSelected);
        }

        let request = SearchRequest {
            query: build_search_query(filters),
            source: fields.to_vec(),
            size: self.max_hits,
        };
        let response = self.backend.search(datasource_id, index, &request).await?;

        let hits = &response.hits.hits;
        if hits.len() as u64 >= self.max_hits {
            tracing::warn!(
                "Export of {} hit the {} document limit, results are truncated",
                index,
                self.max_hits
            );
        }
        Ok(hits_to_rows(hits, fields))
    }

    pub async fn generate_report(
        &self,
        request: IndexExportRequest,
    ) -> Result<GeneratedReport, ReportError> {
        let rows = self
            .fetch_rows(
                &request.datasource_id,
                &request.index,
                &request.fields,
                &request.filters,
            )
            .await?;

        let title = request
            .report_title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.default_title.clone());
        let now = Local::now();
        let generated_at = now.format("%Y-%m-%d %H:%M:%S").to_string();

        let content = build_index_workbook(&title, &generated_at, &request.fields, &rows)?;
        let filename = report_filename(&title, &now);

        tracing::info!("Generated export {} with {} rows", filename, rows.len());
        Ok(GeneratedReport {
            filename,
            content,
            item_count: rows.len(),
        })
    }
}
