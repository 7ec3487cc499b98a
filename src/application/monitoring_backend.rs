// Backend trait for dashboard, datasource, query and index access
use crate::domain::dashboard::DashboardDescriptor;
use crate::domain::datasource::DatasourceDescriptor;
use crate::domain::error::PanelError;
use crate::domain::frame::QueryResponse;
use crate::domain::query::QueryRequest;
use crate::domain::search::{SearchRequest, SearchResponse};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait MonitoringBackend: Send + Sync {
    /// Fetch a dashboard with its panels already flattened
    async fn get_dashboard(&self, uid: &str) -> Result<DashboardDescriptor, PanelError>;

    /// List every datasource configured on the backend
    async fn list_datasources(&self) -> Result<Vec<DatasourceDescriptor>, PanelError>;

    /// Execute a batch of panel queries
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, PanelError>;

    async fn get_datasource(&self, datasource_id: &str) -> Result<DatasourceDescriptor, PanelError>;

    /// Index names behind a search datasource, via the datasource proxy
    async fn list_indices(&self, datasource_id: &str) -> Result<Vec<String>, PanelError>;

    /// Raw `_mapping` document of an index
    async fn index_mapping(&self, datasource_id: &str, index: &str) -> Result<Value, PanelError>;

    async fn search(
        &self,
        datasource_id: &str,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, PanelError>;
}
