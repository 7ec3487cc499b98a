// Grafana HTTP API client
use crate::application::monitoring_backend::MonitoringBackend;
use crate::domain::dashboard::{DashboardDescriptor, DashboardEnvelope};
use crate::domain::datasource::DatasourceDescriptor;
use crate::domain::error::PanelError;
use crate::domain::frame::QueryResponse;
use crate::domain::query::QueryRequest;
use crate::domain::search::{CatIndex, SearchRequest, SearchResponse};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GrafanaClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl GrafanaClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, PanelError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
    }

    fn proxy_url(&self, datasource_id: &str, path: &str) -> String {
        format!(
            "{}/api/datasources/proxy/{}/{}",
            self.base_url,
            urlencoding::encode(datasource_id),
            path
        )
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, PanelError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PanelError::BackendUnavailable(format!(
                "Grafana returned {}: {}",
                status, body
            )));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| PanelError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl MonitoringBackend for GrafanaClient {
    async fn get_dashboard(&self, uid: &str) -> Result<DashboardDescriptor, PanelError> {
        let url = format!(
            "{}/api/dashboards/uid/{}",
            self.base_url,
            urlencoding::encode(uid)
        );
        tracing::debug!("Fetching dashboard {}", uid);

        let response = self.authorized(self.client.get(&url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(PanelError::DashboardNotFound(uid.to_string()));
        }

        let envelope: DashboardEnvelope = Self::parse(response).await?;
        let dashboard = DashboardDescriptor::from_raw(uid, envelope.dashboard);
        tracing::debug!(
            "Dashboard {} ({}) has {} panels after flattening",
            dashboard.uid,
            dashboard.title,
            dashboard.panels.len()
        );
        Ok(dashboard)
    }

    async fn list_datasources(&self) -> Result<Vec<DatasourceDescriptor>, PanelError> {
        let url = format!("{}/api/datasources", self.base_url);
        let response = self.authorized(self.client.get(&url)).send().await?;
        Self::parse(response).await
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, PanelError> {
        let url = format!("{}/api/ds/query", self.base_url);
        let response = self
            .authorized(self.client.post(&url))
            .json(request)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn get_datasource(&self, datasource_id: &str) -> Result<DatasourceDescriptor, PanelError> {
        let url = format!(
            "{}/api/datasources/{}",
            self.base_url,
            urlencoding::encode(datasource_id)
        );
        let response = self.authorized(self.client.get(&url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(PanelError::DatasourceNotFound(datasource_id.to_string()));
        }
        Self::parse(response).await
    }

    async fn list_indices(&self, datasource_id: &str) -> Result<Vec<String>, PanelError> {
        let url = self.proxy_url(datasource_id, "_cat/indices?format=json");
        let response = self.authorized(self.client.get(&url)).send().await?;
        let indices: Vec<CatIndex> = Self::parse(response).await?;
        Ok(indices.into_iter().map(|i| i.index).collect())
    }

    async fn index_mapping(&self, datasource_id: &str, index: &str) -> Result<Value, PanelError> {
        let path = format!("{}/_mapping", urlencoding::encode(index));
        let url = self.proxy_url(datasource_id, &path);
        let response = self.authorized(self.client.get(&url)).send().await?;
        Self::parse(response).await
    }

    async fn search(
        &self,
        datasource_id: &str,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, PanelError> {
        let path = format!("{}/_search", urlencoding::encode(index));
        let url = self.proxy_url(datasource_id, &path);
        tracing::debug!("Searching {} on datasource {}", index, datasource_id);
        let response = self
            .authorized(self.client.post(&url))
            .json(request)
            .send()
            .await?;
        Self::parse(response).await
    }
}
