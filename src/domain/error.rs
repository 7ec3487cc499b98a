// Error taxonomy for the panel pipeline
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("Dashboard {0} not found")]
    DashboardNotFound(String),

    #[error("Panel not found")]
    PanelNotFound,

    #[error("No query targets")]
    NoTargets,

    #[error("No {0} datasource found")]
    NoDatasource(String),

    #[error("No valid queries")]
    NoQueries,

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend query timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Query {ref_id} failed: {message}")]
    QueryRejected { ref_id: String, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Datasource {0} not found")]
    DatasourceNotFound(String),

    #[error("Unsupported datasource type: {0}")]
    UnsupportedDatasource(String),

    #[error("No fields selected")]
    NoFieldsSelected,
}

impl From<reqwest::Error> for PanelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PanelError::MalformedResponse(err.to_string())
        } else {
            PanelError::BackendUnavailable(err.to_string())
        }
    }
}

/// Failure of a whole batch; per-panel failures never surface here.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to fetch data for any of the selected panels")]
    NothingResolved,
}
