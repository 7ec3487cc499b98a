// HTTP request handlers
use crate::application::index_export_service::IndexExportRequest;
use crate::application::panel_service::PanelSelection;
use crate::application::report_service::{GeneratedReport, ReportError, ReportRequest};
use crate::domain::error::PanelError;
use crate::domain::query::{TimeRange, DEFAULT_FROM, DEFAULT_TO};
use crate::infrastructure::http_response::xlsx_attachment_response;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct PanelsQuery {
    pub dashboard_uid: String,
}

#[derive(Deserialize)]
pub struct PanelDataQuery {
    pub dashboard_uid: String,
    pub panel_id: i64,
    pub from_time: Option<String>,
    pub to_time: Option<String>,
}

#[derive(Deserialize)]
pub struct IndicesQuery {
    pub datasource_id: String,
}

#[derive(Deserialize)]
pub struct FieldsQuery {
    pub datasource_id: String,
    pub index: String,
}

#[derive(Deserialize)]
pub struct GenerateReportBody {
    #[serde(default)]
    pub dashboards: Vec<PanelSelection>,
    pub time_range: TimeRange,
    pub report_title: Option<String>,
    pub company_name: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

fn error_status(err: &PanelError) -> StatusCode {
    match err {
        PanelError::DashboardNotFound(_)
        | PanelError::PanelNotFound
        | PanelError::DatasourceNotFound(_) => StatusCode::NOT_FOUND,
        PanelError::UnsupportedDatasource(_) | PanelError::NoFieldsSelected => {
            StatusCode::BAD_REQUEST
        }
        PanelError::BackendUnavailable(_) | PanelError::Timeout(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn report_response(outcome: Result<GeneratedReport, ReportError>) -> Response {
    match outcome {
        Ok(report) => {
            tracing::debug!("Report {} covers {} items", report.filename, report.item_count);
            match xlsx_attachment_response(report.content, &report.filename) {
                Ok(response) => response,
                Err(status) => status.into_response(),
            }
        }
        Err(e) => {
            tracing::error!("Error generating report: {}", e);
            let status = match &e {
                ReportError::Backend(err) => error_status(err),
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, e.to_string()).into_response()
        }
    }
}

/// Flattened panels of a dashboard
pub async fn list_panels(
    Query(query): Query<PanelsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.panel_service.list_panels(&query.dashboard_uid).await {
        Ok(panels) => Json(json!({ "panels": panels })).into_response(),
        Err(e) => {
            tracing::error!("Error listing panels of {}: {}", query.dashboard_uid, e);
            (error_status(&e), e.to_string()).into_response()
        }
    }
}

/// Normalized data of a single panel; failures are reported inside the body
pub async fn panel_data(
    Query(query): Query<PanelDataQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let time_range = TimeRange::new(
        query.from_time.unwrap_or_else(|| DEFAULT_FROM.to_string()),
        query.to_time.unwrap_or_else(|| DEFAULT_TO.to_string()),
    );

    let result = state
        .panel_service
        .fetch_panel_data(&query.dashboard_uid, query.panel_id, &time_range)
        .await;

    Json(json!({
        "panel_info": result.panel,
        "fields": result.fields,
        "row_count": result.row_count(),
        "rows": result.rows,
        "time_range": time_range,
    }))
    .into_response()
}

/// Build a spreadsheet from panels across one or more dashboards
pub async fn generate_from_panels(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerateReportBody>,
) -> Response {
    let request = ReportRequest {
        selections: body.dashboards,
        time_range: body.time_range,
        title: body.report_title,
        company_name: body.company_name,
    };

    report_response(state.report_service.generate_from_panels(request).await)
}

/// Indices behind a search datasource
pub async fn list_indices(
    Query(query): Query<IndicesQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.export_service.list_indices(&query.datasource_id).await {
        Ok(indices) => Json(json!({ "indices": indices })).into_response(),
        Err(e) => {
            tracing::error!("Error listing indices of {}: {}", query.datasource_id, e);
            (error_status(&e), e.to_string()).into_response()
        }
    }
}

/// Flattened field list of an index
pub async fn list_fields(
    Query(query): Query<FieldsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state
        .export_service
        .list_fields(&query.datasource_id, &query.index)
        .await
    {
        Ok(fields) => Json(json!({ "fields": fields })).into_response(),
        Err(e) => {
            tracing::error!("Error listing fields of {}: {}", query.index, e);
            (error_status(&e), e.to_string()).into_response()
        }
    }
}

/// Export the selected fields of matching documents as a single-sheet spreadsheet
pub async fn generate_export(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IndexExportRequest>,
) -> Response {
    report_response(state.export_service.generate_report(body).await)
}
