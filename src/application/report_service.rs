// Report service - Use case for turning selected panels into a spreadsheet
use crate::application::panel_service::{PanelDataService, PanelSelection};
use crate::domain::error::{BatchError, PanelError};
use crate::domain::query::TimeRange;
use crate::infrastructure::xlsx_report::{build_panels_workbook, ReportMeta};
use chrono::{DateTime, Local, TimeZone};
use thiserror::Error;

const GENERATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const FILENAME_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Backend(#[from] PanelError),

    #[error("Failed to render spreadsheet: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
}

#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub selections: Vec<PanelSelection>,
    pub time_range: TimeRange,
    pub title: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub filename: String,
    pub content: Vec<u8>,
    /// Panels or rows the report covers
    pub item_count: usize,
}

#[derive(Clone)]
pub struct ReportService {
    panel_service: PanelDataService,
    default_title: String,
}

impl ReportService {
    pub fn new(panel_service: PanelDataService, default_title: String) -> Self {
        Self {
            panel_service,
            default_title,
        }
    }

    pub async fn generate_from_panels(
        &self,
        request: ReportRequest,
    ) -> Result<GeneratedReport, ReportError> {
        let panels = self
            .panel_service
            .fetch_batch(&request.selections, &request.time_range)
            .await?;

        let failed = panels.iter().filter(|p| p.is_error()).count();
        if failed > 0 {
            tracing::warn!("{} of {} panels rendered as errors", failed, panels.len());
        }

        let title = request
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.default_title.clone());
        let now = Local::now();

        let meta = ReportMeta {
            title: title.clone(),
            company_name: request.company_name,
            time_range: request.time_range,
            generated_at: now.format(GENERATED_FORMAT).to_string(),
        };
        let content = build_panels_workbook(&panels, &meta)?;
        let filename = report_filename(&title, &now);

        tracing::info!("Generated report {} with {} panels", filename, panels.len());
        Ok(GeneratedReport {
            filename,
            content,
            item_count: panels.len(),
        })
    }
}

/// `{title}_{stamp}.xlsx`, with spaces and characters unsafe in a quoted
/// `Content-Disposition` filename replaced by `_`.
pub fn report_filename<Tz: TimeZone>(title: &str, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let stem: String = title
        .chars()
        .map(|c| match c {
            ' ' | '"' | '\\' | '/' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    format!("{}_{}.xlsx", stem, at.format(FILENAME_STAMP_FORMAT))
}
