// Application state for HTTP handlers
use crate::application::index_export_service::IndexExportService;
use crate::application::panel_service::PanelDataService;
use crate::application::report_service::ReportService;

#[derive(Clone)]
pub struct AppState {
    pub panel_service: PanelDataService,
    pub report_service: ReportService,
    pub export_service: IndexExportService,
}
