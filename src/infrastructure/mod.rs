// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod grafana_client;
pub mod http_response;
pub mod xlsx_report;
