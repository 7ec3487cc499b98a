// Application layer - Use cases and the backend port
pub mod aggregator;
pub mod index_export_service;
pub mod monitoring_backend;
pub mod panel_service;
pub mod query_builder;
pub mod report_service;
pub mod template_resolver;
