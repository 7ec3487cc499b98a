// Domain layer - Typed models and pure transformations
pub mod dashboard;
pub mod datasource;
pub mod error;
pub mod frame;
pub mod panel_result;
pub mod query;
pub mod search;
