use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub grafana: GrafanaSettings,
    pub query: QuerySettings,
    pub server: ServerSettings,
    pub report: ReportSettings,
    pub export: ExportSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GrafanaSettings {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuerySettings {
    /// Datasource type whose default instance serves every panel query
    pub datasource_type: String,
    pub interval_ms: u64,
    pub max_data_points: u64,
    pub timeout_secs: u64,
    pub max_concurrency: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportSettings {
    pub default_title: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportSettings {
    /// Upper bound on documents pulled by one index export
    pub max_hits: u64,
}

fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(config::Config::builder()
        .set_default("grafana.url", "http://localhost:3000")?
        .set_default("grafana.api_key", "")?
        .set_default("query.datasource_type", "grafana-opensearch-datasource")?
        .set_default("query.interval_ms", 60000_i64)?
        .set_default("query.max_data_points", 500_i64)?
        .set_default("query.timeout_secs", 30_i64)?
        .set_default("query.max_concurrency", 4_i64)?
        .set_default("server.bind", "0.0.0.0:8080")?
        .set_default("report.default_title", "Security Report")?
        .set_default("export.max_hits", 10000_i64)?)
}

/// Defaults, then `config/grafana.*` if present, then `REPORT__*` environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = builder()?
        .add_source(config::File::with_name("config/grafana").required(false))
        .add_source(
            config::Environment::with_prefix("REPORT")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
