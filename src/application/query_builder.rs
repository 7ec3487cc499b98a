// Query builder - Turns panel targets into backend queries
use crate::application::template_resolver::resolve_template;
use crate::domain::dashboard::{PanelDescriptor, TemplatingVar};
use crate::domain::datasource::DatasourceDescriptor;
use crate::domain::query::{BackendQuery, QueryRequest, QueryTarget, TimeRange};

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    interval_ms: u64,
    max_data_points: u64,
}

impl QueryBuilder {
    pub fn new(interval_ms: u64, max_data_points: u64) -> Self {
        Self {
            interval_ms,
            max_data_points,
        }
    }

    /// One query per visible target. Hidden targets keep their index for refId synthesis.
    pub fn build_queries(
        &self,
        panel: &PanelDescriptor,
        datasource: &DatasourceDescriptor,
        vars: &[TemplatingVar],
    ) -> Vec<BackendQuery> {
        panel
            .targets
            .iter()
            .enumerate()
            .filter(|(_, target)| !target.is_hidden())
            .map(|(index, target)| self.build_query(index, target, panel.id, datasource, vars))
            .collect()
    }

    fn build_query(
        &self,
        index: usize,
        target: &QueryTarget,
        panel_id: i64,
        datasource: &DatasourceDescriptor,
        vars: &[TemplatingVar],
    ) -> BackendQuery {
        let ref_id = target
            .ref_id
            .clone()
            .unwrap_or_else(|| synthesize_ref_id(index));

        let bucket_aggs = target.bucket_aggs.clone().map(|mut aggs| {
            aggs.iter_mut().for_each(|agg| agg.normalize_settings());
            aggs
        });

        BackendQuery {
            ref_id,
            datasource: datasource.reference(),
            datasource_id: datasource.id,
            interval_ms: self.interval_ms,
            max_data_points: self.max_data_points,
            panel_id,
            query: target.query.as_deref().map(|q| resolve_template(q, vars)),
            bucket_aggs,
            metrics: target.metrics.clone(),
            alias: target.alias.clone(),
            time_field: target.time_field.clone(),
            format: target.format.clone(),
            query_type: target.query_type.clone(),
            lucene_query_type: target.lucene_query_type.clone(),
        }
    }

    pub fn build_request(
        &self,
        panel_id: i64,
        queries: Vec<BackendQuery>,
        time_range: &TimeRange,
    ) -> QueryRequest {
        let (from, to) = time_range.normalized();
        QueryRequest {
            from,
            to,
            queries,
            request_id: format!("Q{}", panel_id),
        }
    }
}

fn synthesize_ref_id(index: usize) -> String {
    char::from_u32('A' as u32 + index as u32)
        .map(String::from)
        .unwrap_or_else(|| format!("Q{}", index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dashboard::{DashboardDescriptor, RawDashboard, VarValue};
    use serde_json::json;

    fn datasource() -> DatasourceDescriptor {
        serde_json::from_value(json!({
            "id": 12,
            "uid": "os-default",
            "name": "OpenSearch",
            "type": "grafana-opensearch-datasource",
            "isDefault": true
        }))
        .unwrap()
    }

    fn panel(targets: serde_json::Value) -> PanelDescriptor {
        let raw: RawDashboard = serde_json::from_value(json!({
            "panels": [{"id": 5, "type": "table", "title": "Alerts", "targets": targets}]
        }))
        .unwrap();
        DashboardDescriptor::from_raw("d", raw).panels.remove(0)
    }

    #[test]
    fn test_hidden_targets_are_skipped() {
        let panel = panel(json!([
            {"refId": "A", "query": "a", "hide": true},
            {"query": "b"},
            {"refId": "C", "query": "c", "hide": false}
        ]));

        let queries = QueryBuilder::new(60000, 500).build_queries(&panel, &datasource(), &[]);

        let ref_ids: Vec<&str> = queries.iter().map(|q| q.ref_id.as_str()).collect();
        assert_eq!(ref_ids, vec!["B", "C"]);
        assert!(queries.iter().all(|q| q.query.as_deref() != Some("a")));
    }

    #[test]
    fn test_query_fields() {
        let panel = panel(json!([{
            "refId": "A",
            "query": "env:${env:lucene}",
            "alias": "",
            "timeField": "@timestamp",
            "metrics": [{"id": "1", "type": "count"}],
            "bucketAggs": [{"id": "2", "type": "terms", "field": "rule.name", "settings": {"size": "10", "order": "desc"}}],
            "datasource": {"uid": "other", "type": "elasticsearch"},
            "intervalFactor": 2
        }]));
        let vars = vec![TemplatingVar::new(
            "env",
            VarValue::Multi(vec!["prod".to_string(), "staging".to_string()]),
        )];

        let queries = QueryBuilder::new(60000, 500).build_queries(&panel, &datasource(), &vars);
        let value = serde_json::to_value(&queries[0]).unwrap();

        assert_eq!(value["query"], json!("env:prod OR staging"));
        assert_eq!(
            value["datasource"],
            json!({"uid": "os-default", "type": "grafana-opensearch-datasource"})
        );
        assert_eq!(value["datasourceId"], json!(12));
        assert_eq!(value["maxDataPoints"], json!(500));
        assert_eq!(value["panelId"], json!(5));
        assert_eq!(value["bucketAggs"][0]["settings"]["size"], json!(10));
        assert_eq!(value["bucketAggs"][0]["settings"]["order"], json!("desc"));
        assert_eq!(value["bucketAggs"][0]["field"], json!("rule.name"));
        assert!(value.get("intervalFactor").is_none());
    }

    #[test]
    fn test_no_visible_targets_yields_no_queries() {
        let panel = panel(json!([{"refId": "A", "hide": true}]));
        let queries = QueryBuilder::new(60000, 500).build_queries(&panel, &datasource(), &[]);
        assert!(queries.is_empty());
    }

    #[test]
    fn test_request_envelope() {
        let request = QueryBuilder::new(60000, 500).build_request(
            7,
            Vec::new(),
            &TimeRange::new("2024-01-01T00:00:00Z", "now"),
        );
        assert_eq!(request.from, "1704067200000");
        assert_eq!(request.to, "now");
        assert_eq!(request.request_id, "Q7");
    }
}
