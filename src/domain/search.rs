// Index search models: mapping fields, filter queries and hit flattening
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Datasource types whose indices can be browsed through the datasource proxy.
pub const SEARCH_DATASOURCE_TYPES: [&str; 2] = ["elasticsearch", "grafana-opensearch-datasource"];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct IndexField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

/// Entry of `_cat/indices?format=json`.
#[derive(Debug, Deserialize)]
pub struct CatIndex {
    pub index: String,
}

/// Body of a proxied `_search` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub query: Value,
    #[serde(rename = "_source")]
    pub source: Vec<String>,
    pub size: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: HitList,
}

#[derive(Debug, Default, Deserialize)]
pub struct HitList {
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Hit {
    #[serde(rename = "_source", default)]
    pub source: Value,
}

/// Dotted field names of every index in a `_mapping` response, sorted by name.
pub fn mapping_fields(mappings: &Value) -> Vec<IndexField> {
    let mut fields = Vec::new();

    let Some(indices) = mappings.as_object() else {
        return fields;
    };

    for index_mapping in indices.values() {
        let mapping = index_mapping.get("mappings");
        let properties = mapping
            .and_then(|m| m.get("properties"))
            .and_then(Value::as_object)
            .filter(|p| !p.is_empty())
            .or_else(|| {
                mapping
                    .and_then(|m| m.get("_doc"))
                    .and_then(|d| d.get("properties"))
                    .and_then(Value::as_object)
            });

        if let Some(properties) = properties {
            walk_properties(properties, "", &mut fields);
        }
    }

    fields.sort();
    fields.dedup();
    fields
}

fn walk_properties(properties: &Map<String, Value>, prefix: &str, out: &mut Vec<IndexField>) {
    for (name, info) in properties {
        let full_name = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };

        if let Some(field_type) = info.get("type") {
            out.push(IndexField {
                name: full_name.clone(),
                field_type: field_type
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| field_type.to_string()),
            });
        }

        if let Some(nested) = info.get("properties").and_then(Value::as_object) {
            walk_properties(nested, &full_name, out);
        }
    }
}

/// Turn a `field -> filter` map into a search query.
///
/// Objects with `gte`/`lte` become `range` clauses, lists become `terms`,
/// anything else a `match`. No filters means `match_all`.
pub fn build_search_query(filters: &Map<String, Value>) -> Value {
    if filters.is_empty() {
        return single_entry("match_all", Value::Object(Map::new()));
    }

    let must: Vec<Value> = filters
        .iter()
        .map(|(field, value)| {
            let kind = match value {
                Value::Object(bounds) if bounds.contains_key("gte") || bounds.contains_key("lte") => {
                    "range"
                }
                Value::Array(_) => "terms",
                _ => "match",
            };
            single_entry(kind, single_entry(field, value.clone()))
        })
        .collect();

    single_entry("bool", single_entry("must", Value::Array(must)))
}

fn single_entry(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

/// Follow a dotted path into a document. Objects and lists come back as JSON text.
pub fn extract_field(source: &Value, path: &str) -> Value {
    let mut current = source;
    for part in path.split('.') {
        match current.get(part) {
            Some(next) => current = next,
            None => return Value::Null,
        }
    }

    match current {
        Value::Object(_) | Value::Array(_) => Value::String(current.to_string()),
        other => other.clone(),
    }
}

/// One row per hit, one cell per requested field.
pub fn hits_to_rows(hits: &[Hit], fields: &[String]) -> Vec<Vec<Value>> {
    hits.iter()
        .map(|hit| {
            fields
                .iter()
                .map(|field| extract_field(&hit.source, field))
                .collect()
        })
        .collect()
}
