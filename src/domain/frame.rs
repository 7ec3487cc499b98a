// Query result frames and their row-oriented normalization
use super::error::PanelError;
use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Numbers above this are treated as epoch-millisecond timestamps.
const EPOCH_MS_THRESHOLD: f64 = 1e12;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Body of `POST /api/ds/query`.
#[derive(Debug, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: BTreeMap<String, RefResult>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefResult {
    #[serde(default)]
    pub frames: Vec<Frame>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Frame {
    pub schema: FrameSchema,
    pub data: FrameData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameSchema {
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldSchema {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: Option<FieldConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    #[serde(default, rename = "displayNameFromDS")]
    pub display_name_from_ds: Option<String>,
}

/// Columns are kept untyped: the shape check happens during transposition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameData {
    #[serde(default)]
    pub values: Vec<Value>,
}

impl FieldSchema {
    pub fn name_is(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    pub fn display_name_from_ds(&self) -> &str {
        self.config
            .as_ref()
            .and_then(|c| c.display_name_from_ds.as_deref())
            .unwrap_or("")
    }
}

impl Frame {
    pub fn field_names(&self) -> Vec<String> {
        self.schema
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| f.name.clone().unwrap_or_else(|| format!("f{}", i)))
            .collect()
    }

    pub fn column(&self, index: usize) -> Option<&Vec<Value>> {
        self.data.values.get(index).and_then(Value::as_array)
    }

    /// Transpose columns into rows. Nothing is produced unless every column is an array.
    pub fn rows(&self) -> Vec<Vec<Value>> {
        let columns: Option<Vec<&Vec<Value>>> =
            self.data.values.iter().map(Value::as_array).collect();
        let Some(columns) = columns else {
            return Vec::new();
        };
        if columns.is_empty() {
            return Vec::new();
        }

        let len = columns.iter().map(|c| c.len()).min().unwrap_or(0);
        (0..len)
            .map(|row| columns.iter().map(|col| format_timestamp(&col[row])).collect())
            .collect()
    }
}

impl QueryResponse {
    /// Frames for the primary series: refId "A", else the given fallback refId.
    pub fn primary_frames(&self, fallback_ref_id: Option<&str>) -> Result<&[Frame], PanelError> {
        let entry = self
            .results
            .get_key_value("A")
            .or_else(|| fallback_ref_id.and_then(|id| self.results.get_key_value(id)));

        match entry {
            Some((ref_id, result)) => match &result.error {
                Some(message) => Err(PanelError::QueryRejected {
                    ref_id: ref_id.clone(),
                    message: message.clone(),
                }),
                None => Ok(result.frames.as_slice()),
            },
            None => Ok(&[][..]),
        }
    }
}

/// Render epoch-millisecond numbers as UTC date-times; everything else is unchanged.
pub fn format_timestamp(value: &Value) -> Value {
    let Some(number) = value.as_f64() else {
        return value.clone();
    };
    if number <= EPOCH_MS_THRESHOLD {
        return value.clone();
    }

    match DateTime::from_timestamp_millis(number as i64) {
        Some(dt) => Value::String(dt.format(TIMESTAMP_FORMAT).to_string()),
        None => value.clone(),
    }
}

/// Row-oriented table built from a list of frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTable {
    pub fields: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Field names come from the first frame; later frames only contribute rows.
pub fn normalize_frames(frames: &[Frame]) -> NormalizedTable {
    let mut table = NormalizedTable::default();

    for frame in frames {
        if table.fields.is_empty() {
            table.fields = frame.field_names();
        }
        table.rows.extend(frame.rows());
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(value: Value) -> Frame {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(&json!(1700000000000_i64)),
            json!("2023-11-14 22:13:20")
        );
        assert_eq!(
            format_timestamp(&json!(1700000000000.0)),
            json!("2023-11-14 22:13:20")
        );
        assert_eq!(format_timestamp(&json!(42)), json!(42));
        assert_eq!(format_timestamp(&json!(1000000000000_i64)), json!(1000000000000_i64));
        assert_eq!(format_timestamp(&json!("1700000000000")), json!("1700000000000"));
        assert_eq!(format_timestamp(&json!({"a": 1})), json!({"a": 1}));
    }

    #[test]
    fn test_normalize_transposes_columns() {
        let frames = vec![frame(json!({
            "schema": {"fields": [{"name": "Time", "type": "time"}, {"name": "Value", "type": "number"}]},
            "data": {"values": [[1700000000000_i64, 1700000060000_i64], [3, 4]]}
        }))];

        let table = normalize_frames(&frames);
        assert_eq!(table.fields, vec!["Time", "Value"]);
        assert_eq!(
            table.rows,
            vec![
                vec![json!("2023-11-14 22:13:20"), json!(3)],
                vec![json!("2023-11-14 22:14:20"), json!(4)],
            ]
        );
    }

    #[test]
    fn test_first_frame_schema_wins() {
        let frames = vec![
            frame(json!({
                "schema": {"fields": [{"name": "host"}, {}]},
                "data": {"values": [["a"], [1]]}
            })),
            frame(json!({
                "schema": {"fields": [{"name": "other"}, {"name": "x"}, {"name": "y"}]},
                "data": {"values": [["b"], [2], [true]]}
            })),
        ];

        let table = normalize_frames(&frames);
        assert_eq!(table.fields, vec!["host", "f1"]);
        assert_eq!(
            table.rows,
            vec![vec![json!("a"), json!(1)], vec![json!("b"), json!(2), json!(true)]]
        );
    }

    #[test]
    fn test_non_list_columns_yield_no_rows() {
        let f = frame(json!({
            "schema": {"fields": [{"name": "a"}, {"name": "b"}]},
            "data": {"values": [[1, 2], "oops"]}
        }));
        assert!(f.rows().is_empty());

        let f = frame(json!({
            "schema": {"fields": [{"name": "a"}]},
            "data": {"values": []}
        }));
        assert!(f.rows().is_empty());
    }

    #[test]
    fn test_uneven_columns_truncate_to_shortest() {
        let f = frame(json!({
            "schema": {"fields": [{"name": "a"}, {"name": "b"}]},
            "data": {"values": [[1, 2, 3], ["x", "y"]]}
        }));
        assert_eq!(f.rows().len(), 2);
    }

    #[test]
    fn test_primary_frames_lookup() {
        let response: QueryResponse = serde_json::from_value(json!({
            "results": {
                "B": {"frames": [{"schema": {"fields": []}, "data": {"values": []}}]}
            }
        }))
        .unwrap();

        assert!(response.primary_frames(None).unwrap().is_empty());
        assert_eq!(response.primary_frames(Some("B")).unwrap().len(), 1);
    }

    #[test]
    fn test_primary_frames_surface_query_errors() {
        let response: QueryResponse = serde_json::from_value(json!({
            "results": {"A": {"error": "index_not_found_exception", "status": 400}}
        }))
        .unwrap();

        let err = response.primary_frames(None).unwrap_err();
        assert_eq!(err.to_string(), "Query A failed: index_not_found_exception");
    }

    #[test]
    fn test_frame_without_schema_is_malformed() {
        let parsed = serde_json::from_value::<Frame>(json!({"data": {"values": []}}));
        assert!(parsed.is_err());
    }
}
