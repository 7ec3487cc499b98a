// Panel-type aggregation applied after frame normalization
use crate::domain::dashboard::PanelType;
use crate::domain::error::PanelError;
use crate::domain::frame::{Frame, NormalizedTable};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedTable {
    pub fields: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub summary: Option<String>,
}

/// Stat reductions, tried in order until one applies.
///
/// `CountColumn` and `CountHistogram` key off field names only, so a field that is
/// literally called `Count` but holds something else still gets summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatRule {
    /// Terms aggregation exposing a `Count` column.
    CountColumn,
    /// Date histogram `Time` + `Value`/`Count` whose metric is a count.
    CountHistogram,
    /// Sum of every numeric cell.
    AllNumeric,
}

pub const STAT_RULES: [StatRule; 3] = [
    StatRule::CountColumn,
    StatRule::CountHistogram,
    StatRule::AllNumeric,
];

impl StatRule {
    /// `Ok(None)` when the rule's precondition does not hold for this frame.
    pub fn apply(&self, frame: &Frame) -> Result<Option<AggregatedTable>, PanelError> {
        let fields = &frame.schema.fields;

        match self {
            StatRule::CountColumn => {
                let Some(index) = fields.iter().position(|f| f.name_is("Count")) else {
                    return Ok(None);
                };
                let column = frame.column(index).ok_or_else(|| {
                    PanelError::MalformedResponse("Count column has no values".to_string())
                })?;
                let total = sum_numeric(column.iter());
                Ok(Some(total_table(
                    total.clone(),
                    format!("Sum of Count column = {}", total),
                )))
            }
            StatRule::CountHistogram => {
                if fields.len() != 2 {
                    return Ok(None);
                }
                let (time, value) = (&fields[0], &fields[1]);
                let is_histogram =
                    time.name_is("Time") && (value.name_is("Value") || value.name_is("Count"));
                if !is_histogram
                    || !value
                        .display_name_from_ds()
                        .to_lowercase()
                        .starts_with("count")
                {
                    return Ok(None);
                }
                let column = frame.column(1).ok_or_else(|| {
                    PanelError::MalformedResponse("histogram value column has no values".to_string())
                })?;
                let total = sum_numeric(column.iter());
                Ok(Some(total_table(
                    total.clone(),
                    format!("Event count across time buckets = {}", total),
                )))
            }
            StatRule::AllNumeric => {
                let cells = frame
                    .data
                    .values
                    .iter()
                    .filter_map(Value::as_array)
                    .flatten();
                let total = sum_numeric(cells);
                Ok(Some(total_table(total.clone(), format!("Total={}", total))))
            }
        }
    }
}

fn total_table(total: Value, summary: String) -> AggregatedTable {
    AggregatedTable {
        fields: vec!["TOTAL".to_string()],
        rows: vec![vec![total]],
        summary: Some(summary),
    }
}

/// Sum numeric cells, staying integral until a float shows up.
pub fn sum_numeric<'a>(values: impl Iterator<Item = &'a Value>) -> Value {
    let mut integral: Option<i64> = Some(0);
    let mut total = 0.0_f64;

    for value in values {
        let Value::Number(number) = value else {
            continue;
        };
        match (integral, number.as_i64()) {
            (Some(acc), Some(n)) => match acc.checked_add(n) {
                Some(sum) => integral = Some(sum),
                None => integral = None,
            },
            _ => integral = None,
        }
        total += number.as_f64().unwrap_or(0.0);
    }

    match integral {
        Some(sum) => Value::from(sum),
        None => Value::from(total),
    }
}

/// Apply the type-specific post-processing to a normalized table.
pub fn aggregate(
    panel_type: &PanelType,
    frames: &[Frame],
    table: NormalizedTable,
) -> Result<AggregatedTable, PanelError> {
    let row_count = table.rows.len();
    let summary = match panel_type {
        PanelType::Stat => {
            if let Some(frame) = frames.first() {
                for rule in STAT_RULES {
                    if let Some(reduced) = rule.apply(frame)? {
                        tracing::debug!("Stat panel reduced with {:?}", rule);
                        return Ok(reduced);
                    }
                }
            }
            format!("{} rows (generic parse)", row_count)
        }
        PanelType::Table => format!("{} rows", row_count),
        PanelType::Timeseries => format!("{} points", row_count),
        PanelType::Text | PanelType::Other(_) => format!("{} rows (generic parse)", row_count),
    };

    Ok(AggregatedTable {
        fields: table.fields,
        rows: table.rows,
        summary: Some(summary),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::frame::normalize_frames;
    use serde_json::json;

    fn frame(value: Value) -> Frame {
        serde_json::from_value(value).unwrap()
    }

    fn run(panel_type: PanelType, frames: Vec<Frame>) -> AggregatedTable {
        let table = normalize_frames(&frames);
        aggregate(&panel_type, &frames, table).unwrap()
    }

    #[test]
    fn test_stat_sums_count_column() {
        let frames = vec![frame(json!({
            "schema": {"fields": [{"name": "Term"}, {"name": "Count"}]},
            "data": {"values": [["a", "b"], [3, 7]]}
        }))];

        let result = run(PanelType::Stat, frames);
        assert_eq!(result.fields, vec!["TOTAL"]);
        assert_eq!(result.rows, vec![vec![json!(10)]]);
        assert_eq!(result.summary.as_deref(), Some("Sum of Count column = 10"));
    }

    #[test]
    fn test_stat_count_histogram() {
        let f = frame(json!({
            "schema": {"fields": [
                {"name": "Time", "type": "time"},
                {"name": "Value", "config": {"displayNameFromDS": "Count"}}
            ]},
            "data": {"values": [[1700000000000_i64, 1700000060000_i64], [4, 5]]}
        }));

        assert_eq!(StatRule::CountColumn.apply(&f).unwrap(), None);
        let result = StatRule::CountHistogram.apply(&f).unwrap().unwrap();
        assert_eq!(result.rows, vec![vec![json!(9)]]);
        assert_eq!(
            result.summary.as_deref(),
            Some("Event count across time buckets = 9")
        );
    }

    #[test]
    fn test_histogram_requires_count_metric() {
        let f = frame(json!({
            "schema": {"fields": [
                {"name": "Time"},
                {"name": "Value", "config": {"displayNameFromDS": "Average bytes"}}
            ]},
            "data": {"values": [[10, 20], [1.5, 2.5]]}
        }));

        assert_eq!(StatRule::CountHistogram.apply(&f).unwrap(), None);

        // Falls through to the catch-all, which includes the time column.
        let result = run(PanelType::Stat, vec![f]);
        assert_eq!(result.rows, vec![vec![json!(34.0)]]);
        assert_eq!(result.summary.as_deref(), Some("Total=34.0"));
    }

    #[test]
    fn test_all_numeric_skips_non_numbers() {
        let f = frame(json!({
            "schema": {"fields": [{"name": "host"}, {"name": "errors"}, {"name": "warnings"}]},
            "data": {"values": [["a", "b"], [1, null], [2, 3]]}
        }));

        let result = StatRule::AllNumeric.apply(&f).unwrap().unwrap();
        assert_eq!(result.rows, vec![vec![json!(6)]]);
    }

    #[test]
    fn test_all_numeric_empty_frame_is_zero() {
        let f = frame(json!({"schema": {"fields": []}, "data": {"values": []}}));
        let result = StatRule::AllNumeric.apply(&f).unwrap().unwrap();
        assert_eq!(result.rows, vec![vec![json!(0)]]);
        assert_eq!(result.summary.as_deref(), Some("Total=0"));
    }

    #[test]
    fn test_count_column_without_values_is_malformed() {
        let f = frame(json!({
            "schema": {"fields": [{"name": "Term"}, {"name": "Count"}]},
            "data": {"values": [["a"]]}
        }));
        assert!(matches!(
            StatRule::CountColumn.apply(&f),
            Err(PanelError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_stat_uses_first_frame_only() {
        let frames = vec![
            frame(json!({
                "schema": {"fields": [{"name": "Term"}, {"name": "Count"}]},
                "data": {"values": [["a"], [2]]}
            })),
            frame(json!({
                "schema": {"fields": [{"name": "Term"}, {"name": "Count"}]},
                "data": {"values": [["b"], [100]]}
            })),
        ];
        let result = run(PanelType::Stat, frames);
        assert_eq!(result.rows, vec![vec![json!(2)]]);
    }

    #[test]
    fn test_table_and_timeseries_pass_through() {
        let f = frame(json!({
            "schema": {"fields": [{"name": "rule"}, {"name": "hits"}]},
            "data": {"values": [["r1", "r2", "r3"], [1, 2, 3]]}
        }));

        let table = run(PanelType::Table, vec![f.clone()]);
        assert_eq!(table.fields, vec!["rule", "hits"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.summary.as_deref(), Some("3 rows"));

        let series = run(PanelType::Timeseries, vec![f.clone()]);
        assert_eq!(series.summary.as_deref(), Some("3 points"));

        let other = run(PanelType::Other("piechart".to_string()), vec![f]);
        assert_eq!(other.summary.as_deref(), Some("3 rows (generic parse)"));
    }
}
