// Spreadsheet rendering: panel reports and single-sheet index exports
use crate::domain::panel_result::PanelResult;
use crate::domain::query::TimeRange;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use serde_json::Value;

const MERGED_COLUMNS: u16 = 5;
const TABLE_HEADER_ROW: u32 = 3;
const MIN_COLUMN_WIDTH: usize = 10;
const MAX_COLUMN_WIDTH: usize = 60;
/// Excel refuses longer cell strings.
const MAX_CELL_CHARS: usize = 32_767;
const INDEX_SHEET_NAME: &str = "Security Report";

#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub title: String,
    pub company_name: Option<String>,
    pub time_range: TimeRange,
    pub generated_at: String,
}

struct Styles {
    title: Format,
    subtitle: Format,
    header: Format,
    subheader: Format,
    cell: Format,
    normal: Format,
    small: Format,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Format::new().set_bold().set_font_size(16),
            subtitle: Format::new().set_bold().set_font_size(14),
            header: Format::new()
                .set_bold()
                .set_font_size(12)
                .set_background_color(Color::RGB(0x4472C4))
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            subheader: Format::new()
                .set_bold()
                .set_font_size(12)
                .set_background_color(Color::RGB(0xD9E1F2))
                .set_align(FormatAlign::Center)
                .set_border(FormatBorder::Thin),
            cell: Format::new()
                .set_font_size(11)
                .set_align(FormatAlign::Left)
                .set_border(FormatBorder::Thin),
            normal: Format::new().set_font_size(11),
            small: Format::new().set_font_size(10),
        }
    }
}

/// Render panel results into an `.xlsx` document held in memory.
pub fn build_panels_workbook(
    panels: &[PanelResult],
    meta: &ReportMeta,
) -> Result<Vec<u8>, XlsxError> {
    let styles = Styles::new();
    let mut workbook = Workbook::new();

    let mut cover = Worksheet::new();
    write_cover(&mut cover, panels, meta, &styles)?;
    workbook.push_worksheet(cover);

    for (index, panel) in panels.iter().enumerate() {
        let sheet = write_panel_sheet(index, panel, &styles)?;
        workbook.push_worksheet(sheet);
    }

    workbook.save_to_buffer()
}

/// Render search hits as one sheet: title, generation stamp, then the table.
pub fn build_index_workbook(
    title: &str,
    generated_at: &str,
    fields: &[String],
    rows: &[Vec<Value>],
) -> Result<Vec<u8>, XlsxError> {
    let styles = Styles::new();
    let mut workbook = Workbook::new();
    let mut sheet = Worksheet::new();
    sheet.set_name(INDEX_SHEET_NAME)?;

    let last_col = fields.len().saturating_sub(1) as u16;
    let generated = format!("Generated: {}", generated_at);
    if last_col == 0 {
        sheet.write_string_with_format(0, 0, title, &styles.title)?;
        sheet.write_string_with_format(1, 0, &generated, &styles.small)?;
    } else {
        sheet.merge_range(0, 0, 0, last_col, title, &styles.title)?;
        sheet.merge_range(1, 0, 1, last_col, &generated, &styles.small)?;
    }

    let headers: Vec<String> = if fields.is_empty() {
        vec!["Column 1".to_string()]
    } else {
        fields.to_vec()
    };
    write_table(&mut sheet, &headers, rows, &styles)?;

    workbook.push_worksheet(sheet);
    workbook.save_to_buffer()
}

fn sheet_name(index: usize) -> String {
    format!("Sheet{}", index + 1)
}

fn panel_title(index: usize, panel: &PanelResult) -> String {
    if panel.panel.title.is_empty() {
        format!("Panel {}", index + 1)
    } else {
        panel.panel.title.clone()
    }
}

fn write_cover(
    sheet: &mut Worksheet,
    panels: &[PanelResult],
    meta: &ReportMeta,
    styles: &Styles,
) -> Result<(), XlsxError> {
    sheet.set_name("Summary")?;

    let mut row = 0;
    sheet.merge_range(row, 0, row, MERGED_COLUMNS, &meta.title, &styles.title)?;
    row += 2;

    if let Some(company) = meta.company_name.as_deref().filter(|c| !c.is_empty()) {
        let text = format!("Company: {}", company);
        sheet.merge_range(row, 0, row, MERGED_COLUMNS, &text, &styles.subheader)?;
        row += 1;
    }

    if !meta.time_range.from.is_empty() && !meta.time_range.to.is_empty() {
        let text = format!(
            "Time Range: {} to {}",
            meta.time_range.from, meta.time_range.to
        );
        sheet.merge_range(row, 0, row, MERGED_COLUMNS, &text, &styles.subheader)?;
        row += 1;
    }

    let generated = format!("Generated: {}", meta.generated_at);
    sheet.merge_range(row, 0, row, MERGED_COLUMNS, &generated, &styles.small)?;
    row += 2;

    sheet.merge_range(row, 0, row, MERGED_COLUMNS, "Report Contents", &styles.subtitle)?;
    row += 1;

    for (col, header) in ["Sheet", "Title", "Type", "Description"].iter().enumerate() {
        sheet.write_string_with_format(row, col as u16, *header, &styles.subheader)?;
    }
    row += 1;

    for (index, panel) in panels.iter().enumerate() {
        let panel_type = if panel.panel.panel_type.is_empty() {
            "unknown"
        } else {
            panel.panel.panel_type.as_str()
        };
        let entries = [
            sheet_name(index),
            panel_title(index, panel),
            panel_type.to_string(),
            panel.panel.description.clone(),
        ];
        for (col, entry) in entries.iter().enumerate() {
            sheet.write_string_with_format(row, col as u16, entry, &styles.cell)?;
        }
        row += 1;
    }

    for (col, width) in [12.0, 40.0, 14.0, 50.0].into_iter().enumerate() {
        sheet.set_column_width(col as u16, width)?;
    }

    Ok(())
}

fn write_panel_sheet(
    index: usize,
    panel: &PanelResult,
    styles: &Styles,
) -> Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(sheet_name(index))?;

    let title = panel_title(index, panel);
    sheet.merge_range(0, 0, 0, MERGED_COLUMNS, &title, &styles.title)?;
    if !panel.panel.description.is_empty() {
        sheet.merge_range(1, 0, 1, MERGED_COLUMNS, &panel.panel.description, &styles.normal)?;
    }

    if !panel.fields.is_empty() && !panel.rows.is_empty() {
        write_table(&mut sheet, &panel.fields, &panel.rows, styles)?;
    }

    Ok(sheet)
}

/// Header at `TABLE_HEADER_ROW`, data below it, panes frozen under the header.
/// Cells beyond the header count are dropped.
fn write_table(
    sheet: &mut Worksheet,
    fields: &[String],
    rows: &[Vec<Value>],
    styles: &Styles,
) -> Result<(), XlsxError> {
    let mut widths: Vec<usize> = fields.iter().map(|f| f.chars().count()).collect();
    for (col, field) in fields.iter().enumerate() {
        sheet.write_string_with_format(TABLE_HEADER_ROW, col as u16, field, &styles.header)?;
    }

    let data_start = TABLE_HEADER_ROW + 1;
    for (offset, row) in rows.iter().enumerate() {
        let excel_row = data_start + offset as u32;
        for (col, value) in row.iter().take(fields.len()).enumerate() {
            let written = write_cell(sheet, excel_row, col as u16, value)?;
            widths[col] = widths[col].max(written.min(MAX_COLUMN_WIDTH));
        }
    }

    sheet.set_freeze_panes(data_start, 0)?;
    for (col, len) in widths.into_iter().enumerate() {
        let width = (len + 2).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);
        sheet.set_column_width(col as u16, width as f64)?;
    }

    Ok(())
}

/// Write one cell and return its display length.
fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<usize, XlsxError> {
    match value {
        Value::Null => Ok(0),
        Value::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
            Ok(b.to_string().len())
        }
        Value::Number(n) => {
            sheet.write_number(row, col, n.as_f64().unwrap_or_default())?;
            Ok(n.to_string().len())
        }
        Value::String(_) | Value::Array(_) | Value::Object(_) => {
            let text = cell_text(value);
            let len = text.chars().count();
            sheet.write_string(row, col, text)?;
            Ok(len)
        }
    }
}

/// Lists become comma-separated text and objects their JSON encoding.
pub fn cell_text(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    };

    if text.chars().count() > MAX_CELL_CHARS {
        text.chars().take(MAX_CELL_CHARS).collect()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::aggregator::aggregate;
    use crate::domain::dashboard::PanelType;
    use crate::domain::frame::{normalize_frames, Frame};
    use crate::domain::panel_result::PanelInfo;
    use calamine::{Data, Reader, Xlsx};
    use serde_json::json;
    use std::io::Cursor;

    fn meta() -> ReportMeta {
        ReportMeta {
            title: "Weekly Security Report".to_string(),
            company_name: Some("Acme".to_string()),
            time_range: TimeRange::new("now-7d", "now"),
            generated_at: "2024-01-08 09:00:00".to_string(),
        }
    }

    fn table_result() -> PanelResult {
        let frames: Vec<Frame> = vec![serde_json::from_value(json!({
            "schema": {"fields": [{"name": "Time"}, {"name": "rule"}, {"name": "hits"}, {"name": "tags"}]},
            "data": {"values": [
                [1700000000000_i64, 1700000060000_i64, 1700000120000_i64],
                ["ssh brute force", "port scan", "malware"],
                [12, 3, 1],
                [["auth", "ssh"], ["net"], {"sev": "high"}]
            ]}
        }))
        .unwrap()];
        let aggregated = aggregate(&PanelType::Table, &frames, normalize_frames(&frames)).unwrap();

        PanelResult {
            fields: aggregated.fields,
            rows: aggregated.rows,
            summary: aggregated.summary,
            panel: PanelInfo {
                id: 6,
                title: "Top rules".to_string(),
                panel_type: "table".to_string(),
                description: "Rules by hit count".to_string(),
                error: None,
            },
        }
    }

    fn read_back(bytes: Vec<u8>) -> Xlsx<Cursor<Vec<u8>>> {
        Xlsx::new(Cursor::new(bytes)).unwrap()
    }

    fn text_at(range: &calamine::Range<Data>, row: u32, col: u32) -> String {
        range
            .get_value((row, col))
            .map(|d| d.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_round_trip_keeps_fields_and_row_count() {
        let result = table_result();
        let bytes = build_panels_workbook(&[result.clone()], &meta()).unwrap();

        let mut workbook = read_back(bytes);
        assert_eq!(workbook.sheet_names(), vec!["Summary", "Sheet1"]);

        let sheet = workbook.worksheet_range("Sheet1").unwrap();
        let fields: Vec<String> = (0..result.fields.len() as u32)
            .map(|col| text_at(&sheet, TABLE_HEADER_ROW, col))
            .collect();
        assert_eq!(fields, result.fields);

        let (last_row, _) = sheet.end().unwrap();
        assert_eq!((last_row - TABLE_HEADER_ROW) as usize, result.row_count());

        assert_eq!(text_at(&sheet, 0, 0), "Top rules");
        assert_eq!(text_at(&sheet, 1, 0), "Rules by hit count");
        assert_eq!(text_at(&sheet, 4, 0), "2023-11-14 22:13:20");
        assert_eq!(text_at(&sheet, 4, 3), "auth, ssh");
        assert_eq!(text_at(&sheet, 6, 3), r#"{"sev":"high"}"#);
        assert_eq!(sheet.get_value((4, 2)), Some(&Data::Float(12.0)));
    }

    #[test]
    fn test_summary_sheet_lists_panels() {
        let error = PanelResult::error(PanelInfo::unknown(99), "Panel not found");
        let bytes = build_panels_workbook(&[table_result(), error], &meta()).unwrap();

        let mut workbook = read_back(bytes);
        assert_eq!(workbook.sheet_names(), vec!["Summary", "Sheet1", "Sheet2"]);

        let cover = workbook.worksheet_range("Summary").unwrap();
        assert_eq!(text_at(&cover, 0, 0), "Weekly Security Report");
        assert_eq!(text_at(&cover, 2, 0), "Company: Acme");
        assert_eq!(text_at(&cover, 3, 0), "Time Range: now-7d to now");
        assert_eq!(text_at(&cover, 4, 0), "Generated: 2024-01-08 09:00:00");
        assert_eq!(text_at(&cover, 6, 0), "Report Contents");
        assert_eq!(text_at(&cover, 7, 1), "Title");
        assert_eq!(text_at(&cover, 8, 0), "Sheet1");
        assert_eq!(text_at(&cover, 8, 1), "Top rules");
        assert_eq!(text_at(&cover, 9, 1), "Unknown Panel");
        assert_eq!(text_at(&cover, 9, 2), "unknown");

        let error_sheet = workbook.worksheet_range("Sheet2").unwrap();
        assert_eq!(text_at(&error_sheet, TABLE_HEADER_ROW, 0), "Error");
        assert_eq!(text_at(&error_sheet, TABLE_HEADER_ROW + 1, 0), "Panel not found");
    }

    #[test]
    fn test_empty_result_has_no_table() {
        let mut result = table_result();
        result.rows.clear();
        let bytes = build_panels_workbook(&[result], &meta()).unwrap();

        let mut workbook = read_back(bytes);
        let sheet = workbook.worksheet_range("Sheet1").unwrap();
        assert_eq!(text_at(&sheet, TABLE_HEADER_ROW, 0), "");
    }

    #[test]
    fn test_index_workbook_single_sheet() {
        let fields = vec!["rule.name".to_string(), "rule.level".to_string(), "rule.groups".to_string()];
        let rows = vec![
            vec![json!("ssh brute force"), json!(10), json!(r#"["auth","ssh"]"#)],
            vec![json!("port scan"), Value::Null, json!("[]")],
        ];
        let bytes = build_index_workbook("Alert Export", "2024-01-08 09:00:00", &fields, &rows).unwrap();

        let mut workbook = read_back(bytes);
        assert_eq!(workbook.sheet_names(), vec!["Security Report"]);

        let sheet = workbook.worksheet_range("Security Report").unwrap();
        assert_eq!(text_at(&sheet, 0, 0), "Alert Export");
        assert_eq!(text_at(&sheet, 1, 0), "Generated: 2024-01-08 09:00:00");
        assert_eq!(text_at(&sheet, TABLE_HEADER_ROW, 1), "rule.level");
        assert_eq!(text_at(&sheet, TABLE_HEADER_ROW + 1, 0), "ssh brute force");
        assert_eq!(sheet.get_value((TABLE_HEADER_ROW + 1, 1)), Some(&Data::Float(10.0)));
        assert_eq!(text_at(&sheet, TABLE_HEADER_ROW + 1, 2), r#"["auth","ssh"]"#);
        assert_eq!(text_at(&sheet, TABLE_HEADER_ROW + 2, 1), "");

        let (last_row, _) = sheet.end().unwrap();
        assert_eq!(last_row, TABLE_HEADER_ROW + 2);
    }

    #[test]
    fn test_index_workbook_without_hits_keeps_header() {
        let fields = vec!["agent.name".to_string()];
        let bytes = build_index_workbook("Empty", "2024-01-08 09:00:00", &fields, &[]).unwrap();

        let mut workbook = read_back(bytes);
        let sheet = workbook.worksheet_range("Security Report").unwrap();
        assert_eq!(text_at(&sheet, 0, 0), "Empty");
        assert_eq!(text_at(&sheet, TABLE_HEADER_ROW, 0), "agent.name");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!(["a", 1, true])), "a, 1, true");
        assert_eq!(cell_text(&json!({"k": "v"})), r#"{"k":"v"}"#);
        assert_eq!(cell_text(&json!("plain")), "plain");
        assert_eq!(cell_text(&json!("x".repeat(40_000))).len(), MAX_CELL_CHARS);
    }
}
