// Panel result: the table handed to report generation
use super::dashboard::PanelDescriptor;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelInfo {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub panel_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PanelInfo {
    pub fn from_panel(panel: &PanelDescriptor) -> Self {
        Self {
            id: panel.id,
            title: panel.title.clone(),
            panel_type: panel.panel_type.as_str().to_string(),
            description: panel.description.clone(),
            error: None,
        }
    }

    /// Info for a panel whose definition could not be located.
    pub fn unknown(panel_id: i64) -> Self {
        Self {
            id: panel_id,
            title: "Unknown Panel".to_string(),
            panel_type: "unknown".to_string(),
            description: String::new(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelResult {
    pub fields: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub panel: PanelInfo,
}

impl PanelResult {
    /// Placeholder carrying an error message in place of data.
    pub fn error(mut panel: PanelInfo, message: impl Into<String>) -> Self {
        let message = message.into();
        panel.error = Some(message.clone());
        Self {
            fields: vec!["Error".to_string()],
            rows: vec![vec![Value::String(message)]],
            summary: None,
            panel,
        }
    }

    pub fn is_error(&self) -> bool {
        self.panel.error.is_some()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
