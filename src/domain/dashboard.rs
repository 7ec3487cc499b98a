// Dashboard domain model
use super::datasource::DatasourceRef;
use super::query::QueryTarget;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Panel type Grafana uses for collapsible row containers.
pub const ROW_PANEL_TYPE: &str = "row";

/// Body of `GET /api/dashboards/uid/{uid}`.
#[derive(Debug, Deserialize)]
pub struct DashboardEnvelope {
    pub dashboard: RawDashboard,
}

#[derive(Debug, Deserialize)]
pub struct RawDashboard {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub templating: RawTemplating,
    #[serde(default)]
    pub panels: Vec<RawPanel>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawTemplating {
    #[serde(default)]
    pub list: Vec<RawTemplatingVar>,
}

#[derive(Debug, Deserialize)]
pub struct RawTemplatingVar {
    pub name: String,
    #[serde(default)]
    pub current: Option<RawCurrentValue>,
}

#[derive(Debug, Deserialize)]
pub struct RawCurrentValue {
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPanel {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub panel_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub targets: Vec<QueryTarget>,
    #[serde(default)]
    pub datasource: Option<RawDatasource>,
    /// Children of a row container (only populated for collapsed rows).
    #[serde(default)]
    pub panels: Vec<RawPanel>,
}

/// Grafana stores panel datasources either as `{uid, type}` or as a bare name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawDatasource {
    Ref {
        #[serde(default)]
        uid: Option<String>,
        #[serde(rename = "type", default)]
        kind: Option<String>,
    },
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum VarValue {
    Single(String),
    Multi(Vec<String>),
}

impl VarValue {
    fn from_json(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => VarValue::Single("*".to_string()),
            Some(Value::String(s)) => VarValue::Single(s),
            Some(Value::Array(items)) => VarValue::Multi(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            Some(other) => VarValue::Single(other.to_string()),
        }
    }

    /// Value substituted into query strings. "All" selections become a wildcard.
    pub fn render(&self) -> String {
        match self {
            VarValue::Single(s) if s == "$__all" => "*".to_string(),
            VarValue::Single(s) => s.clone(),
            VarValue::Multi(values) if values.is_empty() => "*".to_string(),
            VarValue::Multi(values) => values.join(" OR "),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplatingVar {
    pub name: String,
    pub current: VarValue,
}

#[cfg(test)]
impl TemplatingVar {
    pub fn new(name: impl Into<String>, current: VarValue) -> Self {
        Self {
            name: name.into(),
            current,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelType {
    Stat,
    Table,
    Timeseries,
    Text,
    Other(String),
}

impl PanelType {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "stat" => PanelType::Stat,
            "table" => PanelType::Table,
            "timeseries" => PanelType::Timeseries,
            "text" => PanelType::Text,
            other => PanelType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PanelType::Stat => "stat",
            PanelType::Table => "table",
            PanelType::Timeseries => "timeseries",
            PanelType::Text => "text",
            PanelType::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PanelDescriptor {
    pub id: i64,
    pub title: String,
    pub panel_type: PanelType,
    pub description: String,
    pub targets: Vec<QueryTarget>,
    pub datasource_hint: DatasourceRef,
}

impl PanelDescriptor {
    fn from_raw(raw: RawPanel) -> Self {
        let datasource_hint = Self::datasource_hint(&raw);
        Self {
            id: raw.id,
            title: raw.title.unwrap_or_default(),
            panel_type: PanelType::from_raw(&raw.panel_type),
            description: raw.description.unwrap_or_default(),
            targets: raw.targets,
            datasource_hint,
        }
    }

    // Newer dashboards declare the datasource per target; older ones per panel.
    fn datasource_hint(raw: &RawPanel) -> DatasourceRef {
        if let Some(RawDatasource::Ref { uid, kind }) =
            raw.targets.first().and_then(|t| t.datasource.as_ref())
        {
            return DatasourceRef::new(
                uid.clone().unwrap_or_default(),
                kind.clone().unwrap_or_default(),
            );
        }

        match &raw.datasource {
            Some(RawDatasource::Ref { uid, kind }) => DatasourceRef::new(
                uid.clone().unwrap_or_default(),
                kind.clone().unwrap_or_default(),
            ),
            Some(RawDatasource::Name(name)) => DatasourceRef::new(String::new(), name.clone()),
            None => DatasourceRef::default(),
        }
    }

    pub fn summary(&self) -> PanelSummary {
        PanelSummary {
            id: self.id,
            title: if self.title.is_empty() {
                "Unnamed Panel".to_string()
            } else {
                self.title.clone()
            },
            panel_type: self.panel_type.as_str().to_string(),
            description: self.description.clone(),
            datasource: self.datasource_hint.clone(),
        }
    }
}

/// Panel picker entry.
#[derive(Debug, Clone, Serialize)]
pub struct PanelSummary {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub panel_type: String,
    pub description: String,
    pub datasource: DatasourceRef,
}

#[derive(Debug, Clone)]
pub struct DashboardDescriptor {
    pub uid: String,
    pub title: String,
    pub templating: Vec<TemplatingVar>,
    pub panels: Vec<PanelDescriptor>,
}

impl DashboardDescriptor {
    pub fn from_raw(requested_uid: &str, raw: RawDashboard) -> Self {
        let templating = raw
            .templating
            .list
            .into_iter()
            .map(|var| TemplatingVar {
                name: var.name,
                current: VarValue::from_json(var.current.and_then(|c| c.value)),
            })
            .collect();

        let mut flat = Vec::new();
        flatten_panels(raw.panels, &mut flat);

        Self {
            uid: if raw.uid.is_empty() {
                requested_uid.to_string()
            } else {
                raw.uid
            },
            title: raw.title,
            templating,
            panels: flat.into_iter().map(PanelDescriptor::from_raw).collect(),
        }
    }

    pub fn find_panel(&self, panel_id: i64) -> Option<&PanelDescriptor> {
        self.panels.iter().find(|p| p.id == panel_id)
    }
}

/// Hoist the children of row containers into a single ordered list.
pub fn flatten_panels(panels: Vec<RawPanel>, out: &mut Vec<RawPanel>) {
    for mut panel in panels {
        if panel.panel_type == ROW_PANEL_TYPE {
            let nested = std::mem::take(&mut panel.panels);
            flatten_panels(nested, out);
        } else {
            out.push(panel);
        }
    }
}
