// Datasource domain model and default-datasource resolution
use super::error::PanelError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasourceRef {
    pub uid: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl DatasourceRef {
    pub fn new(uid: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            kind: kind.into(),
        }
    }
}

/// Entry of `GET /api/datasources`.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasourceDescriptor {
    pub id: i64,
    pub uid: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "isDefault", default)]
    pub is_default: bool,
}

impl DatasourceDescriptor {
    pub fn reference(&self) -> DatasourceRef {
        DatasourceRef::new(self.uid.clone(), self.kind.clone())
    }
}

/// Pick the default datasource of the required type.
pub fn resolve_default<'a>(
    required_type: &str,
    datasources: &'a [DatasourceDescriptor],
) -> Result<&'a DatasourceDescriptor, PanelError> {
    let mut matching = datasources
        .iter()
        .filter(|ds| ds.kind == required_type && ds.is_default);

    let resolved = matching
        .next()
        .ok_or_else(|| PanelError::NoDatasource(required_type.to_string()))?;

    if matching.next().is_some() {
        tracing::warn!(
            "More than one default {} datasource configured, using {} ({})",
            required_type,
            resolved.name,
            resolved.uid
        );
    }

    Ok(resolved)
}
