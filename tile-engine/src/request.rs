use serde::Deserialize;
use std::path::Path;
use tracing::warn;

use crate::domain::Aggregation;
use crate::error::TileError;
use crate::session::EditorSession;
use crate::tile::UiTileKind;

/// A measure entry: either a bare field id or a field id with aggregation
/// and alias.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum MeasureRequest {
    Field(String),
    Detailed {
        field: String,
        #[serde(default)]
        aggregation: Option<Aggregation>,
        #[serde(default)]
        alias: Option<String>,
    },
}

impl MeasureRequest {
    pub fn field(&self) -> &str {
        match self {
            MeasureRequest::Field(field) => field,
            MeasureRequest::Detailed { field, .. } => field,
        }
    }
}

/// A field selection described in JSON, by field id (`table.column`).
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct SelectionRequest {
    #[serde(default)]
    pub kind: Option<UiTileKind>,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub measures: Vec<MeasureRequest>,
}

impl SelectionRequest {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TileError> {
        let path_str = path.as_ref().display().to_string();
        let contents = std::fs::read_to_string(&path).map_err(|e| TileError::IoError {
            message: format!("Failed to read '{}': {}", path_str, e),
        })?;
        Self::parse(&contents)
    }

    pub fn parse(json: &str) -> Result<Self, TileError> {
        serde_json::from_str(json).map_err(TileError::from)
    }

    /// Add the requested fields to `session`. Returns the ids that were not
    /// accepted (unknown, duplicate, or non-numeric measures).
    pub fn apply(&self, session: &mut EditorSession) -> Vec<String> {
        let mut rejected = Vec::new();

        if let Some(kind) = self.kind {
            session.set_kind(kind);
        }

        for field_id in &self.dimensions {
            if !session.add_dimension(field_id) {
                rejected.push(field_id.clone());
            }
        }

        for measure in &self.measures {
            if !session.add_measure(measure.field()) {
                rejected.push(measure.field().to_string());
                continue;
            }
            if let MeasureRequest::Detailed {
                aggregation, alias, ..
            } = measure
            {
                let index = session.state().selection.measures().len() - 1;
                if let Some(aggregation) = aggregation {
                    session.set_aggregation(index, *aggregation);
                }
                session.set_alias(index, alias.clone());
            }
        }

        if !rejected.is_empty() {
            warn!("Ignored {} requested fields: {:?}", rejected.len(), rejected);
        }
        rejected
    }
}
