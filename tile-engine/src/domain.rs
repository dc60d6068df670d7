use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use uuid::Uuid;

/// One column of a connection's schema snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseField {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DatabaseField {
    pub fn new(
        table: impl Into<String>,
        name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            table: table.into(),
            description: None,
        }
    }

    /// Stable selection key, `table.name`.
    pub fn field_id(&self) -> String {
        field_id(&self.table, &self.name)
    }
}

pub fn field_id(table: &str, name: &str) -> String {
    format!("{}.{}", table, name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Aggregation {
    #[default]
    #[serde(rename = "sum")]
    Sum,
    #[serde(rename = "avg")]
    Avg,
    #[serde(rename = "min")]
    Min,
    #[serde(rename = "max")]
    Max,
    #[serde(rename = "count")]
    Count,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Avg => "avg",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Count => "count",
        }
    }
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionField {
    pub field_id: String,
    pub field_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
}

impl DimensionField {
    pub fn new(field_id: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            field_name: field_name.into(),
            aggregation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureField {
    pub field_id: String,
    pub field_name: String,
    #[serde(default)]
    pub aggregation: Aggregation,
    /// Explicit alias set by the user. `None` means the alias follows the
    /// aggregation, see [`MeasureField::alias`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl MeasureField {
    pub fn new(
        field_id: impl Into<String>,
        field_name: impl Into<String>,
        aggregation: Aggregation,
    ) -> Self {
        Self {
            field_id: field_id.into(),
            field_name: field_name.into(),
            aggregation,
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn alias(&self) -> Cow<'_, str> {
        match self.alias.as_deref() {
            Some(alias) if !alias.trim().is_empty() => Cow::Borrowed(alias),
            _ => Cow::Owned(format!("{}_{}", self.field_name, self.aggregation)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextRowKind {
    #[serde(rename = "header")]
    Header,
    #[serde(rename = "subheader")]
    Subheader,
    #[default]
    #[serde(rename = "text")]
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRow {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: TextRowKind,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_query: bool,
}

impl TextRow {
    pub fn new(kind: TextRowKind, content: impl Into<String>) -> Self {
        Self {
            id: format!("row_{}", Uuid::new_v4().simple()),
            kind,
            content: content.into(),
            is_query: false,
        }
    }

    /// A row whose content is SQL run against the tile's connection at
    /// render time.
    pub fn query(content: impl Into<String>) -> Self {
        Self {
            is_query: true,
            ..Self::new(TextRowKind::Text, content)
        }
    }

    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}
