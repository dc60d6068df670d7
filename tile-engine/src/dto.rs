use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tile types the backend persists. Narrower than [`crate::tile::UiTileKind`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PersistedTileKind {
    #[serde(rename = "chart")]
    Chart,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "kpi")]
    Kpi,
}

impl PersistedTileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistedTileKind::Chart => "chart",
            PersistedTileKind::Text => "text",
            PersistedTileKind::Kpi => "kpi",
        }
    }
}

impl std::fmt::Display for PersistedTileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Connection {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Body of the tile create/update calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TileDto {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: PersistedTileKind,
    pub dashboard_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: PersistedTileKind,
    pub dashboard_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(default)]
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Tile {
    /// The tile as persisted, with a fresh id and creation time. Used by
    /// stores that have no server to assign them.
    pub fn from_dto(id: impl Into<String>, dto: &TileDto) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: dto.title.clone(),
            description: dto.description.clone(),
            kind: dto.kind,
            dashboard_id: dto.dashboard_id.clone(),
            connection_id: dto.connection_id.clone(),
            config: dto.config.clone(),
            position: dto.position,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}
