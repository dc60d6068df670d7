//! Tile configuration building
//!
//! The editor offers five tile kinds while the backend stores three. The
//! narrowing is lossy, so every persisted configuration carries the editor's
//! own kind (`uiType`) and chart style (`uiChartType`) in its payload, and
//! loading prefers those tags over the backend type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{DimensionField, MeasureField, TextRow};
use crate::dto::{PersistedTileKind, Position, Tile, TileDto};
use crate::selection::{FieldTableMap, SelectionSet};
use crate::sql;
use crate::validation::{validate, ValidationError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum UiTileKind {
    #[default]
    #[serde(rename = "chart")]
    Chart,
    #[serde(rename = "table")]
    Table,
    #[serde(rename = "metric")]
    Metric,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "query")]
    Query,
}

impl UiTileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UiTileKind::Chart => "chart",
            UiTileKind::Table => "table",
            UiTileKind::Metric => "metric",
            UiTileKind::Text => "text",
            UiTileKind::Query => "query",
        }
    }

    pub fn persisted(&self) -> PersistedTileKind {
        match self {
            UiTileKind::Chart | UiTileKind::Table => PersistedTileKind::Chart,
            UiTileKind::Metric => PersistedTileKind::Kpi,
            UiTileKind::Text | UiTileKind::Query => PersistedTileKind::Text,
        }
    }

    /// Default for tiles saved without a `uiType` tag.
    pub fn from_legacy(kind: PersistedTileKind) -> Self {
        match kind {
            PersistedTileKind::Chart => UiTileKind::Chart,
            PersistedTileKind::Text => UiTileKind::Text,
            PersistedTileKind::Kpi => UiTileKind::Metric,
        }
    }
}

impl std::fmt::Display for UiTileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Chart types the backend renders.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ChartType {
    #[default]
    #[serde(rename = "bar")]
    Bar,
    #[serde(rename = "line")]
    Line,
    #[serde(rename = "pie")]
    Pie,
    #[serde(rename = "donut")]
    Donut,
}

/// Chart style as the editor knows it; `table` exists only here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UiChartType {
    #[serde(rename = "bar")]
    Bar,
    #[serde(rename = "line")]
    Line,
    #[serde(rename = "pie")]
    Pie,
    #[serde(rename = "donut")]
    Donut,
    #[serde(rename = "table")]
    Table,
}

impl From<ChartType> for UiChartType {
    fn from(chart_type: ChartType) -> Self {
        match chart_type {
            ChartType::Bar => UiChartType::Bar,
            ChartType::Line => UiChartType::Line,
            ChartType::Pie => UiChartType::Pie,
            ChartType::Donut => UiChartType::Donut,
        }
    }
}

impl UiChartType {
    pub fn chart_type(&self) -> Option<ChartType> {
        match self {
            UiChartType::Bar => Some(ChartType::Bar),
            UiChartType::Line => Some(ChartType::Line),
            UiChartType::Pie => Some(ChartType::Pie),
            UiChartType::Donut => Some(ChartType::Donut),
            UiChartType::Table => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryBody {
    Sql(String),
    Rows(Vec<TextRow>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TileShape {
    Chart {
        chart_type: ChartType,
        dimensions: Vec<DimensionField>,
        measures: Vec<MeasureField>,
    },
    Table {
        dimensions: Vec<DimensionField>,
        measures: Vec<MeasureField>,
    },
    Metric {
        measure: MeasureField,
    },
    Text {
        rows: Vec<TextRow>,
    },
    Query(QueryBody),
}

/// The JSON stored in a tile's `config` column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_type: Option<UiTileKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_chart_type: Option<UiChartType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<ChartType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<DimensionField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measures: Vec<MeasureField>,
    #[serde(default, skip_serializing_if = "FieldTableMap::is_empty")]
    pub field_table_map: FieldTableMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_rows: Vec<TextRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_query: Option<String>,
    #[serde(default)]
    pub is_query_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// Everything the open editor dialog holds for one tile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorState {
    pub tile_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub dashboard_id: String,
    pub connection_id: Option<String>,
    pub position: Option<Position>,
    pub kind: UiTileKind,
    pub chart_type: ChartType,
    pub selection: SelectionSet,
    pub text_rows: Vec<TextRow>,
    pub custom_query: String,
    pub is_query_mode: bool,
}

impl EditorState {
    pub fn new(dashboard_id: impl Into<String>, kind: UiTileKind) -> Self {
        Self {
            dashboard_id: dashboard_id.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn has_connection(&self) -> bool {
        self.connection_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }

    /// Reopen a persisted tile for editing.
    pub fn from_tile(tile: &Tile) -> Self {
        let payload = match serde_json::from_value::<ConfigPayload>(tile.config.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Tile {} has an unreadable config, starting empty: {}", tile.id, e);
                ConfigPayload::default()
            }
        };

        let kind = match (payload.ui_type, payload.ui_chart_type) {
            (Some(kind), _) => kind,
            (None, Some(UiChartType::Table)) => UiTileKind::Table,
            (None, _) => {
                debug!("Tile {} has no uiType tag, using legacy mapping", tile.id);
                UiTileKind::from_legacy(tile.kind)
            }
        };

        let chart_type = payload
            .ui_chart_type
            .and_then(|t| t.chart_type())
            .or(payload.chart_type)
            .unwrap_or_default();

        let selection =
            SelectionSet::from_parts(payload.dimensions, payload.measures, &payload.field_table_map);

        Self {
            tile_id: Some(tile.id.clone()),
            title: tile.title.clone(),
            description: tile.description.clone(),
            dashboard_id: tile.dashboard_id.clone(),
            connection_id: tile.connection_id.clone(),
            position: tile.position,
            kind,
            chart_type,
            selection,
            text_rows: payload.text_rows,
            custom_query: payload.custom_query.unwrap_or_default(),
            is_query_mode: payload.is_query_mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileConfiguration {
    pub shape: TileShape,
    /// Generated (or, in query mode, user-written) SQL for data-bound tiles.
    pub sql: Option<String>,
    pub field_tables: FieldTableMap,
}

impl TileConfiguration {
    /// Validate `state` for `kind` and produce the configuration to persist.
    pub fn build(kind: UiTileKind, state: &EditorState) -> Result<Self, ValidationError> {
        validate(kind, state)?;

        let selection = &state.selection;
        let field_tables = selection.field_table_map().clone();

        let (shape, sql) = match kind {
            UiTileKind::Chart => (
                TileShape::Chart {
                    chart_type: state.chart_type,
                    dimensions: selection.dimensions().to_vec(),
                    measures: selection.measures().to_vec(),
                },
                Some(sql::generate_for(selection)),
            ),
            UiTileKind::Table => (
                TileShape::Table {
                    dimensions: selection.dimensions().to_vec(),
                    measures: selection.measures().to_vec(),
                },
                Some(sql::generate_for(selection)),
            ),
            UiTileKind::Metric => {
                let measure = selection
                    .measures()
                    .first()
                    .cloned()
                    .ok_or(ValidationError::MissingMeasure)?;
                if selection.measures().len() > 1 {
                    debug!(
                        "Metric tile keeps {} and ignores {} other measures",
                        measure.field_id,
                        selection.measures().len() - 1
                    );
                }
                let sql = sql::generate_metric(&measure, &field_tables);
                (TileShape::Metric { measure }, Some(sql))
            }
            UiTileKind::Text => (
                TileShape::Text {
                    rows: rows_with_content(&state.text_rows),
                },
                None,
            ),
            UiTileKind::Query if state.is_query_mode => {
                let query = state.custom_query.trim().to_string();
                (TileShape::Query(QueryBody::Sql(query.clone())), Some(query))
            }
            UiTileKind::Query => (
                TileShape::Query(QueryBody::Rows(rows_with_content(&state.text_rows))),
                None,
            ),
        };

        Ok(Self {
            shape,
            sql,
            field_tables,
        })
    }

    pub fn ui_kind(&self) -> UiTileKind {
        match self.shape {
            TileShape::Chart { .. } => UiTileKind::Chart,
            TileShape::Table { .. } => UiTileKind::Table,
            TileShape::Metric { .. } => UiTileKind::Metric,
            TileShape::Text { .. } => UiTileKind::Text,
            TileShape::Query(_) => UiTileKind::Query,
        }
    }

    pub fn persisted_kind(&self) -> PersistedTileKind {
        self.ui_kind().persisted()
    }

    pub fn ui_chart_type(&self) -> Option<UiChartType> {
        match &self.shape {
            TileShape::Chart { chart_type, .. } => Some((*chart_type).into()),
            TileShape::Table { .. } => Some(UiChartType::Table),
            _ => None,
        }
    }

    pub fn to_payload(&self) -> ConfigPayload {
        let mut payload = ConfigPayload {
            ui_type: Some(self.ui_kind()),
            ui_chart_type: self.ui_chart_type(),
            query: self.sql.clone().filter(|q| !q.is_empty()),
            ..Default::default()
        };

        match &self.shape {
            TileShape::Chart {
                chart_type,
                dimensions,
                measures,
            } => {
                payload.chart_type = Some(*chart_type);
                payload.dimensions = dimensions.clone();
                payload.measures = measures.clone();
                payload.field_table_map = self.field_tables.clone();
            }
            TileShape::Table {
                dimensions,
                measures,
            } => {
                // The backend has no table chart; it only needs a type it renders.
                payload.chart_type = Some(ChartType::Bar);
                payload.dimensions = dimensions.clone();
                payload.measures = measures.clone();
                payload.field_table_map = self.field_tables.clone();
            }
            TileShape::Metric { measure } => {
                payload.measures = vec![measure.clone()];
                payload.field_table_map = self
                    .field_tables
                    .table_for(&measure.field_id)
                    .map(|table| [(measure.field_id.clone(), table.to_string())])
                    .into_iter()
                    .flatten()
                    .collect();
            }
            TileShape::Text { rows } => {
                payload.text_rows = rows.clone();
            }
            TileShape::Query(QueryBody::Sql(query)) => {
                payload.is_query_mode = true;
                payload.custom_query = Some(query.clone());
            }
            TileShape::Query(QueryBody::Rows(rows)) => {
                payload.text_rows = rows.clone();
            }
        }

        payload
    }

    pub fn to_dto(&self, state: &EditorState) -> Result<TileDto, serde_json::Error> {
        let config: Value = serde_json::to_value(self.to_payload())?;
        Ok(TileDto {
            title: state.title.trim().to_string(),
            description: state
                .description
                .clone()
                .filter(|d| !d.trim().is_empty()),
            kind: self.persisted_kind(),
            dashboard_id: state.dashboard_id.clone(),
            connection_id: state.connection_id.clone().filter(|c| !c.trim().is_empty()),
            config,
            position: state.position,
        })
    }
}

fn rows_with_content(rows: &[TextRow]) -> Vec<TextRow> {
    rows.iter().filter(|r| r.has_content()).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DatabaseField, TextRowKind};
    use serde_json::json;

    fn chart_state(kind: UiTileKind) -> EditorState {
        let mut state = EditorState::new("dash_1", kind);
        state.title = "Revenue by region".to_string();
        state.connection_id = Some("conn_1".to_string());
        state
            .selection
            .add_dimension(&DatabaseField::new("orders", "region", "varchar"));
        state
            .selection
            .add_measure(&DatabaseField::new("orders", "amount", "numeric"));
        state
    }

    fn persisted(config: &TileConfiguration, state: &EditorState) -> Tile {
        let dto = config.to_dto(state).expect("config serializes");
        Tile::from_dto("tile_1", &dto)
    }

    #[test]
    fn test_kind_narrowing() {
        assert_eq!(UiTileKind::Chart.persisted(), PersistedTileKind::Chart);
        assert_eq!(UiTileKind::Table.persisted(), PersistedTileKind::Chart);
        assert_eq!(UiTileKind::Metric.persisted(), PersistedTileKind::Kpi);
        assert_eq!(UiTileKind::Text.persisted(), PersistedTileKind::Text);
        assert_eq!(UiTileKind::Query.persisted(), PersistedTileKind::Text);
    }

    #[test]
    fn test_table_tile_round_trips_as_table() {
        let state = chart_state(UiTileKind::Table);
        let config = TileConfiguration::build(UiTileKind::Table, &state).unwrap();
        let tile = persisted(&config, &state);

        assert_eq!(tile.kind, PersistedTileKind::Chart);
        assert_eq!(tile.config["uiType"], json!("table"));
        assert_eq!(tile.config["uiChartType"], json!("table"));

        let reloaded = EditorState::from_tile(&tile);
        assert_eq!(reloaded.kind, UiTileKind::Table);
        assert_eq!(reloaded.selection, state.selection);
    }

    #[test]
    fn test_chart_tile_keeps_chart_type() {
        let mut state = chart_state(UiTileKind::Chart);
        state.chart_type = ChartType::Donut;
        let config = TileConfiguration::build(UiTileKind::Chart, &state).unwrap();

        assert_eq!(
            config.sql.as_deref(),
            Some("SELECT orders.region, sum(orders.amount) as amount_sum FROM orders GROUP BY orders.region")
        );

        let reloaded = EditorState::from_tile(&persisted(&config, &state));
        assert_eq!(reloaded.kind, UiTileKind::Chart);
        assert_eq!(reloaded.chart_type, ChartType::Donut);
    }

    #[test]
    fn test_metric_keeps_first_measure_only() {
        let mut state = chart_state(UiTileKind::Metric);
        state
            .selection
            .add_measure(&DatabaseField::new("orders", "quantity", "int"));

        let config = TileConfiguration::build(UiTileKind::Metric, &state).unwrap();

        let TileShape::Metric { measure } = &config.shape else {
            panic!("expected metric shape");
        };
        assert_eq!(measure.field_id, "orders.amount");
        assert_eq!(
            config.sql.as_deref(),
            Some("SELECT sum(orders.amount) as amount_sum FROM orders")
        );
        assert_eq!(config.persisted_kind(), PersistedTileKind::Kpi);
    }

    #[test]
    fn test_text_tile_drops_blank_rows() {
        let mut state = EditorState::new("dash_1", UiTileKind::Text);
        state.title = "Notes".to_string();
        state.text_rows = vec![
            TextRow::new(TextRowKind::Header, "Quarterly summary"),
            TextRow::new(TextRowKind::Text, "   "),
        ];

        let config = TileConfiguration::build(UiTileKind::Text, &state).unwrap();

        assert_eq!(
            config.shape,
            TileShape::Text {
                rows: vec![state.text_rows[0].clone()]
            }
        );
        assert_eq!(config.sql, None);
    }

    #[test]
    fn test_query_mode_round_trip() {
        let mut state = EditorState::new("dash_1", UiTileKind::Query);
        state.title = "Raw".to_string();
        state.connection_id = Some("conn_1".to_string());
        state.is_query_mode = true;
        state.custom_query = " SELECT count(*) FROM orders ".to_string();

        let config = TileConfiguration::build(UiTileKind::Query, &state).unwrap();
        let tile = persisted(&config, &state);

        assert_eq!(tile.kind, PersistedTileKind::Text);
        let reloaded = EditorState::from_tile(&tile);
        assert_eq!(reloaded.kind, UiTileKind::Query);
        assert!(reloaded.is_query_mode);
        assert_eq!(reloaded.custom_query, "SELECT count(*) FROM orders");
    }

    #[test]
    fn test_legacy_tiles_use_default_mapping() {
        let legacy = |kind: PersistedTileKind| Tile {
            id: "legacy".to_string(),
            title: "Old".to_string(),
            description: None,
            kind,
            dashboard_id: "dash_1".to_string(),
            connection_id: None,
            config: json!({ "chartType": "line" }),
            position: None,
            created_at: None,
            updated_at: None,
        };

        let chart = EditorState::from_tile(&legacy(PersistedTileKind::Chart));
        assert_eq!(chart.kind, UiTileKind::Chart);
        assert_eq!(chart.chart_type, ChartType::Line);
        assert_eq!(
            EditorState::from_tile(&legacy(PersistedTileKind::Kpi)).kind,
            UiTileKind::Metric
        );
        assert_eq!(
            EditorState::from_tile(&legacy(PersistedTileKind::Text)).kind,
            UiTileKind::Text
        );
    }

    #[test]
    fn test_unreadable_config_loads_empty() {
        let tile = Tile {
            id: "broken".to_string(),
            title: "Broken".to_string(),
            description: None,
            kind: PersistedTileKind::Kpi,
            dashboard_id: "dash_1".to_string(),
            connection_id: None,
            config: json!({ "measures": "not a list" }),
            position: None,
            created_at: None,
            updated_at: None,
        };

        let state = EditorState::from_tile(&tile);
        assert_eq!(state.kind, UiTileKind::Metric);
        assert!(state.selection.is_empty());
    }
}
