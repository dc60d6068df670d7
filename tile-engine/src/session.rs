use tracing::{debug, info, warn};

use crate::backend::{SchemaSource, TileStore};
use crate::classifier::is_numeric;
use crate::domain::{Aggregation, DatabaseField, TextRow, TextRowKind};
use crate::dto::{Connection, Tile};
use crate::error::TileError;
use crate::normalizer::normalize_schema;
use crate::sql;
use crate::tile::{ChartType, EditorState, TileConfiguration, UiTileKind};
use crate::validation::{validate, ValidationError};

/// Identifies one schema fetch. Only the most recently issued token may
/// update the field pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRequest {
    pub token: RequestToken,
    pub connection_id: String,
}

/// Fetch and normalize the schema for `request`.
pub async fn load_fields(
    source: &dyn SchemaSource,
    request: &SchemaRequest,
) -> Result<Vec<DatabaseField>, TileError> {
    let payload = source.fetch_schema(&request.connection_id).await?;
    Ok(normalize_schema(source, &request.connection_id, &payload).await)
}

/// Connections a tile can be bound to.
pub async fn active_connections(source: &dyn SchemaSource) -> Result<Vec<Connection>, TileError> {
    let connections = source.list_connections().await?;
    let total = connections.len();
    let active: Vec<Connection> = connections.into_iter().filter(Connection::is_active).collect();
    debug!("{} of {} connections are active", active.len(), total);
    Ok(active)
}

/// State of one open tile editor. Dropped when the dialog closes, which
/// discards anything not saved.
#[derive(Debug, Clone)]
pub struct EditorSession {
    state: EditorState,
    fields: Vec<DatabaseField>,
    latest_request: u64,
    error_message: Option<String>,
}

impl EditorSession {
    pub fn new(state: EditorState) -> Self {
        Self {
            state,
            fields: Vec::new(),
            latest_request: 0,
            error_message: None,
        }
    }

    pub fn for_new_tile(dashboard_id: impl Into<String>, kind: UiTileKind) -> Self {
        Self::new(EditorState::new(dashboard_id, kind))
    }

    pub fn for_tile(tile: &Tile) -> Self {
        Self::new(EditorState::from_tile(tile))
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn fields(&self) -> &[DatabaseField] {
        &self.fields
    }

    pub fn numeric_fields(&self) -> impl Iterator<Item = &DatabaseField> {
        self.fields.iter().filter(|f| is_numeric(f))
    }

    pub fn field(&self, field_id: &str) -> Option<&DatabaseField> {
        self.fields.iter().find(|f| f.field_id() == field_id)
    }

    /// Last user-facing error, cleared by the next successful action.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.state.title = title.into();
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.state.description = description;
    }

    pub fn set_kind(&mut self, kind: UiTileKind) {
        self.state.kind = kind;
    }

    pub fn set_chart_type(&mut self, chart_type: ChartType) {
        self.state.chart_type = chart_type;
    }

    pub fn set_query_mode(&mut self, is_query_mode: bool) {
        self.state.is_query_mode = is_query_mode;
    }

    pub fn set_custom_query(&mut self, query: impl Into<String>) {
        self.state.custom_query = query.into();
    }

    /// Start loading `connection_id`. The field pool is emptied right away;
    /// switching to a different connection also drops the selection, since
    /// its fields belong to the previous database.
    pub fn begin_schema_fetch(&mut self, connection_id: &str) -> SchemaRequest {
        self.latest_request += 1;

        if self.state.connection_id.as_deref() != Some(connection_id) {
            if !self.state.selection.is_empty() {
                info!(
                    "Connection changed to {}, clearing field selection",
                    connection_id
                );
            }
            self.state.selection.clear();
        }
        self.state.connection_id = Some(connection_id.to_string());
        self.fields.clear();

        SchemaRequest {
            token: RequestToken(self.latest_request),
            connection_id: connection_id.to_string(),
        }
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token == RequestToken(self.latest_request)
    }

    /// Returns false (and changes nothing) when a newer fetch has been
    /// started since `token` was issued.
    pub fn complete_schema_fetch(
        &mut self,
        token: RequestToken,
        fields: Vec<DatabaseField>,
    ) -> bool {
        if !self.is_current(token) {
            debug!("Discarding stale schema response {:?}", token);
            return false;
        }

        info!("Loaded {} fields", fields.len());
        self.fields = fields;
        self.error_message = None;
        true
    }

    pub fn fail_schema_fetch(&mut self, token: RequestToken, error: &TileError) -> bool {
        if !self.is_current(token) {
            debug!("Ignoring failure of stale schema request {:?}", token);
            return false;
        }

        warn!("Schema fetch failed: {}", error);
        self.fields.clear();
        self.error_message = Some(format!("Failed to load schema: {}", error));
        true
    }

    /// Select a connection and load its fields.
    pub async fn select_connection(
        &mut self,
        source: &dyn SchemaSource,
        connection_id: &str,
    ) -> Result<usize, TileError> {
        let request = self.begin_schema_fetch(connection_id);
        match load_fields(source, &request).await {
            Ok(fields) => {
                let count = fields.len();
                self.complete_schema_fetch(request.token, fields);
                Ok(count)
            }
            Err(e) => {
                self.fail_schema_fetch(request.token, &e);
                Err(e)
            }
        }
    }

    /// Add a field from the current pool as a dimension. Ids not in the pool
    /// are ignored.
    pub fn add_dimension(&mut self, field_id: &str) -> bool {
        match self.fields.iter().find(|f| f.field_id() == field_id) {
            Some(field) => self.state.selection.add_dimension(field),
            None => {
                debug!("Field {} is not in the current schema", field_id);
                false
            }
        }
    }

    pub fn add_measure(&mut self, field_id: &str) -> bool {
        match self.fields.iter().find(|f| f.field_id() == field_id) {
            Some(field) => self.state.selection.add_measure(field),
            None => {
                debug!("Field {} is not in the current schema", field_id);
                false
            }
        }
    }

    pub fn remove_dimension(&mut self, index: usize) -> bool {
        self.state.selection.remove_dimension(index).is_some()
    }

    pub fn remove_measure(&mut self, index: usize) -> bool {
        self.state.selection.remove_measure(index).is_some()
    }

    pub fn set_aggregation(&mut self, index: usize, aggregation: Aggregation) -> bool {
        self.state.selection.set_aggregation(index, aggregation)
    }

    pub fn set_alias(&mut self, index: usize, alias: Option<String>) -> bool {
        self.state.selection.set_alias(index, alias)
    }

    /// Returns the new row's id.
    pub fn add_text_row(&mut self, kind: TextRowKind) -> String {
        let row = TextRow::new(kind, "");
        let id = row.id.clone();
        self.state.text_rows.push(row);
        id
    }

    pub fn update_text_row(&mut self, row_id: &str, content: impl Into<String>) -> bool {
        match self.text_row_mut(row_id) {
            Some(row) => {
                row.content = content.into();
                true
            }
            None => false,
        }
    }

    pub fn set_row_query(&mut self, row_id: &str, is_query: bool) -> bool {
        match self.text_row_mut(row_id) {
            Some(row) => {
                row.is_query = is_query;
                true
            }
            None => false,
        }
    }

    pub fn remove_text_row(&mut self, row_id: &str) -> bool {
        let before = self.state.text_rows.len();
        self.state.text_rows.retain(|r| r.id != row_id);
        self.state.text_rows.len() != before
    }

    fn text_row_mut(&mut self, row_id: &str) -> Option<&mut TextRow> {
        self.state.text_rows.iter_mut().find(|r| r.id == row_id)
    }

    /// SQL the current selection would be saved with.
    pub fn preview_sql(&self) -> String {
        let selection = &self.state.selection;
        match self.state.kind {
            UiTileKind::Metric => selection
                .measures()
                .first()
                .map(|m| sql::generate_metric(m, selection.field_table_map()))
                .unwrap_or_default(),
            _ => sql::generate_for(selection),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate(self.state.kind, &self.state)
    }

    /// Validate, build and persist the tile. Nothing reaches `store` when
    /// validation fails, and a failed save leaves the editor state as it was.
    pub async fn save(&mut self, store: &dyn TileStore) -> Result<Tile, TileError> {
        let config = match TileConfiguration::build(self.state.kind, &self.state) {
            Ok(config) => config,
            Err(e) => {
                warn!("Tile not saved: {}", e);
                self.error_message = Some(e.to_string());
                return Err(e.into());
            }
        };
        let dto = config.to_dto(&self.state)?;

        let result = match self.state.tile_id.as_deref() {
            Some(tile_id) => store.update_tile(tile_id, &dto).await,
            None => store.create_tile(&dto).await,
        };

        match result {
            Ok(tile) => {
                info!("Saved tile {} as {}", tile.id, tile.kind);
                self.state.tile_id = Some(tile.id.clone());
                self.error_message = None;
                Ok(tile)
            }
            Err(e) => {
                warn!("Failed to save tile (retryable: {}): {}", e.is_retryable(), e);
                self.error_message = Some(format!("Failed to save tile: {}", e));
                Err(e)
            }
        }
    }
}
