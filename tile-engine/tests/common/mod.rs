#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, Once};

use tile_engine::{Connection, SchemaSource, Tile, TileDto, TileError, TileStore};

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

/// Schema service backed by canned payloads.
#[derive(Default)]
pub struct FakeSchemaSource {
    pub schemas: HashMap<String, Value>,
    pub columns: HashMap<(String, String), Value>,
    pub failing_tables: HashSet<(String, String)>,
    pub connections: Vec<Connection>,
    pub column_requests: Mutex<Vec<String>>,
}

impl FakeSchemaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, connection_id: &str, payload: Value) -> Self {
        self.schemas.insert(connection_id.to_string(), payload);
        self
    }

    pub fn with_columns(mut self, schema: &str, table: &str, columns: Value) -> Self {
        self.columns
            .insert((schema.to_string(), table.to_string()), columns);
        self
    }

    pub fn with_failing_table(mut self, schema: &str, table: &str) -> Self {
        self.failing_tables
            .insert((schema.to_string(), table.to_string()));
        self
    }

    pub fn with_connection(mut self, id: &str, status: &str) -> Self {
        self.connections.push(Connection {
            id: id.to_string(),
            name: format!("Connection {}", id),
            connection_type: Some("postgres".to_string()),
            status: status.to_string(),
            created_at: None,
        });
        self
    }

    pub fn column_requests(&self) -> Vec<String> {
        self.column_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SchemaSource for FakeSchemaSource {
    async fn fetch_schema(&self, connection_id: &str) -> Result<Value, TileError> {
        self.schemas
            .get(connection_id)
            .cloned()
            .ok_or_else(|| TileError::SchemaFetchFailed {
                connection_id: connection_id.to_string(),
                message: "404 Not Found".to_string(),
            })
    }

    async fn fetch_table_columns(
        &self,
        connection_id: &str,
        schema: &str,
        table: &str,
    ) -> Result<Value, TileError> {
        self.column_requests
            .lock()
            .unwrap()
            .push(format!("{}.{}", schema, table));

        let key = (schema.to_string(), table.to_string());
        if self.failing_tables.contains(&key) {
            return Err(TileError::SchemaFetchFailed {
                connection_id: connection_id.to_string(),
                message: "500 Internal Server Error".to_string(),
            });
        }
        Ok(self.columns.get(&key).cloned().unwrap_or_else(|| json!([])))
    }

    async fn list_connections(&self) -> Result<Vec<Connection>, TileError> {
        Ok(self.connections.clone())
    }
}

/// Tile persistence that keeps everything in memory and records each call.
#[derive(Default)]
pub struct MemoryTileStore {
    pub tiles: Mutex<HashMap<String, Tile>>,
    pub calls: Mutex<Vec<String>>,
    pub fail_with: Mutex<Option<String>>,
}

impl MemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn tile(&self, id: &str) -> Option<Tile> {
        self.tiles.lock().unwrap().get(id).cloned()
    }

    fn take_failure(&self) -> Option<TileError> {
        self.fail_with
            .lock()
            .unwrap()
            .take()
            .map(|message| TileError::PersistenceFailed { message })
    }
}

#[async_trait]
impl TileStore for MemoryTileStore {
    async fn create_tile(&self, dto: &TileDto) -> Result<Tile, TileError> {
        self.calls.lock().unwrap().push("create".to_string());
        if let Some(err) = self.take_failure() {
            return Err(err);
        }

        let mut tiles = self.tiles.lock().unwrap();
        let tile = Tile::from_dto(format!("tile_{}", tiles.len() + 1), dto);
        tiles.insert(tile.id.clone(), tile.clone());
        Ok(tile)
    }

    async fn update_tile(&self, tile_id: &str, dto: &TileDto) -> Result<Tile, TileError> {
        self.calls.lock().unwrap().push(format!("update {}", tile_id));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }

        let mut tiles = self.tiles.lock().unwrap();
        if !tiles.contains_key(tile_id) {
            return Err(TileError::TileNotFound {
                tile_id: tile_id.to_string(),
            });
        }
        let tile = Tile::from_dto(tile_id, dto);
        tiles.insert(tile.id.clone(), tile.clone());
        Ok(tile)
    }
}

/// Array-of-tables payload for a small orders database.
pub fn orders_schema() -> Value {
    json!([
        {
            "name": "orders",
            "columns": [
                { "name": "id", "type": "bigint" },
                { "name": "region", "type": "varchar" },
                { "name": "amount", "type": "numeric(12,2)" },
                { "name": "created_at", "type": "timestamp" }
            ]
        },
        {
            "table_name": "customers",
            "columns": [
                { "column_name": "id", "data_type": "integer" },
                { "column_name": "segment", "data_type": "text" }
            ]
        }
    ])
}
