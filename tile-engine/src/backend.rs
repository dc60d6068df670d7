use async_trait::async_trait;
use serde_json::Value;

use crate::dto::{Connection, Tile, TileDto};
use crate::error::TileError;

/// Read side of the connection schema service.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// `GET /connections/{id}/schema`, returned untouched.
    async fn fetch_schema(&self, connection_id: &str) -> Result<Value, TileError>;

    /// `GET /connections/{id}/schema/{schema}/{table}`, for payloads that only
    /// list table names.
    async fn fetch_table_columns(
        &self,
        connection_id: &str,
        schema: &str,
        table: &str,
    ) -> Result<Value, TileError>;

    /// Every registered connection; callers filter on status.
    async fn list_connections(&self) -> Result<Vec<Connection>, TileError>;
}

#[async_trait]
pub trait TileStore: Send + Sync {
    async fn create_tile(&self, dto: &TileDto) -> Result<Tile, TileError>;

    async fn update_tile(&self, tile_id: &str, dto: &TileDto) -> Result<Tile, TileError>;
}
