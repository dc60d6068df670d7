use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::backend::{SchemaSource, TileStore};
use crate::config::ClientConfig;
use crate::dto::{Connection, Tile, TileDto};
use crate::error::TileError;

/// REST client for the dashboard backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, TileError> {
        info!("Creating dashboard API client for {}", config.base_url);

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TileError::ConfigError {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, TileError> {
        let url = self.config.endpoint(segments)?;
        debug!("{} {}", method, url);

        let builder = self.http.request(method, url);
        Ok(match &self.config.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ResponseError> {
        let response = builder.send().await.map_err(ResponseError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ResponseError::Status { status, body });
        }
        response.json::<T>().await.map_err(ResponseError::Transport)
    }
}

enum ResponseError {
    Transport(reqwest::Error),
    Status { status: StatusCode, body: String },
}

impl ResponseError {
    fn describe(&self) -> String {
        match self {
            ResponseError::Transport(e) => e.to_string(),
            ResponseError::Status { status, body } if body.trim().is_empty() => status.to_string(),
            ResponseError::Status { status, body } => format!("{}: {}", status, body.trim()),
        }
    }

    fn into_schema_error(self, connection_id: &str) -> TileError {
        TileError::SchemaFetchFailed {
            connection_id: connection_id.to_string(),
            message: self.describe(),
        }
    }

    fn into_persistence_error(self, tile_id: Option<&str>) -> TileError {
        match (self, tile_id) {
            (ResponseError::Transport(e), _) => TileError::HttpError(e),
            (ResponseError::Status { status, .. }, Some(tile_id))
                if status == StatusCode::NOT_FOUND =>
            {
                TileError::TileNotFound {
                    tile_id: tile_id.to_string(),
                }
            }
            (err, _) => TileError::PersistenceFailed {
                message: err.describe(),
            },
        }
    }
}

#[async_trait]
impl SchemaSource for ApiClient {
    async fn fetch_schema(&self, connection_id: &str) -> Result<Value, TileError> {
        info!("Fetching schema for connection {}", connection_id);

        let builder = self.request(Method::GET, &["connections", connection_id, "schema"])?;
        Self::send(builder)
            .await
            .map_err(|e| e.into_schema_error(connection_id))
    }

    async fn fetch_table_columns(
        &self,
        connection_id: &str,
        schema: &str,
        table: &str,
    ) -> Result<Value, TileError> {
        let builder = self.request(
            Method::GET,
            &["connections", connection_id, "schema", schema, table],
        )?;
        Self::send(builder)
            .await
            .map_err(|e| e.into_schema_error(connection_id))
    }

    async fn list_connections(&self) -> Result<Vec<Connection>, TileError> {
        let builder = self.request(Method::GET, &["connections"])?;
        let connections: Vec<Connection> =
            Self::send(builder)
                .await
                .map_err(|e| TileError::ConnectionListFailed {
                    message: e.describe(),
                })?;

        info!("Backend returned {} connections", connections.len());
        Ok(connections)
    }
}

#[async_trait]
impl TileStore for ApiClient {
    async fn create_tile(&self, dto: &TileDto) -> Result<Tile, TileError> {
        info!(
            "Creating {} tile '{}' on dashboard {}",
            dto.kind, dto.title, dto.dashboard_id
        );

        let builder = self.request(Method::POST, &["tiles"])?.json(dto);
        Self::send(builder)
            .await
            .map_err(|e| e.into_persistence_error(None))
    }

    async fn update_tile(&self, tile_id: &str, dto: &TileDto) -> Result<Tile, TileError> {
        info!("Updating tile {} ('{}')", tile_id, dto.title);

        let builder = self.request(Method::PUT, &["tiles", tile_id])?.json(dto);
        Self::send(builder)
            .await
            .map_err(|e| e.into_persistence_error(Some(tile_id)))
    }
}
