pub mod backend;
pub mod classifier;
pub mod client;
pub mod config;
pub mod domain;
pub mod dto;
pub mod error;
pub mod normalizer;
pub mod request;
pub mod selection;
pub mod session;
pub mod sql;
pub mod tile;
pub mod validation;

pub use backend::{SchemaSource, TileStore};
pub use client::ApiClient;
pub use config::ClientConfig;
pub use domain::{Aggregation, DatabaseField, DimensionField, MeasureField, TextRow, TextRowKind};
pub use dto::{Connection, PersistedTileKind, Position, Tile, TileDto};
pub use error::TileError;
pub use selection::{FieldTableMap, SelectionSet};
pub use session::{EditorSession, RequestToken, SchemaRequest};
pub use tile::{ChartType, EditorState, TileConfiguration, UiChartType, UiTileKind};
pub use validation::ValidationError;
