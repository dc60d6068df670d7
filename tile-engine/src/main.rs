use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tile_engine::classifier::is_numeric;
use tile_engine::request::SelectionRequest;
use tile_engine::session::active_connections;
use tile_engine::{ApiClient, ClientConfig, EditorSession, UiTileKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tile_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting tile engine v{}", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    let Some(connection_id) = args.next() else {
        bail!("usage: tile-engine <connection-id> [selection.json]");
    };
    let selection_path = args.next();

    let config = ClientConfig::from_env().context("Failed to load client configuration")?;

    info!("Configuration loaded:");
    info!("  API base URL: {}", config.base_url);
    info!(
        "  API token: {}",
        if config.api_token.is_some() { "***" } else { "<none>" }
    );
    info!("  HTTP timeout: {}s", config.timeout.as_secs());

    let client = ApiClient::new(config)?;

    let connections = active_connections(&client)
        .await
        .context("Failed to list connections")?;
    if !connections.iter().any(|c| c.id == connection_id) {
        warn!(
            "Connection {} is not among the {} active connections",
            connection_id,
            connections.len()
        );
    }

    let mut session = EditorSession::for_new_tile("cli", UiTileKind::Table);
    let field_count = session
        .select_connection(&client, &connection_id)
        .await
        .with_context(|| format!("Failed to load schema for connection {}", connection_id))?;
    info!("Connection {} exposes {} fields", connection_id, field_count);

    for field in session.fields() {
        let line = serde_json::json!({
            "fieldId": field.field_id(),
            "name": field.name,
            "type": field.data_type,
            "table": field.table,
            "numeric": is_numeric(field),
        });
        println!("{}", line);
    }

    if let Some(path) = selection_path {
        let request = SelectionRequest::load(&path)
            .with_context(|| format!("Failed to read selection file {}", path))?;
        let rejected = request.apply(&mut session);
        if !rejected.is_empty() {
            warn!("Fields not added: {}", rejected.join(", "));
        }

        let sql = session.preview_sql();
        if sql.is_empty() {
            bail!("Selection needs at least one dimension and one measure to produce SQL");
        }
        println!("{}", sql);
    }

    Ok(())
}
