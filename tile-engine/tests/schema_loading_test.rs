mod common;

use common::{init_test_logging, orders_schema, FakeSchemaSource};
use serde_json::json;
use tile_engine::session::{active_connections, load_fields};
use tile_engine::{EditorSession, TileError, UiTileKind};

#[tokio::test]
async fn test_selecting_a_connection_loads_its_fields() {
    init_test_logging();

    // Given: a connection whose schema lists tables with inline columns
    let source = FakeSchemaSource::new().with_schema("conn_1", orders_schema());
    let mut session = EditorSession::for_new_tile("dash_1", UiTileKind::Chart);

    // When
    let count = session.select_connection(&source, "conn_1").await.unwrap();

    // Then: every column becomes a field keyed by table and name
    assert_eq!(count, 6);
    assert_eq!(session.state().connection_id.as_deref(), Some("conn_1"));
    assert!(session.field("customers.segment").is_some());

    let numeric: Vec<String> = session.numeric_fields().map(|f| f.field_id()).collect();
    assert_eq!(
        numeric,
        vec!["orders.id", "orders.amount", "customers.id"]
    );
}

#[tokio::test]
async fn test_two_level_schema_skips_tables_that_fail() {
    init_test_logging();

    // Given: a schema listing three tables, one of which cannot be described
    let source = FakeSchemaSource::new()
        .with_schema(
            "warehouse",
            json!({
                "schemas": ["public", "sales"],
                "tables": {
                    "public": ["users"],
                    "sales": ["orders", "refunds"]
                }
            }),
        )
        .with_columns(
            "public",
            "users",
            json!([{ "name": "country", "type": "text" }]),
        )
        .with_failing_table("sales", "orders")
        .with_columns(
            "sales",
            "refunds",
            json!({ "columns": [{ "column_name": "total", "data_type": "decimal" }] }),
        );
    let mut session = EditorSession::for_new_tile("dash_1", UiTileKind::Table);

    // When
    let count = session.select_connection(&source, "warehouse").await.unwrap();

    // Then: the other tables are still loaded, one request at a time, in order
    assert_eq!(count, 2);
    assert_eq!(
        source.column_requests(),
        vec!["public.users", "sales.orders", "sales.refunds"]
    );
    let ids: Vec<String> = session.fields().iter().map(|f| f.field_id()).collect();
    assert_eq!(ids, vec!["public.users.country", "sales.refunds.total"]);
    assert_eq!(session.error_message(), None);
}

#[tokio::test]
async fn test_unrecognized_payload_means_no_fields() {
    init_test_logging();

    let source = FakeSchemaSource::new().with_schema("odd", json!({ "status": "ok" }));
    let mut session = EditorSession::for_new_tile("dash_1", UiTileKind::Chart);

    let count = session.select_connection(&source, "odd").await.unwrap();

    assert_eq!(count, 0);
    assert!(session.fields().is_empty());
}

#[tokio::test]
async fn test_schema_fetch_failure_leaves_empty_pool_and_message() {
    init_test_logging();

    // Given: a session that already loaded fields for one connection
    let source = FakeSchemaSource::new().with_schema("conn_1", orders_schema());
    let mut session = EditorSession::for_new_tile("dash_1", UiTileKind::Chart);
    session.select_connection(&source, "conn_1").await.unwrap();

    // When: switching to a connection whose schema cannot be fetched
    let result = session.select_connection(&source, "missing").await;

    // Then
    assert!(matches!(result, Err(TileError::SchemaFetchFailed { .. })));
    assert!(session.fields().is_empty());
    assert!(session
        .error_message()
        .is_some_and(|m| m.starts_with("Failed to load schema")));
}

#[tokio::test]
async fn test_stale_schema_response_is_discarded() {
    init_test_logging();

    // Given: two fetches started back to back for different connections
    let source = FakeSchemaSource::new()
        .with_schema("slow", orders_schema())
        .with_schema(
            "fast",
            json!({ "events": [{ "name": "duration_ms", "type": "int" }] }),
        );
    let mut session = EditorSession::for_new_tile("dash_1", UiTileKind::Chart);

    let first = session.begin_schema_fetch("slow");
    let second = session.begin_schema_fetch("fast");
    let slow_fields = load_fields(&source, &first).await.unwrap();
    let fast_fields = load_fields(&source, &second).await.unwrap();

    // When: the newer response lands first and the older one after it
    assert!(session.complete_schema_fetch(second.token, fast_fields));
    assert!(!session.complete_schema_fetch(first.token, slow_fields));

    // Then: the pool reflects the latest selected connection only
    let ids: Vec<String> = session.fields().iter().map(|f| f.field_id()).collect();
    assert_eq!(ids, vec!["events.duration_ms"]);
    assert_eq!(session.state().connection_id.as_deref(), Some("fast"));

    // And: a late failure of the old request is ignored as well
    let err = TileError::SchemaFetchFailed {
        connection_id: "slow".to_string(),
        message: "timeout".to_string(),
    };
    assert!(!session.fail_schema_fetch(first.token, &err));
    assert_eq!(session.fields().len(), 1);
}

#[tokio::test]
async fn test_switching_connection_clears_selection() {
    init_test_logging();

    let source = FakeSchemaSource::new()
        .with_schema("conn_1", orders_schema())
        .with_schema("conn_2", orders_schema());
    let mut session = EditorSession::for_new_tile("dash_1", UiTileKind::Chart);
    session.select_connection(&source, "conn_1").await.unwrap();
    session.add_dimension("orders.region");

    // Reloading the same connection keeps the selection
    session.select_connection(&source, "conn_1").await.unwrap();
    assert_eq!(session.state().selection.dimensions().len(), 1);

    session.select_connection(&source, "conn_2").await.unwrap();
    assert!(session.state().selection.is_empty());
}

#[tokio::test]
async fn test_only_active_connections_are_offered() {
    init_test_logging();

    let source = FakeSchemaSource::new()
        .with_connection("conn_1", "active")
        .with_connection("conn_2", "inactive")
        .with_connection("conn_3", "ACTIVE")
        .with_connection("conn_4", "error");

    let connections = active_connections(&source).await.unwrap();

    let ids: Vec<&str> = connections.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["conn_1", "conn_3"]);
}
