use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::backend::SchemaSource;
use crate::domain::DatabaseField;

/// A table listed by a two-level schema payload whose columns still have to
/// be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaShape {
    /// Columns were inline in the payload.
    Fields(Vec<DatabaseField>),
    /// Only table names were listed, per schema.
    Nested(Vec<TableRef>),
    Unrecognized,
}

/// Classify an introspection payload and extract whatever fields it carries
/// inline.
pub fn parse_schema(payload: &Value) -> SchemaShape {
    match payload {
        Value::Array(tables) => SchemaShape::Fields(fields_from_table_list(tables)),
        Value::Object(map) => {
            if let (Some(Value::Object(tables)), true) =
                (map.get("tables"), map.contains_key("schemas"))
            {
                return SchemaShape::Nested(table_refs(map.get("schemas"), tables));
            }
            if let Some(Value::Array(tables)) = map.get("tables") {
                return SchemaShape::Fields(fields_from_table_list(tables));
            }
            if map.values().any(Value::is_array) {
                return SchemaShape::Fields(fields_from_table_map(map));
            }
            SchemaShape::Unrecognized
        }
        _ => SchemaShape::Unrecognized,
    }
}

/// Resolve a payload into a flat field list, fetching per-table columns
/// one table at a time when the payload only names tables. A table whose
/// columns cannot be fetched is skipped.
pub async fn normalize_schema(
    source: &dyn SchemaSource,
    connection_id: &str,
    payload: &Value,
) -> Vec<DatabaseField> {
    match parse_schema(payload) {
        SchemaShape::Fields(fields) => fields,
        SchemaShape::Nested(tables) => {
            info!(
                "Fetching columns for {} tables of connection {}",
                tables.len(),
                connection_id
            );

            let mut fields = Vec::new();
            for table_ref in tables {
                match source
                    .fetch_table_columns(connection_id, &table_ref.schema, &table_ref.table)
                    .await
                {
                    Ok(columns) => {
                        let table_fields =
                            fields_from_columns(&table_ref.qualified_name(), column_list(&columns));
                        debug!(
                            "Loaded {} columns for {}",
                            table_fields.len(),
                            table_ref.qualified_name()
                        );
                        fields.extend(table_fields);
                    }
                    Err(e) => {
                        warn!(
                            "Skipping table {}: failed to fetch columns: {}",
                            table_ref.qualified_name(),
                            e
                        );
                    }
                }
            }
            fields
        }
        SchemaShape::Unrecognized => {
            warn!(
                "Unrecognized schema payload for connection {}, no fields available",
                connection_id
            );
            Vec::new()
        }
    }
}

fn fields_from_table_list(tables: &[Value]) -> Vec<DatabaseField> {
    tables
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|table| {
            let name = first_str(table, &["name", "table_name", "tableName"]).unwrap_or_default();
            let columns = table.get("columns").map(column_list).unwrap_or(&[]);
            fields_from_columns(name, columns)
        })
        .collect()
}

fn fields_from_table_map(tables: &Map<String, Value>) -> Vec<DatabaseField> {
    tables
        .iter()
        .filter_map(|(table, columns)| columns.as_array().map(|c| (table, c)))
        .flat_map(|(table, columns)| fields_from_columns(table, columns))
        .collect()
}

fn fields_from_columns(table: &str, columns: &[Value]) -> Vec<DatabaseField> {
    if table.is_empty() {
        return Vec::new();
    }

    columns
        .iter()
        .filter_map(|column| match column {
            Value::String(name) => Some(DatabaseField::new(table, name.as_str(), "")),
            Value::Object(column) => {
                let name = first_str(column, &["name", "column_name", "columnName"])?;
                let data_type = first_str(column, &["type", "data_type", "dataType"]).unwrap_or("");
                let mut field = DatabaseField::new(table, name, data_type);
                field.description =
                    first_str(column, &["description", "comment"]).map(str::to_string);
                Some(field)
            }
            _ => None,
        })
        .filter(|field| !field.name.is_empty())
        .collect()
}

/// A column response is either a bare array or `{ "columns": [...] }`.
fn column_list(value: &Value) -> &[Value] {
    match value {
        Value::Array(columns) => columns.as_slice(),
        Value::Object(map) => map
            .get("columns")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

fn table_refs(schemas: Option<&Value>, tables: &Map<String, Value>) -> Vec<TableRef> {
    // Listed schema order first, then anything only present under `tables`.
    let mut order: Vec<&str> = schemas
        .and_then(Value::as_array)
        .map(|schemas| {
            schemas
                .iter()
                .filter_map(|s| match s {
                    Value::String(name) => Some(name.as_str()),
                    Value::Object(obj) => first_str(obj, &["name", "schema_name"]),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    for schema in tables.keys() {
        if !order.contains(&schema.as_str()) {
            order.push(schema);
        }
    }

    order
        .into_iter()
        .filter_map(|schema| tables.get(schema).and_then(Value::as_array).map(|t| (schema, t)))
        .flat_map(|(schema, names)| {
            names.iter().filter_map(move |table| {
                let table = match table {
                    Value::String(name) => Some(name.as_str()),
                    Value::Object(obj) => first_str(obj, &["name", "table_name", "tableName"]),
                    _ => None,
                }?;
                Some(TableRef {
                    schema: schema.to_string(),
                    table: table.to_string(),
                })
            })
        })
        .collect()
}

fn first_str<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| {
        map.get(*key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    })
}
