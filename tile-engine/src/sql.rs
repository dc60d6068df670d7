//! SQL synthesis
//!
//! Turns a dimension/measure selection into a single preview SELECT. Names
//! are interpolated as-is and multi-table selections only get a marker in
//! the FROM clause; the output is a candidate query, not an executable one.

use crate::domain::{DimensionField, MeasureField};
use crate::selection::{FieldTableMap, SelectionSet};

pub const UNKNOWN_TABLE: &str = "unknown_table";

/// Emit the SELECT for a dimension/measure selection.
///
/// Returns an empty string unless both lists are non-empty.
pub fn generate(
    dimensions: &[DimensionField],
    measures: &[MeasureField],
    tables: &FieldTableMap,
) -> String {
    if dimensions.is_empty() || measures.is_empty() {
        return String::new();
    }
    emit_select(dimensions, measures, tables)
}

/// Emit the SELECT for a single-value tile: one aggregated measure, no
/// grouping.
pub fn generate_metric(measure: &MeasureField, tables: &FieldTableMap) -> String {
    emit_select(&[], std::slice::from_ref(measure), tables)
}

pub fn generate_for(selection: &SelectionSet) -> String {
    generate(
        selection.dimensions(),
        selection.measures(),
        selection.field_table_map(),
    )
}

fn emit_select(
    dimensions: &[DimensionField],
    measures: &[MeasureField],
    tables: &FieldTableMap,
) -> String {
    let mut from_tables: Vec<&str> = Vec::new();
    let mut resolve = |field_id: &str| -> String {
        let table = tables.table_for(field_id).unwrap_or(UNKNOWN_TABLE);
        if !from_tables.contains(&table) {
            from_tables.push(table);
        }
        table.to_string()
    };

    let group_cols: Vec<String> = dimensions
        .iter()
        .map(|d| emit_column(&resolve(&d.field_id), &d.field_name))
        .collect();

    let agg_exprs: Vec<String> = measures
        .iter()
        .map(|m| {
            format!(
                "{agg}({col}) as {alias}",
                agg = m.aggregation,
                col = emit_column(&resolve(&m.field_id), &m.field_name),
                alias = m.alias(),
            )
        })
        .collect();

    let mut select_items = group_cols.clone();
    select_items.extend(agg_exprs);

    let mut sql = format!(
        "SELECT {sel} FROM {from}",
        sel = select_items.join(", "),
        from = emit_from(&from_tables),
    );
    if !group_cols.is_empty() {
        sql.push_str(&format!(" GROUP BY {}", group_cols.join(", ")));
    }
    sql
}

fn emit_column(table: &str, name: &str) -> String {
    format!("{}.{}", table, name)
}

fn emit_from(tables: &[&str]) -> String {
    match tables {
        [] => UNKNOWN_TABLE.to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} /* JOIN required: {} */", first, rest.join(", ")),
    }
}
