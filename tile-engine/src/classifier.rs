use crate::domain::DatabaseField;

const NUMERIC_TYPE_MARKERS: [&str; 10] = [
    "int", "integer", "number", "float", "double", "decimal", "numeric", "bigint", "smallint",
    "real",
];

/// Whether a field can be the target of a numeric aggregation.
pub fn is_numeric(field: &DatabaseField) -> bool {
    is_numeric_type(&field.data_type)
}

pub fn is_numeric_type(data_type: &str) -> bool {
    let data_type = data_type.trim().to_lowercase();
    if data_type.is_empty() {
        return false;
    }
    NUMERIC_TYPE_MARKERS
        .iter()
        .any(|marker| data_type.contains(marker))
}
