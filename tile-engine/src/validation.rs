use thiserror::Error;

use crate::domain::TextRow;
use crate::tile::{EditorState, UiTileKind};

/// Why a tile cannot be saved yet. `Display` is the message shown to the
/// user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Tile title is required")]
    MissingTitle,

    #[error("Select at least one dimension")]
    MissingDimensions,

    #[error("Select at least one measure")]
    MissingMeasures,

    #[error("A metric tile requires a measure")]
    MissingMeasure,

    #[error("Select a database connection")]
    MissingConnection,

    #[error("Add at least one row with content")]
    MissingTextContent,

    #[error("Query rows require a database connection")]
    QueryRowWithoutConnection,

    #[error("Enter a SQL query")]
    MissingQuery,
}

/// Check that `state` is complete enough to save as a `kind` tile. Reports
/// the first failing rule only.
pub fn validate(kind: UiTileKind, state: &EditorState) -> Result<(), ValidationError> {
    if state.title.trim().is_empty() {
        return Err(ValidationError::MissingTitle);
    }

    let selection = &state.selection;
    match kind {
        UiTileKind::Chart | UiTileKind::Table => {
            if selection.dimensions().is_empty() {
                return Err(ValidationError::MissingDimensions);
            }
            if selection.measures().is_empty() {
                return Err(ValidationError::MissingMeasures);
            }
            require_connection(state)
        }
        UiTileKind::Metric => {
            if selection.measures().is_empty() {
                return Err(ValidationError::MissingMeasure);
            }
            require_connection(state)
        }
        UiTileKind::Text => validate_rows(&state.text_rows, state.has_connection()),
        UiTileKind::Query if state.is_query_mode => {
            if state.custom_query.trim().is_empty() {
                return Err(ValidationError::MissingQuery);
            }
            require_connection(state)
        }
        UiTileKind::Query => validate_rows(&state.text_rows, state.has_connection()),
    }
}

fn require_connection(state: &EditorState) -> Result<(), ValidationError> {
    if state.has_connection() {
        Ok(())
    } else {
        Err(ValidationError::MissingConnection)
    }
}

fn validate_rows(rows: &[TextRow], has_connection: bool) -> Result<(), ValidationError> {
    if !rows.iter().any(TextRow::has_content) {
        return Err(ValidationError::MissingTextContent);
    }
    if !has_connection && rows.iter().any(|r| r.is_query && r.has_content()) {
        return Err(ValidationError::QueryRowWithoutConnection);
    }
    Ok(())
}
