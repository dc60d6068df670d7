use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::classifier::is_numeric;
use crate::domain::{Aggregation, DatabaseField, DimensionField, MeasureField};

/// Field id → source table, used to qualify columns in generated SQL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldTableMap(HashMap<String, String>);

impl FieldTableMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field_id: impl Into<String>, table: impl Into<String>) {
        self.0.insert(field_id.into(), table.into());
    }

    pub fn table_for(&self, field_id: &str) -> Option<&str> {
        self.0.get(field_id).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn retain_ids(&mut self, ids: &[&String]) {
        self.0.retain(|id, _| ids.contains(&id));
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldTableMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// The chosen dimensions and measures of one tile being edited.
///
/// The set is the only owner of the field → table lookup. After every
/// mutation the lookup is pruned to the ids still present in the two lists,
/// so removing a field also forgets its table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSet {
    dimensions: Vec<DimensionField>,
    measures: Vec<MeasureField>,
    tables: FieldTableMap,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a selection from a persisted configuration. `tables` supplies
    /// source tables for ids that are not plain `table.name` keys.
    pub fn from_parts(
        dimensions: Vec<DimensionField>,
        measures: Vec<MeasureField>,
        tables: &FieldTableMap,
    ) -> Self {
        let mut resolved = FieldTableMap::new();
        for field_id in dimensions
            .iter()
            .map(|d| &d.field_id)
            .chain(measures.iter().map(|m| &m.field_id))
        {
            let table = tables
                .table_for(field_id)
                .map(str::to_string)
                .or_else(|| table_from_field_id(field_id));
            if let Some(table) = table {
                resolved.insert(field_id.clone(), table);
            }
        }

        let mut selection = Self {
            dimensions,
            measures,
            tables: resolved,
        };
        selection.prune_tables();
        selection
    }

    pub fn dimensions(&self) -> &[DimensionField] {
        &self.dimensions
    }

    pub fn measures(&self) -> &[MeasureField] {
        &self.measures
    }

    pub fn field_table_map(&self) -> &FieldTableMap {
        &self.tables
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty() && self.measures.is_empty()
    }

    pub fn has_dimension(&self, field_id: &str) -> bool {
        self.dimensions.iter().any(|d| d.field_id == field_id)
    }

    pub fn has_measure(&self, field_id: &str) -> bool {
        self.measures.iter().any(|m| m.field_id == field_id)
    }

    /// Returns whether the field was appended.
    pub fn add_dimension(&mut self, field: &DatabaseField) -> bool {
        let field_id = field.field_id();
        if self.has_dimension(&field_id) {
            debug!("Dimension {} already selected", field_id);
            return false;
        }

        self.tables.insert(field_id.clone(), field.table.clone());
        self.dimensions
            .push(DimensionField::new(field_id, field.name.clone()));
        self.prune_tables();
        true
    }

    pub fn remove_dimension(&mut self, index: usize) -> Option<DimensionField> {
        if index >= self.dimensions.len() {
            return None;
        }
        let removed = self.dimensions.remove(index);
        self.prune_tables();
        Some(removed)
    }

    /// Returns whether the field was appended. Non-numeric fields are
    /// rejected here as well as in the field picker, since the pool may have
    /// changed since the picker was rendered.
    pub fn add_measure(&mut self, field: &DatabaseField) -> bool {
        if !is_numeric(field) {
            debug!(
                "Rejecting non-numeric measure {}.{} ({})",
                field.table, field.name, field.data_type
            );
            return false;
        }

        let field_id = field.field_id();
        if self.has_measure(&field_id) {
            debug!("Measure {} already selected", field_id);
            return false;
        }

        self.tables.insert(field_id.clone(), field.table.clone());
        self.measures.push(MeasureField::new(
            field_id,
            field.name.clone(),
            Aggregation::Sum,
        ));
        self.prune_tables();
        true
    }

    pub fn remove_measure(&mut self, index: usize) -> Option<MeasureField> {
        if index >= self.measures.len() {
            return None;
        }
        let removed = self.measures.remove(index);
        self.prune_tables();
        Some(removed)
    }

    pub fn set_aggregation(&mut self, index: usize, aggregation: Aggregation) -> bool {
        match self.measures.get_mut(index) {
            Some(measure) => {
                measure.aggregation = aggregation;
                true
            }
            None => false,
        }
    }

    /// `None` (or a blank alias) goes back to the derived `field_agg` alias.
    pub fn set_alias(&mut self, index: usize, alias: Option<String>) -> bool {
        match self.measures.get_mut(index) {
            Some(measure) => {
                measure.alias = alias.filter(|a| !a.trim().is_empty());
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.dimensions.clear();
        self.measures.clear();
        self.prune_tables();
    }

    fn prune_tables(&mut self) {
        let selected: Vec<&String> = self
            .dimensions
            .iter()
            .map(|d| &d.field_id)
            .chain(self.measures.iter().map(|m| &m.field_id))
            .collect();

        self.tables.retain_ids(&selected);
    }
}

fn table_from_field_id(field_id: &str) -> Option<String> {
    field_id
        .rsplit_once('.')
        .map(|(table, _)| table.to_string())
        .filter(|table| !table.is_empty())
}
