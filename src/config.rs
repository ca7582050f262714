//! Dashboard configuration read from a JSON file.
//!
//! ```json
//! {
//!   "filters": { "Department": ["Sales"], "JobLevel": [1, 2] },
//!   "ranges": { "Age": { "min": 25, "max": 45 } },
//!   "empty_selection": "show_none",
//!   "drop_identifier_columns": true,
//!   "preview_rows": 5
//! }
//! ```
//!
//! Every field is optional.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::dashboard::DEFAULT_PREVIEW_ROWS;
use crate::data::filter::{Bounds, EmptySelection, FilterSet};
use crate::data::model::{Table, Value};
use crate::data::schema::LoadOptions;
use crate::data::ViewError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// Allowed values per categorical column. Values are matched against
    /// the column's detected type, so `3`, `3.0` and `"3"` all select the
    /// integer 3 in `JobLevel`.
    pub filters: BTreeMap<String, Vec<JsonValue>>,
    pub ranges: BTreeMap<String, Bounds>,
    pub empty_selection: EmptySelection,
    pub drop_identifier_columns: bool,
    pub preview_rows: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            filters: BTreeMap::new(),
            ranges: BTreeMap::new(),
            empty_selection: EmptySelection::default(),
            drop_identifier_columns: LoadOptions::default().drop_identifier_columns,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            drop_identifier_columns: self.drop_identifier_columns,
        }
    }

    /// Type the configured values against `table` and build the filter set.
    pub fn filter_set(&self, table: &Table) -> Result<FilterSet, ViewError> {
        let mut set = FilterSet::default();
        for (column, raw) in &self.filters {
            let ty = table.column(column)?.ty;
            let allowed = raw
                .iter()
                .map(|v| match v {
                    JsonValue::String(s) => Value::parse_as(s, ty),
                    JsonValue::Null => Value::Null,
                    other => Value::parse_as(&other.to_string(), ty),
                })
                .collect();
            set.selections.insert(column.clone(), allowed);
        }
        for (column, bounds) in &self.ranges {
            if !table.column(column)?.ty.is_numeric() {
                return Err(ViewError::NotNumeric(column.clone()));
            }
            set.ranges.insert(column.clone(), *bounds);
        }
        Ok(set)
    }
}
