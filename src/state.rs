use std::collections::BTreeSet;
use std::sync::Arc;

use crate::dashboard::Dashboard;
use crate::data::filter::{filtered_indices, Bounds, EmptySelection, FilterSet};
use crate::data::model::{Table, Value};
use crate::data::schema::SIDEBAR_FILTER_COLUMNS;
use crate::data::ViewError;

// ---------------------------------------------------------------------------
// Explorer state
// ---------------------------------------------------------------------------

/// The full interaction state behind one dashboard session, independent
/// of rendering.
#[derive(Debug, Clone)]
pub struct ExplorerState {
    /// The loaded table, shared with the cache and never mutated.
    table: Arc<Table>,

    /// Current selections and ranges.
    filters: FilterSet,

    /// What an emptied multiselect means.
    policy: EmptySelection,

    /// Indices of rows passing the current filters (cached).
    visible_indices: Vec<usize>,
}

impl ExplorerState {
    /// Start a session with every sidebar value selected.
    pub fn new(table: Arc<Table>, policy: EmptySelection) -> Result<Self, ViewError> {
        let filters = FilterSet::select_all(&table, SIDEBAR_FILTER_COLUMNS)?;
        Self::with_filters(table, filters, policy)
    }

    pub fn with_filters(
        table: Arc<Table>,
        filters: FilterSet,
        policy: EmptySelection,
    ) -> Result<Self, ViewError> {
        let mut state = ExplorerState {
            table,
            filters,
            policy,
            visible_indices: Vec::new(),
        };
        state.refilter()?;
        Ok(state)
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn visible_indices(&self) -> &[usize] {
        &self.visible_indices
    }

    /// The current filtered view.
    pub fn visible_view(&self) -> Table {
        self.table.select_rows(&self.visible_indices)
    }

    /// Recompute `visible_indices` from the full table after a filter change.
    /// On error the previous indices are kept.
    pub fn refilter(&mut self) -> Result<(), ViewError> {
        self.visible_indices =
            filtered_indices(&self.table, &self.filters.predicates(), self.policy)?;
        Ok(())
    }

    /// Toggle a single value in a column's selection.
    pub fn toggle_value(&mut self, column: &str, value: &Value) -> Result<(), ViewError> {
        self.table.column_index(column)?;
        let selected = self.filters.selections.entry(column.to_string()).or_default();
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
        self.refilter()
    }

    /// Select all values in a column.
    pub fn select_all(&mut self, column: &str) -> Result<(), ViewError> {
        let all_vals: BTreeSet<Value> = self.table.unique_values(column)?.into_iter().collect();
        self.filters.selections.insert(column.to_string(), all_vals);
        self.refilter()
    }

    /// Deselect all values in a column.
    pub fn select_none(&mut self, column: &str) -> Result<(), ViewError> {
        self.table.column_index(column)?;
        self.filters
            .selections
            .insert(column.to_string(), BTreeSet::new());
        self.refilter()
    }

    /// Constrain a numeric column to `[min, max]`.
    pub fn set_range(&mut self, column: &str, min: f64, max: f64) -> Result<(), ViewError> {
        if !self.table.column(column)?.ty.is_numeric() {
            return Err(ViewError::NotNumeric(column.to_string()));
        }
        self.filters
            .ranges
            .insert(column.to_string(), Bounds { min, max });
        self.refilter()
    }

    pub fn clear_range(&mut self, column: &str) -> Result<(), ViewError> {
        self.filters.ranges.remove(column);
        self.refilter()
    }

    /// Every panel over the current view.
    pub fn dashboard(&self, preview_rows: usize) -> Result<Dashboard, ViewError> {
        Dashboard::from_view(self.table.len(), &self.visible_view(), self.policy, preview_rows)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::data::loader::load_file;
    use crate::data::schema::LoadOptions;

    fn state(policy: EmptySelection) -> ExplorerState {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/employees.csv");
        let table = Arc::new(load_file(&path, &LoadOptions::default()).unwrap());
        ExplorerState::new(table, policy).unwrap()
    }

    #[test]
    fn starts_with_everything_visible() {
        let s = state(EmptySelection::ShowNone);
        assert_eq!(s.visible_indices(), &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(s.filters().selections.len(), SIDEBAR_FILTER_COLUMNS.len());
    }

    #[test]
    fn toggling_a_value_off_and_on() {
        let mut s = state(EmptySelection::ShowNone);
        let female = Value::from("Female");
        s.toggle_value("Gender", &female).unwrap();
        assert_eq!(s.visible_indices().len(), 5);
        s.toggle_value("Gender", &female).unwrap();
        assert_eq!(s.visible_indices().len(), 8);
    }

    #[test]
    fn select_none_follows_policy() {
        let mut hide = state(EmptySelection::ShowNone);
        hide.select_none("JobRole").unwrap();
        assert!(hide.visible_indices().is_empty());
        assert!(hide.visible_view().is_empty());

        let mut show = state(EmptySelection::ShowAll);
        show.select_none("JobRole").unwrap();
        assert_eq!(show.visible_indices().len(), 8);

        hide.select_all("JobRole").unwrap();
        assert_eq!(hide.visible_indices().len(), 8);
    }

    #[test]
    fn age_range_is_inclusive() {
        let mut s = state(EmptySelection::ShowNone);
        s.set_range("Age", 30.0, 37.0).unwrap();
        let ages: Vec<_> = s.visible_view().values("Age").unwrap().cloned().collect();
        assert_eq!(
            ages,
            vec![Value::Integer(37), Value::Integer(33), Value::Integer(32), Value::Integer(30)]
        );
        s.clear_range("Age").unwrap();
        assert_eq!(s.visible_indices().len(), 8);
    }

    #[test]
    fn bad_columns_are_rejected_without_touching_state() {
        let mut s = state(EmptySelection::ShowNone);
        assert_eq!(
            s.set_range("Gender", 0.0, 1.0).unwrap_err(),
            ViewError::NotNumeric("Gender".into())
        );
        assert_eq!(
            s.toggle_value("Team", &Value::from("A")).unwrap_err(),
            ViewError::ColumnNotFound("Team".into())
        );
        assert!(!s.filters().selections.contains_key("Team"));
        assert_eq!(s.visible_indices().len(), 8);
    }

    #[test]
    fn dashboard_reflects_current_view() {
        let mut s = state(EmptySelection::ShowNone);
        s.toggle_value("Department", &Value::from("Sales")).unwrap();
        let d = s.dashboard(3).unwrap();
        assert_eq!(d.total_rows, 8);
        assert_eq!(d.filtered_rows, 6);
        assert_eq!(d.preview.rows.len(), 3);
    }
}
