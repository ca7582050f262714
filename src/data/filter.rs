use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ViewError;
use super::model::{Table, Value};

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// A boolean condition on one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `row[column] ∈ allowed`.
    Categorical {
        column: String,
        allowed: BTreeSet<Value>,
    },
    /// `lower ≤ row[column] ≤ upper`, both bounds inclusive. Nulls fail.
    Range {
        column: String,
        lower: f64,
        upper: f64,
    },
}

impl Predicate {
    pub fn categorical<V: Into<Value>>(
        column: impl Into<String>,
        allowed: impl IntoIterator<Item = V>,
    ) -> Self {
        Predicate::Categorical {
            column: column.into(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn range(column: impl Into<String>, lower: f64, upper: f64) -> Self {
        Predicate::Range {
            column: column.into(),
            lower,
            upper,
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Predicate::Categorical { column, .. } | Predicate::Range { column, .. } => column,
        }
    }
}

/// What an empty categorical selection means.
///
/// The dashboard's multiselects start with every value selected; clearing
/// one leaves an empty set, which pandas' `isin([])` treats as matching
/// nothing. `ShowAll` is the alternative reading: an empty selection is no
/// constraint at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySelection {
    #[default]
    ShowNone,
    ShowAll,
}

impl FromStr for EmptySelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "show-none" | "none" => Ok(EmptySelection::ShowNone),
            "show-all" | "all" => Ok(EmptySelection::ShowAll),
            other => Err(format!("unknown empty-selection policy '{other}' (show-none, show-all)")),
        }
    }
}

impl fmt::Display for EmptySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptySelection::ShowNone => write!(f, "show-none"),
            EmptySelection::ShowAll => write!(f, "show-all"),
        }
    }
}

/// A predicate bound to a column position.
enum Check<'a> {
    Member { idx: usize, allowed: &'a BTreeSet<Value> },
    Between { idx: usize, lower: f64, upper: f64 },
    Reject,
}

impl Check<'_> {
    fn passes(&self, row: &[Value]) -> bool {
        match self {
            Check::Member { idx, allowed } => allowed.contains(&row[*idx]),
            Check::Between { idx, lower, upper } => row[*idx]
                .as_f64()
                .is_some_and(|v| *lower <= v && v <= *upper),
            Check::Reject => false,
        }
    }
}

/// Resolve every predicate against the schema up front so an unknown
/// column fails even when the table is empty.
fn bind<'a>(
    table: &Table,
    predicates: &'a [Predicate],
    policy: EmptySelection,
) -> Result<Vec<Check<'a>>, ViewError> {
    let mut checks = Vec::with_capacity(predicates.len());
    for pred in predicates {
        let idx = table.column_index(pred.column())?;
        match pred {
            Predicate::Categorical { allowed, .. } if allowed.is_empty() => match policy {
                EmptySelection::ShowNone => checks.push(Check::Reject),
                EmptySelection::ShowAll => {}
            },
            Predicate::Categorical { allowed, .. } => checks.push(Check::Member { idx, allowed }),
            Predicate::Range {
                column,
                lower,
                upper,
            } => {
                if !table.columns()[idx].ty.is_numeric() {
                    return Err(ViewError::NotNumeric(column.clone()));
                }
                checks.push(Check::Between {
                    idx,
                    lower: *lower,
                    upper: *upper,
                });
            }
        }
    }
    Ok(checks)
}

/// Return indices of rows that pass all predicates, in table order.
///
/// A row passes when:
/// * it passes every predicate (AND across predicates)
/// * for a categorical predicate, its value is any of the allowed ones
/// * for an empty categorical predicate, `policy` decides
pub fn filtered_indices(
    table: &Table,
    predicates: &[Predicate],
    policy: EmptySelection,
) -> Result<Vec<usize>, ViewError> {
    let checks = bind(table, predicates, policy)?;
    Ok(table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| checks.iter().all(|c| c.passes(row)))
        .map(|(i, _)| i)
        .collect())
}

/// The filtered view: a fresh table with the matching rows, original
/// order and all columns. The input is left untouched.
pub fn filter_view(
    table: &Table,
    predicates: &[Predicate],
    policy: EmptySelection,
) -> Result<Table, ViewError> {
    let indices = filtered_indices(table, predicates, policy)?;
    log::debug!(
        "filter: {} of {} rows match {} predicate(s)",
        indices.len(),
        table.len(),
        predicates.len()
    );
    Ok(table.select_rows(&indices))
}

// ---------------------------------------------------------------------------
// FilterSet: the sidebar's current selections
// ---------------------------------------------------------------------------

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

/// Per-column selection state: maps column_name → set of selected values,
/// plus numeric ranges. A column absent from both maps is unconstrained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    pub selections: BTreeMap<String, BTreeSet<Value>>,
    pub ranges: BTreeMap<String, Bounds>,
}

impl FilterSet {
    /// Initialise selections for `columns` with every distinct value
    /// selected (i.e., show everything).
    pub fn select_all(table: &Table, columns: &[&str]) -> Result<Self, ViewError> {
        let mut set = FilterSet::default();
        for col in columns {
            let values = table.unique_values(col)?;
            set.selections
                .insert(col.to_string(), values.into_iter().collect());
        }
        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty() && self.ranges.is_empty()
    }

    /// The active predicate set, selections first.
    pub fn predicates(&self) -> Vec<Predicate> {
        let members = self.selections.iter().map(|(col, allowed)| Predicate::Categorical {
            column: col.clone(),
            allowed: allowed.clone(),
        });
        let ranges = self
            .ranges
            .iter()
            .map(|(col, b)| Predicate::range(col.clone(), b.min, b.max));
        members.chain(ranges).collect()
    }

    pub fn apply(&self, table: &Table, policy: EmptySelection) -> Result<Table, ViewError> {
        filter_view(table, &self.predicates(), policy)
    }
}
