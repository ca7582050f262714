//! Aggregate summaries over a table or a filtered view.
//!
//! Every function takes the table explicitly and returns a fresh value;
//! nothing here caches or mutates. Grouped outputs keep first-seen order
//! so they line up with the rows a caller is looking at.

use std::collections::HashMap;

use serde::Serialize;

use super::error::ViewError;
use super::model::{Table, Value};

// ---------------------------------------------------------------------------
// Counts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub value: Value,
    pub count: usize,
}

/// Rows per distinct value of one column. Nulls form their own group so
/// the counts always add up to the row count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCounts {
    pub column: String,
    pub entries: Vec<CategoryCount>,
}

impl CategoryCounts {
    pub fn get(&self, value: &Value) -> usize {
        self.entries
            .iter()
            .find(|e| &e.value == value)
            .map_or(0, |e| e.count)
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Largest count first, ties kept in first-seen order (`value_counts`).
    pub fn sorted_by_count(mut self) -> Self {
        self.entries.sort_by(|a, b| b.count.cmp(&a.count));
        self
    }

    pub fn sorted_by_value(mut self) -> Self {
        self.entries.sort_by(|a, b| a.value.cmp(&b.value));
        self
    }
}

/// Count keys in first-seen order.
fn tally<K: std::hash::Hash + Eq + Clone>(keys: impl Iterator<Item = K>) -> Vec<(K, usize)> {
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut out: Vec<(K, usize)> = Vec::new();
    for key in keys {
        match slots.get(&key) {
            Some(&slot) => out[slot].1 += 1,
            None => {
                slots.insert(key.clone(), out.len());
                out.push((key, 1));
            }
        }
    }
    out
}

pub fn count_by_category(table: &Table, column: &str) -> Result<CategoryCounts, ViewError> {
    let entries = tally(table.values(column)?)
        .into_iter()
        .map(|(value, count)| CategoryCount {
            value: value.clone(),
            count,
        })
        .collect();
    Ok(CategoryCounts {
        column: column.to_string(),
        entries,
    })
}

// ---------------------------------------------------------------------------
// Cross-tabulation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTabCell {
    pub category: Value,
    pub split: Value,
    pub count: usize,
}

/// Two-key counts backing the grouped bar charts (`x=category, color=split`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTab {
    pub category_column: String,
    pub split_column: String,
    /// Distinct categories, first-seen.
    pub categories: Vec<Value>,
    /// Distinct split values, first-seen.
    pub splits: Vec<Value>,
    /// Only pairs that occur, first-seen.
    pub cells: Vec<CrossTabCell>,
}

impl CrossTab {
    /// Count for a pair; zero when the pair never occurs.
    pub fn get(&self, category: &Value, split: &Value) -> usize {
        self.cells
            .iter()
            .find(|c| &c.category == category && &c.split == split)
            .map_or(0, |c| c.count)
    }

    pub fn total(&self) -> usize {
        self.cells.iter().map(|c| c.count).sum()
    }
}

pub fn cross_tabulate(
    table: &Table,
    category_column: &str,
    split_column: &str,
) -> Result<CrossTab, ViewError> {
    let cat_idx = table.column_index(category_column)?;
    let split_idx = table.column_index(split_column)?;

    let pairs = tally(table.rows().iter().map(|row| (&row[cat_idx], &row[split_idx])));

    let categories = tally(pairs.iter().map(|((c, _), _)| *c))
        .into_iter()
        .map(|(v, _)| v.clone())
        .collect();
    let splits = tally(pairs.iter().map(|((_, s), _)| *s))
        .into_iter()
        .map(|(v, _)| v.clone())
        .collect();
    let cells = pairs
        .into_iter()
        .map(|((category, split), count)| CrossTabCell {
            category: category.clone(),
            split: split.clone(),
            count,
        })
        .collect();

    Ok(CrossTab {
        category_column: category_column.to_string(),
        split_column: split_column.to_string(),
        categories,
        splits,
        cells,
    })
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Pairwise Pearson coefficients. `values[i][j]` pairs `columns[i]` with
/// `columns[j]`. Undefined coefficients are NaN (JSON `null`).
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

/// Names of the numeric columns, in table order.
pub fn numeric_columns(table: &Table) -> Vec<&str> {
    table
        .columns()
        .iter()
        .filter(|c| c.ty.is_numeric())
        .map(|c| c.name.as_str())
        .collect()
}

/// Pearson correlation over each pair of `columns`, using the rows where
/// both values are present.
///
/// A column's coefficient with itself is 1.0. A pair where either side
/// has zero variance, or with fewer than two paired rows, is NaN.
pub fn correlation_matrix(table: &Table, columns: &[&str]) -> Result<CorrelationMatrix, ViewError> {
    let mut series: Vec<Vec<Option<f64>>> = Vec::with_capacity(columns.len());
    for name in columns {
        if !table.column(name)?.ty.is_numeric() {
            return Err(ViewError::NotNumeric(name.to_string()));
        }
        series.push(table.values(name)?.map(Value::as_f64).collect());
    }

    let n = columns.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let r = pearson(&series[i], &series[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        values,
    })
}

fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

// ---------------------------------------------------------------------------
// Order statistics per group (box / violin panels)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split: Option<Value>,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
    /// The group's values, ascending.
    pub values: Vec<f64>,
}

impl GroupSummary {
    fn from_values(group: Value, split: Option<Value>, mut values: Vec<f64>) -> Self {
        values.sort_by(f64::total_cmp);
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        GroupSummary {
            group,
            split,
            count,
            min: values[0],
            q1: quantile(&values, 0.25),
            median: quantile(&values, 0.5),
            q3: quantile(&values, 0.75),
            max: values[count - 1],
            mean,
            values,
        }
    }
}

/// Linear-interpolated quantile of an ascending slice. NaN when empty.
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

/// Distribution of `column` for each distinct value of `group_by`.
/// Rows with a null in `column` are skipped.
pub fn summary_statistics(
    table: &Table,
    column: &str,
    group_by: &str,
) -> Result<Vec<GroupSummary>, ViewError> {
    let value_idx = numeric_index(table, column)?;
    let group_idx = table.column_index(group_by)?;

    Ok(group_values(table, value_idx, |row| row[group_idx].clone())
        .into_iter()
        .map(|(group, values)| GroupSummary::from_values(group, None, values))
        .collect())
}

/// Like [`summary_statistics`] but grouped by `(group_by, split_by)` pairs,
/// for box plots coloured by a second column.
pub fn split_summary_statistics(
    table: &Table,
    column: &str,
    group_by: &str,
    split_by: &str,
) -> Result<Vec<GroupSummary>, ViewError> {
    let value_idx = numeric_index(table, column)?;
    let group_idx = table.column_index(group_by)?;
    let split_idx = table.column_index(split_by)?;

    Ok(group_values(table, value_idx, |row| {
        (row[group_idx].clone(), row[split_idx].clone())
    })
    .into_iter()
    .map(|((group, split), values)| GroupSummary::from_values(group, Some(split), values))
    .collect())
}

fn numeric_index(table: &Table, column: &str) -> Result<usize, ViewError> {
    let idx = table.column_index(column)?;
    if !table.columns()[idx].ty.is_numeric() {
        return Err(ViewError::NotNumeric(column.to_string()));
    }
    Ok(idx)
}

fn group_values<K: std::hash::Hash + Eq + Clone>(
    table: &Table,
    value_idx: usize,
    key: impl Fn(&[Value]) -> K,
) -> Vec<(K, Vec<f64>)> {
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<f64>)> = Vec::new();
    for row in table.rows() {
        let Some(v) = row[value_idx].as_f64() else {
            continue;
        };
        let k = key(row.as_slice());
        match slots.get(&k) {
            Some(&slot) => groups[slot].1.push(v),
            None => {
                slots.insert(k.clone(), groups.len());
                groups.push((k, vec![v]));
            }
        }
    }
    groups
}

// ---------------------------------------------------------------------------
// Scatter series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterSeries {
    pub x_column: String,
    pub y_column: String,
    pub color_column: Option<String>,
    pub size_column: Option<String>,
    pub points: Vec<ScatterPoint>,
}

/// One point per row with both `x` and `y` present, in row order.
pub fn scatter_series(
    table: &Table,
    x: &str,
    y: &str,
    color: Option<&str>,
    size: Option<&str>,
) -> Result<ScatterSeries, ViewError> {
    let x_idx = numeric_index(table, x)?;
    let y_idx = numeric_index(table, y)?;
    let color_idx = color.map(|c| table.column_index(c)).transpose()?;
    let size_idx = size.map(|s| numeric_index(table, s)).transpose()?;

    let points = table
        .rows()
        .iter()
        .filter_map(|row| {
            Some(ScatterPoint {
                x: row[x_idx].as_f64()?,
                y: row[y_idx].as_f64()?,
                color: color_idx.map(|i| row[i].clone()),
                size: size_idx.and_then(|i| row[i].as_f64()),
            })
        })
        .collect();

    Ok(ScatterSeries {
        x_column: x.to_string(),
        y_column: y.to_string(),
        color_column: color.map(str::to_string),
        size_column: size.map(str::to_string),
        points,
    })
}
