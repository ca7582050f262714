use std::collections::HashSet;
use std::fmt;

use serde::{Serialize, Serializer};

use super::error::ViewError;

// ---------------------------------------------------------------------------
// Value – a single cell of the employee table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the Pandas dtypes the
/// dashboard sees (`object`, `int64`, `float64`, missing).
/// Used as a map/set key downstream, so `Value` must be `Ord` and `Hash`.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet / HashMap --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Integer(_) => 1,
                Float(_) => 2,
                Text(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

/// Cells serialize as their natural JSON scalar.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Text(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Null => serializer.serialize_none(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

/// NaN is how Pandas spells a missing float, so it becomes `Null`.
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        if v.is_nan() {
            Value::Null
        } else {
            Value::Float(v)
        }
    }
}

/// Tokens `pandas.read_csv` reads as missing by default.
pub const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_missing(raw: &str) -> bool {
    MISSING_TOKENS.contains(&raw)
}

impl Value {
    /// Try to interpret the value as an `f64` for numeric predicates and statistics.
    /// A NaN float reads as missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) if v.is_nan() => None,
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Parse raw text into a value of the given column type.
    /// Missing-value tokens (`NA`, `NaN`, `null`, ...) become `Null`.
    /// Text that does not fit the type stays text, so it simply never
    /// matches a typed cell.
    pub fn parse_as(raw: &str, ty: ColumnType) -> Value {
        if is_missing(raw) {
            return Value::Null;
        }
        match ty {
            ColumnType::Integer => match raw.parse::<i64>() {
                Ok(i) => Value::Integer(i),
                // `2.0` names the same employee level as `2`.
                Err(_) => match raw.parse::<f64>() {
                    Ok(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Value::Integer(f as i64)
                    }
                    _ => Value::Text(raw.to_string()),
                },
            },
            ColumnType::Float => raw
                .parse::<f64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::Text(raw.to_string())),
            ColumnType::Categorical => Value::Text(raw.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Column schema
// ---------------------------------------------------------------------------

/// Declared type of a column, detected once per column at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    Categorical,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Column {
            name: name.into(),
            ty,
        }
    }
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset, or a filtered view of it
// ---------------------------------------------------------------------------

/// One employee record: values aligned positionally with `Table::columns`.
pub type Row = Vec<Value>;

/// An immutable row-oriented table with a fixed schema.
///
/// Every row has exactly one value per column; the constructor is the only
/// way in, so the invariant holds for the lifetime of the value.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Table {
    /// Build a table, padding short rows with nulls and truncating long ones.
    /// Loaders reject ragged input before reaching this point.
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Table { columns, rows }
    }

    /// An empty table sharing this table's schema.
    pub fn empty_like(&self) -> Self {
        Table {
            columns: self.columns.clone(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Position of `name` in the schema.
    pub fn column_index(&self, name: &str) -> Result<usize, ViewError> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| ViewError::ColumnNotFound(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<&Column, ViewError> {
        let idx = self.column_index(name)?;
        Ok(&self.columns[idx])
    }

    /// Iterate the values of one column in row order.
    pub fn values<'a>(
        &'a self,
        name: &str,
    ) -> Result<impl Iterator<Item = &'a Value> + 'a, ViewError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Distinct values of a column in first-seen order (the order a
    /// multiselect lists its options in).
    pub fn unique_values(&self, name: &str) -> Result<Vec<Value>, ViewError> {
        let mut seen = HashSet::new();
        Ok(self
            .values(name)?
            .filter(|v| seen.insert(*v))
            .cloned()
            .collect())
    }

    /// A new table holding the rows at `indices`, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// First `n` rows, for previews.
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// A copy without the named columns. Names not in the schema are ignored.
    pub fn without_columns(&self, names: &[&str]) -> Table {
        let keep: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !names.contains(&c.name.as_str()))
            .map(|(i, _)| i)
            .collect();
        Table {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            vec![
                Column::new("Department", ColumnType::Categorical),
                Column::new("Age", ColumnType::Integer),
            ],
            vec![
                vec!["Sales".into(), Value::Integer(22)],
                vec!["R&D".into(), Value::Integer(30)],
                vec!["Sales".into(), Value::Integer(50)],
            ],
        )
    }

    #[test]
    fn unique_values_keep_first_seen_order() {
        let t = sample();
        assert_eq!(
            t.unique_values("Department").unwrap(),
            vec![Value::from("Sales"), Value::from("R&D")]
        );
    }

    #[test]
    fn missing_tokens_parse_as_null() {
        for raw in ["NA", "N/A", "NaN", "nan", "null", "<NA>"] {
            assert_eq!(Value::parse_as(raw, ColumnType::Integer), Value::Null, "{raw}");
            assert_eq!(Value::parse_as(raw, ColumnType::Categorical), Value::Null, "{raw}");
        }
        assert_eq!(Value::parse_as("4.5", ColumnType::Float), Value::Float(4.5));
        assert_eq!(Value::parse_as("2.0", ColumnType::Integer), Value::Integer(2));
        assert_eq!(Value::parse_as("2.5", ColumnType::Integer), Value::from("2.5"));
        assert_eq!(Value::parse_as("Sales", ColumnType::Categorical), Value::from("Sales"));
    }

    #[test]
    fn nan_float_is_not_numeric() {
        assert_eq!(Value::Float(f64::NAN).as_f64(), None);
        assert_eq!(Value::from(f64::NAN), Value::Null);
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
    }

    #[test]
    fn unknown_column_is_reported_by_name() {
        let err = sample().column_index("Salary").unwrap_err();
        assert!(matches!(err, ViewError::ColumnNotFound(ref c) if c == "Salary"));
    }

    #[test]
    fn short_rows_are_padded_with_null() {
        let t = Table::new(
            vec![
                Column::new("a", ColumnType::Integer),
                Column::new("b", ColumnType::Integer),
            ],
            vec![vec![Value::Integer(1)]],
        );
        assert_eq!(t.rows()[0], vec![Value::Integer(1), Value::Null]);
    }

    #[test]
    fn without_columns_drops_schema_and_cells() {
        let t = sample().without_columns(&["Age", "NotThere"]);
        assert_eq!(t.column_names().collect::<Vec<_>>(), vec!["Department"]);
        assert_eq!(t.rows()[1], vec![Value::from("R&D")]);
    }

    #[test]
    fn floats_order_totally_and_hash_consistently() {
        let mut vals = vec![Value::Float(2.5), Value::Null, Value::Integer(3), Value::from("x")];
        vals.sort();
        assert_eq!(vals[0], Value::Null);
        assert_eq!(vals[3], Value::from("x"));

        let set: HashSet<Value> = [Value::Float(f64::NAN), Value::Float(f64::NAN)].into();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn parse_as_follows_column_type() {
        assert_eq!(Value::parse_as("3", ColumnType::Integer), Value::Integer(3));
        assert_eq!(Value::parse_as("3", ColumnType::Categorical), Value::from("3"));
        assert_eq!(Value::parse_as("", ColumnType::Float), Value::Null);
        assert_eq!(Value::parse_as("abc", ColumnType::Integer), Value::from("abc"));
    }
}
