use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::LoadError;
use super::model::{is_missing, Column, ColumnType, Row, Table, Value};
use super::schema::{self, LoadOptions};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the employee table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one employee per line (the dashboard's `EA.csv`)
/// * `.json`    – `[{ "Age": 41, "Attrition": "Yes", ... }, ...]`
/// * `.parquet` – flat columns of ints, floats, strings or booleans
///
/// The parsed table is checked against the employee schema and the
/// column drop policy in `options` is applied.
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<Table, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let raw = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(LoadError::UnsupportedExtension(other.to_string())),
    };

    let table = schema::conform(raw, options)?;
    log::info!(
        "Loaded {} employees with {} columns from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
    Ok(table)
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, every record the same width.
/// Column types are detected from the whole column, not cell by cell, so
/// every row of a column carries the same kind of value.
fn load_csv(path: &Path) -> Result<Table, LoadError> {
    let mut reader = csv::Reader::from_reader(open(path)?);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let records = reader
        .records()
        .collect::<Result<Vec<csv::StringRecord>, csv::Error>>()?;

    let types: Vec<ColumnType> = (0..headers.len())
        .map(|idx| detect_type(records.iter().map(|r| r.get(idx).unwrap_or(""))))
        .collect();

    let rows: Vec<Row> = records
        .iter()
        .map(|record| {
            record
                .iter()
                .zip(&types)
                .map(|(cell, ty)| Value::parse_as(cell.trim(), *ty))
                .collect()
        })
        .collect();

    let columns = headers
        .into_iter()
        .zip(types)
        .map(|(name, ty)| Column::new(name, ty))
        .collect();
    Ok(Table::new(columns, rows))
}

/// Narrowest type every present cell fits. Missing-value tokens are skipped.
fn detect_type<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut ty = ColumnType::Integer;
    for cell in cells.map(str::trim).filter(|c| !is_missing(c)) {
        if ty == ColumnType::Integer && cell.parse::<i64>().is_err() {
            ty = ColumnType::Float;
        }
        if ty == ColumnType::Float && cell.parse::<f64>().is_err() {
            return ColumnType::Categorical;
        }
    }
    ty
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Age": 41, "Attrition": "Yes", "Department": "Sales", ... },
///   ...
/// ]
/// ```
///
/// A key absent from a record reads as null.
fn load_json(path: &Path) -> Result<Table, LoadError> {
    let root: JsonValue = serde_json::from_reader(std::io::BufReader::new(open(path)?))?;

    let records = root.as_array().ok_or(LoadError::MalformedRow {
        row: 0,
        reason: "expected a top-level JSON array of records".to_string(),
    })?;

    let mut names: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec.as_object().ok_or_else(|| LoadError::MalformedRow {
            row: i,
            reason: "not a JSON object".to_string(),
        })?;
        for key in obj.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let types: Vec<ColumnType> = names
        .iter()
        .map(|name| detect_json_type(objects.iter().filter_map(|o| o.get(name))))
        .collect();

    let rows: Vec<Row> = objects
        .iter()
        .map(|obj| {
            names
                .iter()
                .zip(&types)
                .map(|(name, ty)| obj.get(name).map_or(Value::Null, |v| json_to_value(v, *ty)))
                .collect()
        })
        .collect();

    let columns = names
        .into_iter()
        .zip(types)
        .map(|(name, ty)| Column::new(name, ty))
        .collect();
    Ok(Table::new(columns, rows))
}

fn detect_json_type<'a>(values: impl Iterator<Item = &'a JsonValue>) -> ColumnType {
    let mut ty = ColumnType::Integer;
    for val in values {
        match val {
            JsonValue::Null => {}
            JsonValue::Number(n) if n.is_i64() => {}
            JsonValue::Number(_) => ty = ColumnType::Float,
            _ => return ColumnType::Categorical,
        }
    }
    ty
}

fn json_to_value(val: &JsonValue, ty: ColumnType) -> Value {
    match (val, ty) {
        (JsonValue::Null, _) => Value::Null,
        (JsonValue::Number(n), ColumnType::Integer) => {
            n.as_i64().map_or(Value::Null, Value::Integer)
        }
        (JsonValue::Number(n), ColumnType::Float) => n.as_f64().map_or(Value::Null, Value::from),
        (JsonValue::String(s), _) => Value::Text(s.clone()),
        (other, _) => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of flat employee columns.
///
/// Integer columns of any width map to `Integer`, floats to `Float`,
/// strings and booleans to `Categorical`. Anything nested is rejected.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Table, LoadError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)?;

    let columns: Vec<Column> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| {
            column_type_for(f.data_type())
                .map(|ty| Column::new(f.name().clone(), ty))
                .ok_or_else(|| LoadError::UnsupportedType {
                    column: f.name().clone(),
                    ty: format!("{:?}", f.data_type()),
                })
        })
        .collect::<Result<_, _>>()?;

    let reader = builder.build()?;
    let mut rows: Vec<Row> = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        let decoded: Vec<Vec<Value>> = columns
            .iter()
            .enumerate()
            .map(|(idx, col)| decode_column(batch.column(idx), col.ty))
            .collect::<Result<_, _>>()?;

        for row in 0..batch.num_rows() {
            rows.push(decoded.iter().map(|values| values[row].clone()).collect());
        }
    }

    Ok(Table::new(columns, rows))
}

// -- Parquet / Arrow helpers --

fn column_type_for(dt: &DataType) -> Option<ColumnType> {
    match dt {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => Some(ColumnType::Integer),
        DataType::Float32 | DataType::Float64 => Some(ColumnType::Float),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Boolean => Some(ColumnType::Categorical),
        _ => None,
    }
}

/// Decode a whole Arrow column by first casting it to the canonical
/// physical type of its `ColumnType`.
fn decode_column(col: &ArrayRef, ty: ColumnType) -> Result<Vec<Value>, LoadError> {
    let values = match ty {
        ColumnType::Integer => {
            let arr = cast(col, &DataType::Int64)?;
            let arr = arr.as_primitive::<Int64Type>();
            (0..arr.len())
                .map(|i| {
                    if arr.is_null(i) {
                        Value::Null
                    } else {
                        Value::Integer(arr.value(i))
                    }
                })
                .collect()
        }
        ColumnType::Float => {
            let arr = cast(col, &DataType::Float64)?;
            let arr = arr.as_primitive::<Float64Type>();
            (0..arr.len())
                .map(|i| {
                    if arr.is_null(i) {
                        Value::Null
                    } else {
                        Value::from(arr.value(i))
                    }
                })
                .collect()
        }
        ColumnType::Categorical => {
            let arr = cast(col, &DataType::Utf8)?;
            let arr = arr.as_string::<i32>();
            (0..arr.len())
                .map(|i| {
                    if arr.is_null(i) {
                        Value::Null
                    } else {
                        Value::Text(arr.value(i).to_string())
                    }
                })
                .collect()
        }
    };
    Ok(values)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Arc;

    use arrow::array::{Float64Array, Int32Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;
    use crate::data::schema::{IDENTIFIER_COLUMNS, REQUIRED_COLUMNS};

    fn fixture() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/employees.csv")
    }

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    fn keep_ids() -> LoadOptions {
        LoadOptions {
            drop_identifier_columns: false,
        }
    }

    #[test]
    fn csv_fixture_loads_with_detected_types() {
        let t = load_file(&fixture(), &LoadOptions::default()).unwrap();
        assert_eq!(t.len(), 8);
        assert_eq!(t.column("Age").unwrap().ty, ColumnType::Integer);
        assert_eq!(t.column("Attrition").unwrap().ty, ColumnType::Categorical);
        assert_eq!(t.rows()[0][t.column_index("Age").unwrap()], Value::Integer(41));
        for id in IDENTIFIER_COLUMNS {
            assert!(!t.has_column(id));
        }
    }

    #[test]
    fn csv_fixture_keeps_identifier_columns_when_asked() {
        let t = load_file(&fixture(), &keep_ids()).unwrap();
        assert_eq!(t.columns().len(), REQUIRED_COLUMNS.len());
        assert!(t.has_column("EmployeeNumber"));
    }

    #[test]
    fn missing_attrition_column_is_a_load_error() {
        let original = std::fs::read_to_string(fixture()).unwrap();
        let mut lines = original.lines();
        let header: Vec<&str> = lines.next().unwrap().split(',').collect();
        let drop = header.iter().position(|h| *h == "Attrition").unwrap();
        let strip = |line: &str| {
            line.split(',')
                .enumerate()
                .filter(|(i, _)| *i != drop)
                .map(|(_, c)| c)
                .collect::<Vec<_>>()
                .join(",")
        };
        let mut body = strip(&header.join(","));
        for line in lines {
            body.push('\n');
            body.push_str(&strip(line));
        }
        let f = write_temp(".csv", &body);

        match load_file(f.path(), &LoadOptions::default()) {
            Err(LoadError::MissingColumn(c)) => assert_eq!(c, "Attrition"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = load_file(Path::new("/definitely/not/here/EA.csv"), &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn ragged_csv_is_a_load_error() {
        let f = write_temp(".csv", "Age,Attrition\n41,Yes\n49\n");
        let err = load_file(f.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Csv(_)));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let f = write_temp(".xlsx", "");
        let err = load_file(f.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedExtension(ref e) if e == "xlsx"));
    }

    #[test]
    fn detect_type_widens_integer_to_float_to_text() {
        assert_eq!(detect_type(["1", "", "2"].into_iter()), ColumnType::Integer);
        assert_eq!(detect_type(["1", "2.5"].into_iter()), ColumnType::Float);
        assert_eq!(detect_type(["1", "Yes"].into_iter()), ColumnType::Categorical);
    }

    #[test]
    fn detect_type_skips_missing_tokens() {
        assert_eq!(detect_type(["41", "NA", "37"].into_iter()), ColumnType::Integer);
        assert_eq!(detect_type(["4.5", "NaN", "n/a"].into_iter()), ColumnType::Float);
    }

    #[test]
    fn missing_tokens_in_numeric_columns_load_as_null() {
        use crate::dashboard::Dashboard;
        use crate::data::aggregate::correlation_matrix;
        use crate::data::filter::{EmptySelection, FilterSet};

        let original = std::fs::read_to_string(fixture()).unwrap();
        let mut lines: Vec<String> = original.lines().map(str::to_string).collect();
        let age = lines[0].split(',').position(|h| h == "Age").unwrap();
        for (line, token) in lines.iter_mut().skip(2).zip(["NA", "NaN"]) {
            let mut cells: Vec<&str> = line.split(',').collect();
            cells[age] = token;
            *line = cells.join(",");
        }
        let f = write_temp(".csv", &lines.join("\n"));

        let t = load_file(f.path(), &LoadOptions::default()).unwrap();
        assert_eq!(t.column("Age").unwrap().ty, ColumnType::Integer);
        let ages: Vec<_> = t.values("Age").unwrap().cloned().collect();
        assert_eq!(ages[0], Value::Integer(41));
        assert_eq!(ages[1], Value::Null);
        assert_eq!(ages[2], Value::Null);

        let m = correlation_matrix(&t, &["Age", "MonthlyIncome"]).unwrap();
        assert!(m.get("Age", "MonthlyIncome").unwrap().is_finite());

        let d = Dashboard::build(&t, &FilterSet::default(), EmptySelection::ShowNone, 5).unwrap();
        assert_eq!(d.filtered_rows, 8);
    }

    #[test]
    fn json_records_match_csv_fixture() {
        let csv_table = load_file(&fixture(), &keep_ids()).unwrap();

        let records: Vec<JsonValue> = csv_table
            .rows()
            .iter()
            .map(|row| {
                let obj: serde_json::Map<String, JsonValue> = csv_table
                    .column_names()
                    .zip(row)
                    .map(|(name, v)| (name.to_string(), serde_json::to_value(v).unwrap()))
                    .collect();
                JsonValue::Object(obj)
            })
            .collect();
        let f = write_temp(".json", &serde_json::to_string(&records).unwrap());

        let json_table = load_file(f.path(), &keep_ids()).unwrap();
        assert_eq!(json_table.len(), csv_table.len());
        for col in csv_table.columns() {
            assert_eq!(json_table.column(&col.name).unwrap().ty, col.ty, "{}", col.name);
            let a: Vec<_> = csv_table.values(&col.name).unwrap().collect();
            let b: Vec<_> = json_table.values(&col.name).unwrap().collect();
            assert_eq!(a, b, "{}", col.name);
        }
    }

    #[test]
    fn parquet_columns_are_decoded_by_type() {
        let mut fields = Vec::new();
        let mut arrays: Vec<ArrayRef> = Vec::new();
        for name in REQUIRED_COLUMNS {
            match *name {
                "Attrition" => {
                    fields.push(Field::new(*name, DataType::Utf8, true));
                    arrays.push(Arc::new(StringArray::from(vec![Some("Yes"), None])));
                }
                "MonthlyIncome" => {
                    fields.push(Field::new(*name, DataType::Float64, false));
                    arrays.push(Arc::new(Float64Array::from(vec![5993.0, 5130.5])));
                }
                _ => {
                    fields.push(Field::new(*name, DataType::Int32, false));
                    arrays.push(Arc::new(Int32Array::from(vec![1, 2])));
                }
            }
        }
        let schema = Arc::new(Schema::new(fields));
        let batch = RecordBatch::try_new(schema.clone(), arrays).unwrap();

        let f = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let mut writer = ArrowWriter::try_new(f.reopen().unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let t = load_file(f.path(), &LoadOptions::default()).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.column("MonthlyIncome").unwrap().ty, ColumnType::Float);
        let attrition: Vec<_> = t.values("Attrition").unwrap().cloned().collect();
        assert_eq!(attrition, vec![Value::from("Yes"), Value::Null]);
        let age: Vec<_> = t.values("Age").unwrap().cloned().collect();
        assert_eq!(age, vec![Value::Integer(1), Value::Integer(2)]);
    }
}
