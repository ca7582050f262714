use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

use attrition_explorer::data::schema::REQUIRED_COLUMNS;
use attrition_explorer::data::{Column, ColumnType, Table, Value};

/// Write a synthetic employee attrition dataset.
#[derive(Parser)]
#[command(name = "generate_sample")]
struct Args {
    /// Output path; `.parquet` or `.pq` writes Parquet, anything else CSV
    #[arg(short, long, default_value = "EA.csv")]
    output: PathBuf,

    /// Number of employees
    #[arg(long, default_value = "1470")]
    rows: usize,

    #[arg(long, default_value = "42")]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in `lo..=hi`.
    fn range(&mut self, lo: i64, hi: i64) -> i64 {
        lo + (self.next_f64() * (hi - lo + 1) as f64) as i64
    }

    fn pick<'a>(&mut self, options: &[&'a str]) -> &'a str {
        options[(self.next_f64() * options.len() as f64) as usize % options.len()]
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

const DEPARTMENTS: &[(&str, &[&str])] = &[
    ("Sales", &["Sales Executive", "Sales Representative", "Manager"]),
    (
        "Research & Development",
        &[
            "Research Scientist",
            "Laboratory Technician",
            "Manufacturing Director",
            "Healthcare Representative",
            "Research Director",
            "Manager",
        ],
    ),
    ("Human Resources", &["Human Resources", "Manager"]),
];

const EDUCATION_FIELDS: &[&str] = &[
    "Life Sciences",
    "Medical",
    "Marketing",
    "Technical Degree",
    "Human Resources",
    "Other",
];

fn generate_employee(rng: &mut SimpleRng, number: i64) -> Vec<(&'static str, Value)> {
    let (department, roles) = DEPARTMENTS[rng.range(0, DEPARTMENTS.len() as i64 - 1) as usize];
    let age = rng.range(18, 60);
    let total_working_years = rng.range(0, (age - 18).max(0));
    let years_at_company = rng.range(0, total_working_years);
    let job_level = (1 + total_working_years / 8).min(5);
    let monthly_income = 1000 + job_level * 3000 + rng.range(0, 2500);
    let overtime = rng.chance(0.28);
    let job_satisfaction = rng.range(1, 4);

    // Younger, overworked, less satisfied employees leave more often.
    let mut p_leave = 0.08;
    if overtime {
        p_leave += 0.15;
    }
    if age < 30 {
        p_leave += 0.08;
    }
    if job_satisfaction == 1 {
        p_leave += 0.07;
    }
    let attrition = if rng.chance(p_leave) { "Yes" } else { "No" };

    let text = |s: &str| Value::Text(s.to_string());
    vec![
        ("Age", Value::Integer(age)),
        ("Attrition", text(attrition)),
        (
            "BusinessTravel",
            text(rng.pick(&["Travel_Rarely", "Travel_Rarely", "Travel_Frequently", "Non-Travel"])),
        ),
        ("Department", text(department)),
        ("DistanceFromHome", Value::Integer(rng.range(1, 29))),
        ("EducationField", text(rng.pick(EDUCATION_FIELDS))),
        ("EmployeeCount", Value::Integer(1)),
        ("EmployeeNumber", Value::Integer(number)),
        ("EnvironmentSatisfaction", Value::Integer(rng.range(1, 4))),
        ("Gender", text(rng.pick(&["Male", "Male", "Female"]))),
        ("JobInvolvement", Value::Integer(rng.range(1, 4))),
        ("JobLevel", Value::Integer(job_level)),
        ("JobRole", text(rng.pick(roles))),
        ("JobSatisfaction", Value::Integer(job_satisfaction)),
        ("MaritalStatus", text(rng.pick(&["Single", "Married", "Married", "Divorced"]))),
        ("MonthlyIncome", Value::Integer(monthly_income)),
        ("OverTime", text(if overtime { "Yes" } else { "No" })),
        ("PercentSalaryHike", Value::Integer(rng.range(11, 25))),
        ("PerformanceRating", Value::Integer(if rng.chance(0.15) { 4 } else { 3 })),
        ("StandardHours", Value::Integer(80)),
        ("StockOptionLevel", Value::Integer(rng.range(0, 3))),
        ("TotalWorkingYears", Value::Integer(total_working_years)),
        ("TrainingTimesLastYear", Value::Integer(rng.range(0, 6))),
        ("WorkLifeBalance", Value::Integer(rng.range(1, 4))),
        ("YearsAtCompany", Value::Integer(years_at_company)),
        ("YearsWithCurrManager", Value::Integer(rng.range(0, years_at_company))),
    ]
}

fn generate_table(rows: usize, seed: u64) -> Table {
    let mut rng = SimpleRng::new(seed);
    let columns: Vec<Column> = REQUIRED_COLUMNS
        .iter()
        .map(|name| {
            let ty = match *name {
                "Attrition" | "BusinessTravel" | "Department" | "EducationField" | "Gender"
                | "JobRole" | "MaritalStatus" | "OverTime" => ColumnType::Categorical,
                _ => ColumnType::Integer,
            };
            Column::new(*name, ty)
        })
        .collect();

    let rows = (1..=rows as i64)
        .map(|number| {
            let fields = generate_employee(&mut rng, number);
            REQUIRED_COLUMNS
                .iter()
                .map(|name| {
                    fields
                        .iter()
                        .find(|(field, _)| field == name)
                        .map_or(Value::Null, |(_, v)| v.clone())
                })
                .collect()
        })
        .collect();
    Table::new(columns, rows)
}

fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    writer.write_record(table.column_names())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|v| match v {
            Value::Null => String::new(),
            other => other.to_string(),
        }))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    let mut fields = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();
    for (idx, col) in table.columns().iter().enumerate() {
        let cells = table.rows().iter().map(|row| &row[idx]);
        match col.ty {
            ColumnType::Categorical => {
                fields.push(Field::new(&col.name, DataType::Utf8, true));
                let values: Vec<Option<String>> = cells
                    .map(|v| match v {
                        Value::Null => None,
                        other => Some(other.to_string()),
                    })
                    .collect();
                arrays.push(Arc::new(StringArray::from(values)));
            }
            ColumnType::Integer => {
                fields.push(Field::new(&col.name, DataType::Int64, true));
                let values: Vec<Option<i64>> = cells
                    .map(|v| match v {
                        Value::Integer(i) => Some(*i),
                        _ => None,
                    })
                    .collect();
                arrays.push(Arc::new(Int64Array::from(values)));
            }
            ColumnType::Float => {
                fields.push(Field::new(&col.name, DataType::Float64, true));
                let values: Vec<Option<f64>> = cells.map(Value::as_f64).collect();
                arrays.push(Arc::new(Float64Array::from(values)));
            }
        }
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = std::fs::File::create(path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Same extensions the loader reads as Parquet.
fn is_parquet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet") || e.eq_ignore_ascii_case("pq"))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let table = generate_table(args.rows, args.seed);
    if is_parquet(&args.output) {
        write_parquet(&table, &args.output)?;
    } else {
        write_csv(&table, &args.output)?;
    }

    log::info!("generated {} employees (seed {})", table.len(), args.seed);
    println!(
        "Wrote {} employees ({} columns) to {}",
        table.len(),
        table.columns().len(),
        args.output.display()
    );
    Ok(())
}
