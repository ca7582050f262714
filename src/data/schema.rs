//! The employee-attrition schema the dashboard is built around.

use super::error::LoadError;
use super::model::Table;

/// Columns every source must carry, in the order of the public dataset.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "Age",
    "Attrition",
    "BusinessTravel",
    "Department",
    "DistanceFromHome",
    "EducationField",
    "EmployeeCount",
    "EmployeeNumber",
    "EnvironmentSatisfaction",
    "Gender",
    "JobInvolvement",
    "JobLevel",
    "JobRole",
    "JobSatisfaction",
    "MaritalStatus",
    "MonthlyIncome",
    "OverTime",
    "PercentSalaryHike",
    "PerformanceRating",
    "StandardHours",
    "StockOptionLevel",
    "TotalWorkingYears",
    "TrainingTimesLastYear",
    "WorkLifeBalance",
    "YearsAtCompany",
    "YearsWithCurrManager",
];

/// Constant or row-identifier columns. Known in advance, never inferred.
pub const IDENTIFIER_COLUMNS: &[&str] = &["EmployeeCount", "EmployeeNumber", "StandardHours"];

/// Sidebar multiselect columns of the dashboard.
pub const SIDEBAR_FILTER_COLUMNS: &[&str] = &["Department", "Gender", "JobRole"];

/// How a source is turned into a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadOptions {
    /// Remove [`IDENTIFIER_COLUMNS`] after validation.
    pub drop_identifier_columns: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            drop_identifier_columns: true,
        }
    }
}

/// Check a freshly parsed table against [`REQUIRED_COLUMNS`].
pub fn validate(table: &Table) -> Result<(), LoadError> {
    match REQUIRED_COLUMNS.iter().find(|c| !table.has_column(c)) {
        Some(missing) => Err(LoadError::MissingColumn(missing.to_string())),
        None => Ok(()),
    }
}

/// Validate, then apply the column drop policy.
pub fn conform(table: Table, options: &LoadOptions) -> Result<Table, LoadError> {
    validate(&table)?;
    if options.drop_identifier_columns {
        Ok(table.without_columns(IDENTIFIER_COLUMNS))
    } else {
        Ok(table)
    }
}
