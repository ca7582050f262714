use serde::Serialize;

use crate::data::aggregate::{
    self, CategoryCounts, CorrelationMatrix, CrossTab, GroupSummary, ScatterSeries,
};
use crate::data::filter::{EmptySelection, FilterSet};
use crate::data::model::{Column, Row, Table};
use crate::data::ViewError;

// ---------------------------------------------------------------------------
// Panel catalogue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    /// Organisation-wide distributions.
    Macro,
    /// Relationships between individual attributes.
    Micro,
    /// Views focused on who leaves.
    Attrition,
}

/// Which aggregate a panel shows, with its columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewSpec {
    Counts {
        column: &'static str,
    },
    CrossTab {
        category: &'static str,
        split: &'static str,
    },
    Summary {
        column: &'static str,
        group_by: &'static str,
    },
    SplitSummary {
        column: &'static str,
        group_by: &'static str,
        split_by: &'static str,
    },
    /// Every numeric column of the view.
    Correlation,
    Scatter {
        x: &'static str,
        y: &'static str,
        color: &'static str,
        size: Option<&'static str>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct PanelSpec {
    pub id: &'static str,
    pub tab: Tab,
    pub title: &'static str,
    pub view: ViewSpec,
}

const fn cross_tab(id: &'static str, tab: Tab, title: &'static str, category: &'static str) -> PanelSpec {
    PanelSpec {
        id,
        tab,
        title,
        view: ViewSpec::CrossTab {
            category,
            split: "Attrition",
        },
    }
}

const fn by_attrition(id: &'static str, title: &'static str, column: &'static str) -> PanelSpec {
    PanelSpec {
        id,
        tab: Tab::Attrition,
        title,
        view: ViewSpec::Summary {
            column,
            group_by: "Attrition",
        },
    }
}

/// The dashboard's panels, in display order.
pub const PANELS: &[PanelSpec] = &[
    cross_tab("attrition_by_department", Tab::Macro, "Attrition Distribution by Department", "Department"),
    cross_tab("attrition_by_gender", Tab::Macro, "Gender-wise Attrition Rate", "Gender"),
    PanelSpec {
        id: "monthly_income_distribution",
        tab: Tab::Macro,
        title: "Monthly Income Distribution",
        view: ViewSpec::Summary {
            column: "MonthlyIncome",
            group_by: "Attrition",
        },
    },
    cross_tab("attrition_by_education_field", Tab::Macro, "Education Field vs Attrition", "EducationField"),
    PanelSpec {
        id: "correlation_heatmap",
        tab: Tab::Macro,
        title: "Correlation Heatmap",
        view: ViewSpec::Correlation,
    },
    PanelSpec {
        id: "age_vs_monthly_income",
        tab: Tab::Micro,
        title: "Age vs Monthly Income",
        view: ViewSpec::Scatter {
            x: "Age",
            y: "MonthlyIncome",
            color: "Attrition",
            size: Some("TotalWorkingYears"),
        },
    },
    PanelSpec {
        id: "job_level_vs_job_satisfaction",
        tab: Tab::Micro,
        title: "Job Level vs Job Satisfaction",
        view: ViewSpec::SplitSummary {
            column: "JobSatisfaction",
            group_by: "JobLevel",
            split_by: "Attrition",
        },
    },
    cross_tab("work_life_balance", Tab::Micro, "Work-Life Balance Analysis", "WorkLifeBalance"),
    PanelSpec {
        id: "training_vs_performance",
        tab: Tab::Micro,
        title: "Training Times vs Performance",
        view: ViewSpec::Scatter {
            x: "TrainingTimesLastYear",
            y: "PerformanceRating",
            color: "Attrition",
            size: None,
        },
    },
    PanelSpec {
        id: "years_at_company_by_job_role",
        tab: Tab::Micro,
        title: "Years at Company vs Job Role",
        view: ViewSpec::SplitSummary {
            column: "YearsAtCompany",
            group_by: "JobRole",
            split_by: "Attrition",
        },
    },
    PanelSpec {
        id: "attrition_count",
        tab: Tab::Attrition,
        title: "Attrition Count",
        view: ViewSpec::Counts {
            column: "Attrition",
        },
    },
    cross_tab("attrition_by_marital_status", Tab::Attrition, "Attrition by Marital Status", "MaritalStatus"),
    cross_tab("attrition_by_business_travel", Tab::Attrition, "Attrition by Business Travel", "BusinessTravel"),
    by_attrition("percent_salary_hike", "Percent Salary Hike Distribution", "PercentSalaryHike"),
    by_attrition(
        "years_with_current_manager",
        "Years with Current Manager vs Attrition",
        "YearsWithCurrManager",
    ),
];

// ---------------------------------------------------------------------------
// Computed views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum View {
    Counts(CategoryCounts),
    CrossTab(CrossTab),
    Summary {
        column: String,
        group_by: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        split_by: Option<String>,
        groups: Vec<GroupSummary>,
    },
    Correlation(CorrelationMatrix),
    Scatter(ScatterSeries),
}

impl ViewSpec {
    pub fn compute(&self, table: &Table) -> Result<View, ViewError> {
        let view = match *self {
            // Bar charts read best largest-first, like `value_counts()`.
            ViewSpec::Counts { column } => {
                View::Counts(aggregate::count_by_category(table, column)?.sorted_by_count())
            }
            ViewSpec::CrossTab { category, split } => {
                View::CrossTab(aggregate::cross_tabulate(table, category, split)?)
            }
            ViewSpec::Summary { column, group_by } => View::Summary {
                column: column.to_string(),
                group_by: group_by.to_string(),
                split_by: None,
                groups: aggregate::summary_statistics(table, column, group_by)?,
            },
            ViewSpec::SplitSummary {
                column,
                group_by,
                split_by,
            } => View::Summary {
                column: column.to_string(),
                group_by: group_by.to_string(),
                split_by: Some(split_by.to_string()),
                groups: aggregate::split_summary_statistics(table, column, group_by, split_by)?,
            },
            ViewSpec::Correlation => {
                let columns = aggregate::numeric_columns(table);
                View::Correlation(aggregate::correlation_matrix(table, &columns)?)
            }
            ViewSpec::Scatter { x, y, color, size } => {
                View::Scatter(aggregate::scatter_series(table, x, y, Some(color), size)?)
            }
        };
        Ok(view)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Panel {
    pub id: &'static str,
    pub tab: Tab,
    pub title: &'static str,
    pub view: View,
}

/// First rows of the filtered view, as shown above the tabs.
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl Preview {
    fn of(table: &Table, n: usize) -> Self {
        let head = table.head(n);
        Preview {
            columns: head.columns().to_vec(),
            rows: head.rows().to_vec(),
        }
    }
}

/// Everything the presentation layer needs for one render.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub total_rows: usize,
    pub filtered_rows: usize,
    pub empty_selection: EmptySelection,
    pub preview: Preview,
    pub panels: Vec<Panel>,
}

pub const DEFAULT_PREVIEW_ROWS: usize = 5;

impl Dashboard {
    /// Filter `table` and compute every panel over the result.
    pub fn build(
        table: &Table,
        filters: &FilterSet,
        policy: EmptySelection,
        preview_rows: usize,
    ) -> Result<Self, ViewError> {
        let view = filters.apply(table, policy)?;
        Self::from_view(table.len(), &view, policy, preview_rows)
    }

    /// Compute every panel over an already filtered view.
    pub fn from_view(
        total_rows: usize,
        view: &Table,
        policy: EmptySelection,
        preview_rows: usize,
    ) -> Result<Self, ViewError> {
        let panels = PANELS
            .iter()
            .map(|spec| -> Result<Panel, ViewError> {
                Ok(Panel {
                    id: spec.id,
                    tab: spec.tab,
                    title: spec.title,
                    view: spec.view.compute(view)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "dashboard: {} of {} employees, {} panels",
            view.len(),
            total_rows,
            panels.len()
        );

        Ok(Dashboard {
            total_rows,
            filtered_rows: view.len(),
            empty_selection: policy,
            preview: Preview::of(view, preview_rows),
            panels,
        })
    }

    pub fn panel(&self, id: &str) -> Option<&Panel> {
        self.panels.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::data::loader::load_file;
    use crate::data::schema::{LoadOptions, SIDEBAR_FILTER_COLUMNS};
    use crate::data::Value;

    fn employees(options: LoadOptions) -> Table {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/employees.csv");
        load_file(&path, &options).unwrap()
    }

    #[test]
    fn every_panel_computes_over_the_full_table() {
        let t = employees(LoadOptions::default());
        let filters = FilterSet::select_all(&t, SIDEBAR_FILTER_COLUMNS).unwrap();
        let d = Dashboard::build(&t, &filters, EmptySelection::ShowNone, DEFAULT_PREVIEW_ROWS).unwrap();

        assert_eq!(d.total_rows, 8);
        assert_eq!(d.filtered_rows, 8);
        assert_eq!(d.panels.len(), PANELS.len());
        assert_eq!(d.preview.rows.len(), 5);

        let Some(View::Counts(counts)) = d.panel("attrition_count").map(|p| &p.view) else {
            panic!("attrition_count is not a counts view");
        };
        assert_eq!(counts.entries[0].value, Value::from("No"));
        assert_eq!(counts.get(&"No".into()), 6);
        assert_eq!(counts.get(&"Yes".into()), 2);
    }

    #[test]
    fn correlation_panel_depends_on_drop_policy() {
        let narrow = employees(LoadOptions::default());
        let wide = employees(LoadOptions {
            drop_identifier_columns: false,
        });

        let corr = |t: &Table| match ViewSpec::Correlation.compute(t).unwrap() {
            View::Correlation(m) => m,
            other => panic!("unexpected view {other:?}"),
        };
        let n = corr(&narrow);
        let w = corr(&wide);
        assert_eq!(w.columns.len(), n.columns.len() + 3);
        assert!(!n.columns.iter().any(|c| c == "StandardHours"));
        assert!(w.get("Age", "StandardHours").unwrap().is_nan());
        assert!(w.get("Age", "EmployeeNumber").unwrap().is_finite());
    }

    #[test]
    fn filters_narrow_every_panel() {
        let t = employees(LoadOptions::default());
        let mut filters = FilterSet::select_all(&t, SIDEBAR_FILTER_COLUMNS).unwrap();
        filters
            .selections
            .insert("Department".into(), [Value::from("Sales")].into());
        let d = Dashboard::build(&t, &filters, EmptySelection::ShowNone, 10).unwrap();
        assert_eq!(d.filtered_rows, 2);

        let Some(View::CrossTab(tab)) = d.panel("attrition_by_department").map(|p| &p.view) else {
            panic!("attrition_by_department is not a cross-tab");
        };
        assert_eq!(tab.categories, vec![Value::from("Sales")]);
        assert_eq!(tab.total(), 2);
    }

    #[test]
    fn empty_result_renders_as_empty_panels() {
        let t = employees(LoadOptions::default());
        let mut filters = FilterSet::default();
        filters.selections.insert("Gender".into(), Default::default());
        let d = Dashboard::build(&t, &filters, EmptySelection::ShowNone, 5).unwrap();
        assert_eq!(d.filtered_rows, 0);
        assert!(d.preview.rows.is_empty());
        for panel in &d.panels {
            match &panel.view {
                View::Counts(c) => assert!(c.is_empty()),
                View::CrossTab(c) => assert!(c.cells.is_empty()),
                View::Summary { groups, .. } => assert!(groups.is_empty()),
                View::Scatter(s) => assert!(s.points.is_empty()),
                View::Correlation(m) => assert!(!m.columns.is_empty()),
            }
        }
    }

    #[test]
    fn dashboard_serializes_with_tagged_views() {
        let t = employees(LoadOptions::default());
        let d = Dashboard::build(&t, &FilterSet::default(), EmptySelection::ShowNone, 1).unwrap();
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["panels"][0]["view"]["kind"], "cross_tab");
        assert_eq!(json["panels"][0]["tab"], "macro");
        assert_eq!(json["empty_selection"], "show_none");
        assert_eq!(json["preview"]["rows"][0][0], 41);
    }
}
