//! Filter and aggregate engine behind the employee attrition dashboard.
//!
//! [`data`] loads and filters the employee table and computes aggregate
//! summaries; [`dashboard`] names the fixed set of panels built from
//! them; [`state`] holds one session's sidebar selections.

pub mod config;
pub mod dashboard;
pub mod data;
pub mod state;
