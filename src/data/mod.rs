/// Data layer: core types, loading, filtering, and aggregates.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table, check schema, drop id columns
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cache    │  one Arc<Table> per source
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply predicates → filtered view
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  counts, cross-tabs, correlation, order statistics
///   └───────────┘
/// ```

pub mod aggregate;
pub mod cache;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod schema;

pub use error::{LoadError, ViewError};
pub use filter::{EmptySelection, FilterSet, Predicate};
pub use model::{Column, ColumnType, Table, Value};
pub use schema::LoadOptions;
