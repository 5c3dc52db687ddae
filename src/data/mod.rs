/// Data layer: core types, loading, derivation, caching and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawTable (typed columns)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  derive   │  Acceleration_Index, Urgency_Category,
///   └──────────┘  Reskilling_Viability_Ratio → Dataset
///        │
///        ▼
///   ┌──────────┐
///   │  cache    │  Arc<Dataset> keyed by source path + signature
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply column selections → View (row indices)
///   └──────────┘
/// ```

pub mod cache;
pub mod derive;
pub mod filter;
pub mod loader;
pub mod model;
pub mod schema;
