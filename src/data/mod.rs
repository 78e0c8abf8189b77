/// Data layer: record schema, loading, filtering and derived columns.
///
/// Architecture:
/// ```text
///  .shp (+ .dbf, .prj) / .geojson
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table (source CRS)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table    │  Vec<Record>, Crs; reproject in place
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  exclude key set / select by attribute
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  derive   │  square miles, centroids
///   └──────────┘
/// ```

pub mod census;
pub mod derive;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
