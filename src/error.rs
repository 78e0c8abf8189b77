use std::path::PathBuf;

use thiserror::Error;

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure of a pipeline stage. Each stage has its own error type; this
/// enum lets callers chain stages with `?`.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error(transparent)]
    DegenerateGeometry(#[from] DegenerateGeometryError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    TileFetch(#[from] TileFetchError),
}

/// Reading a polygon dataset failed.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("dataset not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),
    #[error("reading {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("reading shapefile")]
    Shapefile(#[from] shapefile::Error),
    #[error("parsing GeoJSON")]
    GeoJson(#[from] geojson::Error),
    #[error("row {row}: missing required column '{column}'")]
    MissingColumn { row: usize, column: String },
    #[error("row {row}: invalid value '{value}' in column '{column}'")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
    #[error("duplicate postal abbreviation '{0}'")]
    DuplicateKey(String),
    #[error("row {row}: geometry is not a polygon or multipolygon")]
    UnsupportedGeometry { row: usize },
}

/// Coordinate reference system problems.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("invalid coordinate reference system identifier '{0}'")]
    InvalidIdentifier(String),
    #[error("geometry has no coordinate reference system and none was supplied")]
    MissingSourceCrs,
}

/// A zero-area or empty geometry has no defined centroid.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("geometry of '{stusps}' has zero area; centroid is undefined")]
pub struct DegenerateGeometryError {
    pub stusps: String,
}

/// Producing an image failed.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("column '{0}' has not been derived yet")]
    ColumnNotDerived(String),
    #[error("unknown color scale '{0}'")]
    UnknownColorScale(String),
    #[error("invalid render options: {0}")]
    InvalidOptions(String),
    #[error("drawing failed: {0}")]
    Drawing(String),
    #[error("writing image")]
    Image(#[from] image::ImageError),
}

/// Fetching a basemap tile failed.
#[derive(Debug, Error)]
pub enum TileFetchError {
    #[error("requesting tile {url}")]
    Request {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },
    #[error("decoding tile {url}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },
}
