use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use geo_types::{Coord, LineString, MultiPolygon, Point, Polygon};
use geojson::{GeoJson, Value as GeoJsonValue};
use serde_json::Value as JsonValue;
use shapefile::dbase::FieldValue;
use shapefile::{PolygonRing, Shape};

use super::model::{AttributeValue, Record, Table};
use crate::error::LoadError;
use crate::spatial::Crs;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a states dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.shp`            – ESRI shapefile with its `.dbf` (and optional `.prj`)
/// * `.geojson`/`.json` – GeoJSON `FeatureCollection`, EPSG:4326
pub fn load_file(path: &Path) -> Result<Table, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "shp" => load_shapefile(path)?,
        "geojson" | "json" => load_geojson(path)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    };
    log::info!(
        "loaded {} records from {} (crs: {})",
        table.len(),
        path.display(),
        table.crs().map_or_else(|| "unknown".to_string(), |c| c.to_string())
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Shared row assembly
// ---------------------------------------------------------------------------

/// Turn one row's attribute columns and geometry into a [`Record`].
///
/// Required: `STUSPS`, `REGION`, `ALAND`, `AWATER`. Everything that is not
/// part of the schema stays in `Record::attributes`.
fn build_record(
    row: usize,
    mut columns: BTreeMap<String, AttributeValue>,
    geometry: MultiPolygon<f64>,
) -> Result<Record, LoadError> {
    let stusps = take_text(&mut columns, row, "STUSPS")?
        .ok_or_else(|| missing(row, "STUSPS"))?;
    let region = take_code(&mut columns, row, "REGION")?.ok_or_else(|| missing(row, "REGION"))?;
    let aland = take_area(&mut columns, row, "ALAND")?;
    let awater = take_area(&mut columns, row, "AWATER")?;

    let name = take_text(&mut columns, row, "NAME")?.unwrap_or_default();
    let division = take_code(&mut columns, row, "DIVISION")?.unwrap_or(0);
    let statefp = take_text(&mut columns, row, "STATEFP")?.unwrap_or_default();

    let lat = columns.get("INTPTLAT").and_then(AttributeValue::as_f64);
    let lon = columns.get("INTPTLON").and_then(AttributeValue::as_f64);
    let interior_point = lon.zip(lat).map(|(x, y)| Point::new(x, y));

    Ok(Record {
        stusps,
        name,
        region,
        division,
        statefp,
        aland,
        awater,
        interior_point,
        attributes: columns,
        geometry,
        land_miles: None,
        water_miles: None,
        centroid: None,
    })
}

fn missing(row: usize, column: &str) -> LoadError {
    LoadError::MissingColumn {
        row,
        column: column.to_string(),
    }
}

fn invalid(row: usize, column: &str, value: &AttributeValue) -> LoadError {
    LoadError::InvalidValue {
        row,
        column: column.to_string(),
        value: value.to_string(),
    }
}

fn take_text(
    columns: &mut BTreeMap<String, AttributeValue>,
    row: usize,
    column: &str,
) -> Result<Option<String>, LoadError> {
    match columns.remove(column) {
        None | Some(AttributeValue::Null) => Ok(None),
        Some(AttributeValue::String(s)) => Ok(Some(s.trim().to_string())),
        Some(AttributeValue::Integer(i)) => Ok(Some(i.to_string())),
        Some(other) => Err(invalid(row, column, &other)),
    }
}

/// Region and division codes are text in TIGER files and numbers in
/// hand-made GeoJSON; accept both.
fn take_code(
    columns: &mut BTreeMap<String, AttributeValue>,
    row: usize,
    column: &str,
) -> Result<Option<u8>, LoadError> {
    let Some(value) = columns.remove(column) else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_f64()
        .filter(|v| v.fract() == 0.0 && (0.0..=255.0).contains(v))
        .map(|v| Some(v as u8))
        .ok_or_else(|| invalid(row, column, &value))
}

fn take_area(
    columns: &mut BTreeMap<String, AttributeValue>,
    row: usize,
    column: &str,
) -> Result<f64, LoadError> {
    let value = columns
        .remove(column)
        .filter(|v| !v.is_null())
        .ok_or_else(|| missing(row, column))?;
    value
        .as_f64()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| invalid(row, column, &value))
}

fn check_unique(records: &[Record]) -> Result<(), LoadError> {
    let mut seen = BTreeSet::new();
    for r in records {
        if !seen.insert(r.stusps.as_str()) {
            return Err(LoadError::DuplicateKey(r.stusps.clone()));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Shapefile loader
// ---------------------------------------------------------------------------

/// TIGER/Line layout: polygon shapes, attributes in the `.dbf`, NAD83 in
/// the `.prj`.
fn load_shapefile(path: &Path) -> Result<Table, LoadError> {
    let mut reader = shapefile::Reader::from_path(path)?;

    let mut records = Vec::new();
    for (row, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, dbf_record) = result?;
        let geometry = shape_to_multipolygon(shape).ok_or(LoadError::UnsupportedGeometry { row })?;
        let columns: BTreeMap<String, AttributeValue> = dbf_record
            .into_iter()
            .map(|(name, value)| (name, field_to_attribute(value)))
            .collect();
        records.push(build_record(row, columns, geometry)?);
    }
    check_unique(&records)?;

    Ok(Table::new(records, read_prj(path)?))
}

/// Read the `.prj` sidecar next to `shp_path`, if any.
fn read_prj(shp_path: &Path) -> Result<Option<Crs>, LoadError> {
    let prj_path = shp_path.with_extension("prj");
    if !prj_path.exists() {
        log::warn!("{} has no .prj; coordinate reference system unknown", shp_path.display());
        return Ok(None);
    }
    let wkt = std::fs::read_to_string(&prj_path).map_err(|source| LoadError::Io {
        path: prj_path.clone(),
        source,
    })?;
    let crs = Crs::from_wkt(&wkt);
    if crs.is_none() {
        log::warn!("unrecognised projection in {}", prj_path.display());
    }
    Ok(crs)
}

/// Shapefile polygons list all rings flat; an outer ring owns the inner
/// rings that follow it.
fn shape_to_multipolygon(shape: Shape) -> Option<MultiPolygon<f64>> {
    let Shape::Polygon(polygon) = shape else {
        return None;
    };

    let mut parts: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
    for ring in polygon.rings() {
        let coords: LineString<f64> = ring
            .points()
            .iter()
            .map(|p| Coord { x: p.x, y: p.y })
            .collect();
        match ring {
            PolygonRing::Outer(_) => parts.push((coords, Vec::new())),
            PolygonRing::Inner(_) => match parts.last_mut() {
                Some((_, holes)) => holes.push(coords),
                None => return None,
            },
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(MultiPolygon(
        parts
            .into_iter()
            .map(|(exterior, holes)| Polygon::new(exterior, holes))
            .collect(),
    ))
}

fn field_to_attribute(value: FieldValue) -> AttributeValue {
    match value {
        FieldValue::Character(Some(s)) => AttributeValue::String(s.trim().to_string()),
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) => {
            if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                AttributeValue::Integer(n as i64)
            } else {
                AttributeValue::Float(n)
            }
        }
        FieldValue::Float(Some(f)) => AttributeValue::Float(f64::from(f)),
        FieldValue::Integer(i) => AttributeValue::Integer(i64::from(i)),
        FieldValue::Logical(Some(b)) => AttributeValue::Bool(b),
        FieldValue::Date(Some(d)) => {
            AttributeValue::Date(format!("{:04}{:02}{:02}", d.year(), d.month(), d.day()))
        }
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None)
        | FieldValue::Date(None) => AttributeValue::Null,
        other => AttributeValue::String(format!("{other:?}")),
    }
}

// ---------------------------------------------------------------------------
// GeoJSON loader
// ---------------------------------------------------------------------------

/// Expected layout:
///
/// ```json
/// { "type": "FeatureCollection",
///   "features": [
///     { "type": "Feature",
///       "properties": { "STUSPS": "CA", "REGION": "4", "ALAND": 403..., "AWATER": 20... },
///       "geometry": { "type": "MultiPolygon", "coordinates": [...] } } ] }
/// ```
fn load_geojson(path: &Path) -> Result<Table, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let geojson: GeoJson = text.parse()?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => return Err(missing(0, "STUSPS")),
    };

    let mut records = Vec::with_capacity(features.len());
    for (row, feature) in features.into_iter().enumerate() {
        let geometry = feature
            .geometry
            .as_ref()
            .and_then(|g| geojson_to_multipolygon(&g.value))
            .ok_or(LoadError::UnsupportedGeometry { row })?;
        let columns: BTreeMap<String, AttributeValue> = feature
            .properties
            .unwrap_or_default()
            .into_iter()
            .map(|(key, val)| (key, json_to_attribute(&val)))
            .collect();
        records.push(build_record(row, columns, geometry)?);
    }
    check_unique(&records)?;

    Ok(Table::new(records, Some(Crs::Wgs84)))
}

fn geojson_to_multipolygon(value: &GeoJsonValue) -> Option<MultiPolygon<f64>> {
    match value {
        GeoJsonValue::Polygon(rings) => Some(MultiPolygon(vec![rings_to_polygon(rings)?])),
        GeoJsonValue::MultiPolygon(polygons) => polygons
            .iter()
            .map(|rings| rings_to_polygon(rings))
            .collect::<Option<Vec<_>>>()
            .map(MultiPolygon),
        _ => None,
    }
}

fn rings_to_polygon(rings: &[Vec<Vec<f64>>]) -> Option<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| {
        ring.iter()
            .map(|c| match c.as_slice() {
                [x, y, ..] => Some(Coord { x: *x, y: *y }),
                _ => None,
            })
            .collect::<Option<LineString<f64>>>()
    });
    let exterior = rings.next()??;
    let holes = rings.collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, holes))
}

fn json_to_attribute(val: &JsonValue) -> AttributeValue {
    match val {
        JsonValue::String(s) => AttributeValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                AttributeValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                AttributeValue::Float(f)
            } else {
                AttributeValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => AttributeValue::Bool(*b),
        JsonValue::Null => AttributeValue::Null,
        other => AttributeValue::String(other.to_string()),
    }
}
