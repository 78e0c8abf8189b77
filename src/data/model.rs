use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use geo_types::{Coord, MultiPolygon, Point, Rect};

use crate::error::{ProjectionError, RenderError};
use crate::spatial::{Crs, GeometryEngine};

// ---------------------------------------------------------------------------
// AttributeValue – a single pass-through cell
// ---------------------------------------------------------------------------

/// A dynamically-typed attribute value for the dBase/GeoJSON columns that
/// are not part of the [`Record`] schema.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// `YYYYMMDD` as stored by dBase.
    Date(String),
    Null,
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => write!(f, "{s}"),
            AttributeValue::Integer(i) => write!(f, "{i}"),
            AttributeValue::Float(v) => write!(f, "{v}"),
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Date(d) => write!(f, "{d}"),
            AttributeValue::Null => write!(f, "<null>"),
        }
    }
}

impl AttributeValue {
    /// Numeric view, also accepting numeric text such as TIGER's `"+37.15"`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Column – the numeric fields a map can be coloured by
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Aland,
    Awater,
    AlandMiles,
    AwaterMiles,
    Region,
    Division,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Aland,
        Column::Awater,
        Column::AlandMiles,
        Column::AwaterMiles,
        Column::Region,
        Column::Division,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Aland => "ALAND",
            Column::Awater => "AWATER",
            Column::AlandMiles => "ALAND_miles",
            Column::AwaterMiles => "AWATER_miles",
            Column::Region => "REGION",
            Column::Division => "DIVISION",
        }
    }

    /// Unit label drawn above the colour bar.
    pub fn unit(self) -> &'static str {
        match self {
            Column::Aland | Column::Awater => "Square meters",
            Column::AlandMiles | Column::AwaterMiles => "Square miles",
            Column::Region | Column::Division => "Code",
        }
    }
}

impl FromStr for Column {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| RenderError::UnknownColumn(s.to_string()))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Record – one state or territory
// ---------------------------------------------------------------------------

/// One row of the states table.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// USPS abbreviation, unique across the table.
    pub stusps: String,
    pub name: String,
    /// Census region code (1–4, or 9 for Puerto Rico and the Island Areas).
    pub region: u8,
    pub division: u8,
    pub statefp: String,
    /// Land area in square meters.
    pub aland: f64,
    /// Water area in square meters.
    pub awater: f64,
    /// Census internal point (`INTPTLON`, `INTPTLAT`), in the table's CRS.
    pub interior_point: Option<Point<f64>>,
    /// Remaining source columns: column_name → value.
    pub attributes: BTreeMap<String, AttributeValue>,
    pub geometry: MultiPolygon<f64>,

    pub land_miles: Option<f64>,
    pub water_miles: Option<f64>,
    pub centroid: Option<Point<f64>>,
}

impl Record {
    /// A record with the required fields and nothing derived yet.
    pub fn new(
        stusps: impl Into<String>,
        region: u8,
        aland: f64,
        awater: f64,
        geometry: MultiPolygon<f64>,
    ) -> Self {
        Self {
            stusps: stusps.into(),
            name: String::new(),
            region,
            division: 0,
            statefp: String::new(),
            aland,
            awater,
            interior_point: None,
            attributes: BTreeMap::new(),
            geometry,
            land_miles: None,
            water_miles: None,
            centroid: None,
        }
    }

    /// Numeric value of `column`; a derived column that was never derived
    /// is an error rather than a silent gap in the map.
    pub fn value(&self, column: Column) -> Result<f64, RenderError> {
        let derived = |v: Option<f64>| {
            v.ok_or_else(|| RenderError::ColumnNotDerived(column.name().to_string()))
        };
        match column {
            Column::Aland => Ok(self.aland),
            Column::Awater => Ok(self.awater),
            Column::AlandMiles => derived(self.land_miles),
            Column::AwaterMiles => derived(self.water_miles),
            Column::Region => Ok(f64::from(self.region)),
            Column::Division => Ok(f64::from(self.division)),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – the whole dataset
// ---------------------------------------------------------------------------

/// Ordered records plus the coordinate reference system of their geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    records: Vec<Record>,
    crs: Option<Crs>,
}

impl Table {
    /// Build a table. Callers guarantee unique `stusps`; the loader checks it.
    pub fn new(records: Vec<Record>, crs: Option<Crs>) -> Self {
        debug_assert!(
            {
                let mut keys: Vec<&str> = records.iter().map(|r| r.stusps.as_str()).collect();
                keys.sort_unstable();
                keys.windows(2).all(|w| w[0] != w[1])
            },
            "duplicate postal abbreviation"
        );
        Self { records, crs }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn get(&self, stusps: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.stusps == stusps)
    }

    /// Postal abbreviations in row order.
    pub fn keys(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.stusps.as_str()).collect()
    }

    pub fn crs(&self) -> Option<Crs> {
        self.crs
    }

    /// Declare the CRS of the coordinates without transforming them.
    pub fn set_crs(&mut self, crs: Crs) {
        self.crs = Some(crs);
    }

    /// Keep only the records for which `keep` returns true, in order.
    pub fn retain(&mut self, keep: impl FnMut(&Record) -> bool) {
        self.records.retain(keep);
    }

    /// A table with the same CRS holding `records`.
    pub fn with_records(&self, records: Vec<Record>) -> Table {
        Table {
            records,
            crs: self.crs,
        }
    }

    /// West, south, east, north extent of all geometry.
    pub fn total_bounds(&self, engine: &impl GeometryEngine) -> Option<Rect<f64>> {
        self.records
            .iter()
            .filter_map(|r| engine.bounds(&r.geometry))
            .reduce(|a, b| {
                Rect::new(
                    Coord {
                        x: a.min().x.min(b.min().x),
                        y: a.min().y.min(b.min().y),
                    },
                    Coord {
                        x: a.max().x.max(b.max().x),
                        y: a.max().y.max(b.max().y),
                    },
                )
            })
    }

    /// Values of `column` in row order.
    pub fn column_values(&self, column: Column) -> Result<Vec<f64>, RenderError> {
        self.records.iter().map(|r| r.value(column)).collect()
    }

    /// Reproject every geometry (and the point fields) into `target`.
    pub fn reproject(
        &mut self,
        engine: &impl GeometryEngine,
        target: Crs,
    ) -> Result<(), ProjectionError> {
        let source = self.crs.ok_or(ProjectionError::MissingSourceCrs)?;
        self.transform(engine, source, target);
        Ok(())
    }

    /// Like [`Table::reproject`], using `source` when the table has no CRS.
    pub fn reproject_from(&mut self, engine: &impl GeometryEngine, source: Crs, target: Crs) {
        let source = self.crs.unwrap_or(source);
        self.transform(engine, source, target);
    }

    fn transform(&mut self, engine: &impl GeometryEngine, source: Crs, target: Crs) {
        if source != target {
            log::debug!("reprojecting {} records {source} -> {target}", self.records.len());
            for record in &mut self.records {
                engine.reproject(&mut record.geometry, source, target);
                record.interior_point = record
                    .interior_point
                    .map(|p| engine.reproject_point(p, source, target));
                record.centroid = record
                    .centroid
                    .map(|p| engine.reproject_point(p, source, target));
            }
        }
        self.crs = Some(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::PlanarEngine;
    use geo_types::polygon;

    fn record(stusps: &str, x0: f64, y0: f64) -> Record {
        let geometry = MultiPolygon(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + 1.0, y: y0),
            (x: x0 + 1.0, y: y0 + 1.0),
            (x: x0, y: y0 + 1.0),
        ]]);
        Record::new(stusps, 4, 1.0e9, 2.0e8, geometry)
    }

    #[test]
    fn column_names_parse() {
        assert_eq!("ALAND_miles".parse::<Column>().unwrap(), Column::AlandMiles);
        assert_eq!(Column::AwaterMiles.unit(), "Square miles");
        assert!(matches!(
            "aland".parse::<Column>(),
            Err(RenderError::UnknownColumn(name)) if name == "aland"
        ));
    }

    #[test]
    fn derived_value_before_derivation_is_an_error() {
        let r = record("CA", 0.0, 0.0);
        assert_eq!(r.value(Column::Aland).unwrap(), 1.0e9);
        assert!(matches!(
            r.value(Column::AlandMiles),
            Err(RenderError::ColumnNotDerived(_))
        ));
    }

    #[test]
    fn total_bounds_covers_all_records() {
        let table = Table::new(
            vec![record("CA", -124.0, 32.0), record("NY", -79.0, 40.0)],
            Some(Crs::Wgs84),
        );
        let bounds = table.total_bounds(&PlanarEngine).unwrap();
        assert_eq!(bounds.min(), Coord { x: -124.0, y: 32.0 });
        assert_eq!(bounds.max(), Coord { x: -78.0, y: 41.0 });
        assert!(Table::default().total_bounds(&PlanarEngine).is_none());
    }

    #[test]
    fn reproject_without_crs_fails() {
        let mut table = Table::new(vec![record("CA", 0.0, 0.0)], None);
        assert_eq!(
            table.reproject(&PlanarEngine, Crs::Wgs84),
            Err(ProjectionError::MissingSourceCrs)
        );
        table.reproject_from(&PlanarEngine, Crs::Nad83, Crs::Wgs84);
        assert_eq!(table.crs(), Some(Crs::Wgs84));
    }

    #[test]
    fn reprojecting_twice_is_idempotent() {
        let mut table = Table::new(vec![record("CA", -120.5, 36.25)], Some(Crs::Nad83));
        table.reproject(&PlanarEngine, Crs::Wgs84).unwrap();
        let once = table.clone();
        table.reproject(&PlanarEngine, Crs::Wgs84).unwrap();
        assert_eq!(table, once);

        table.reproject(&PlanarEngine, Crs::WebMercator).unwrap();
        let mercator = table.clone();
        table.reproject(&PlanarEngine, Crs::WebMercator).unwrap();
        assert_eq!(table, mercator);
    }

    #[test]
    fn attribute_values_parse() {
        assert_eq!(AttributeValue::Integer(3).as_f64(), Some(3.0));
        assert!(AttributeValue::Null.is_null());
        assert_eq!(AttributeValue::String("+37.15".into()).as_f64(), Some(37.15));
        assert_eq!(AttributeValue::Bool(true).as_f64(), None);
    }
}
