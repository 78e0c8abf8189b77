use std::path::{Path, PathBuf};

use image::RgbImage;
use plotters::style::BLUE;

use crate::data::census::{region_name, CONTINENTAL_REGIONS};
use crate::data::derive::derive_attributes;
use crate::data::filter::{continental, select, Predicate};
use crate::data::loader::load_file;
use crate::data::model::{Column, Table};
use crate::error::Result;
use crate::render::{basemap_file_name, render_to_file, MapRenderer, RenderOptions};
use crate::spatial::{Crs, GeometryEngine};

// ---------------------------------------------------------------------------
// Pipeline state
// ---------------------------------------------------------------------------

/// The continental states table, ready to plot.
pub struct CensusMaps<E, R> {
    /// Continental rows in EPSG:4326 with areas and centroids derived.
    table: Table,

    /// Geometry backend used for reprojection and centroids.
    engine: E,

    /// Turns a table into an image.
    renderer: R,
}

impl<E: GeometryEngine, R: MapRenderer> CensusMaps<E, R> {
    /// Load a states file and run it through every stage. `fallback_crs`
    /// is assumed when the file declares no CRS.
    pub fn load(path: &Path, engine: E, renderer: R, fallback_crs: Option<Crs>) -> Result<Self> {
        let mut table = load_file(path)?;
        if let (None, Some(crs)) = (table.crs(), fallback_crs) {
            log::info!("no CRS in file, assuming {crs}");
            table.set_crs(crs);
        }
        Self::from_table(table, engine, renderer)
    }

    /// Run the reproject, filter and derive stages on an in-memory table.
    pub fn from_table(mut table: Table, engine: E, renderer: R) -> Result<Self> {
        table.reproject(&engine, Crs::Wgs84)?;

        let mut table = continental(&table);
        log::info!("{} continental rows", table.len());

        derive_attributes(&mut table, &engine)?;

        Ok(Self {
            table,
            engine,
            renderer,
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    // -----------------------------------------------------------------------
    // Plots
    // -----------------------------------------------------------------------

    /// Whole-country choropleth of `column`.
    pub fn states_plot(&self, column: &str, cmap: &str, output: &Path) -> Result<RgbImage> {
        let options = RenderOptions::new(column, cmap)
            .with_title(format!("United States Map - Variable = {column}"))
            .with_figsize(15.0, 10.0)
            .with_dpi(300)
            .with_output(output);
        render_to_file(&self.renderer, &self.table, &options)
    }

    /// One map per continental region, written to `out_dir`. Returns the
    /// files written, in region order.
    pub fn region_plots(&self, cmap: &str, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(CONTINENTAL_REGIONS.len());
        for &code in CONTINENTAL_REGIONS.iter() {
            let name = region_name(code).unwrap_or("Unknown");
            let subset = select(&self.table, &Predicate::Region(code));
            let path = out_dir.join(format!("region_{code}_{name}.png"));
            let options = RenderOptions::new(Column::Division.name(), cmap)
                .with_title(name)
                .with_output(&path);
            render_to_file(&self.renderer, &subset, &options)?;
            written.push(path);
        }
        Ok(written)
    }

    /// Land area with a marker on every centroid.
    pub fn centroid_plot(&self, output: &Path) -> Result<RgbImage> {
        let options = RenderOptions::new(Column::AlandMiles.name(), "Pastel1")
            .with_title("Map of US States with Centroids")
            .with_dpi(300)
            .with_centroids(true)
            .with_output(output);
        render_to_file(&self.renderer, &self.table, &options)
    }

    /// One state over a basemap at `zoom`. An unknown `st` renders an empty
    /// map without fetching tiles.
    pub fn state_plot(
        &self,
        st: &str,
        column: &str,
        cmap: &str,
        zoom: u8,
        dpi: u32,
        out_dir: &Path,
    ) -> Result<PathBuf> {
        let state = select(&self.table, &Predicate::State(st.to_string()));
        if state.is_empty() {
            log::warn!("no state with postal code {st}");
        }
        let path = out_dir.join(basemap_file_name(zoom));
        let options = RenderOptions::new(column, cmap)
            .with_title(format!("Map using Contextily - {column}"))
            .with_figsize(8.0, 8.0)
            .with_dpi(dpi)
            .with_edge_color(BLUE)
            .tiled(zoom)
            .with_output(&path);
        render_to_file(&self.renderer, &state, &options)?;
        Ok(path)
    }

    /// Every continental state over a basemap at `zoom`.
    pub fn us_basemap(
        &self,
        column: &str,
        cmap: &str,
        zoom: u8,
        dpi: u32,
        out_dir: &Path,
    ) -> Result<PathBuf> {
        let path = out_dir.join(basemap_file_name(zoom));
        let options = RenderOptions::new(column, cmap)
            .with_title("US Map using Contextily")
            .with_figsize(20.0, 12.0)
            .with_dpi(dpi)
            .tiled(zoom)
            .with_output(&path);
        render_to_file(&self.renderer, &self.table, &options)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, RenderError};
    use crate::sample::sample_table;
    use crate::spatial::PlanarEngine;
    use std::cell::RefCell;

    /// Records what it was asked to draw instead of drawing it.
    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<(Vec<String>, RenderOptions)>>,
    }

    impl MapRenderer for &Recorder {
        fn render(&self, table: &Table, options: &RenderOptions) -> Result<RgbImage> {
            options.column.parse::<Column>().map_err(Error::from)?;
            let keys = table.keys().iter().map(|k| k.to_string()).collect();
            self.calls.borrow_mut().push((keys, options.clone()));
            Ok(RgbImage::new(1, 1))
        }
    }

    #[test]
    fn stages_leave_49_derived_rows() {
        let recorder = Recorder::default();
        let maps = CensusMaps::from_table(sample_table(), PlanarEngine, &recorder).unwrap();
        assert_eq!(maps.table().len(), 49);
        assert_eq!(maps.table().crs(), Some(Crs::Wgs84));
        assert!(maps
            .table()
            .records()
            .iter()
            .all(|r| r.land_miles.is_some() && r.centroid.is_some()));
    }

    #[test]
    fn region_plots_cover_the_four_regions() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::default();
        let maps = CensusMaps::from_table(sample_table(), PlanarEngine, &recorder).unwrap();
        let written = maps.region_plots("Pastel1", dir.path()).unwrap();
        assert_eq!(written[0], dir.path().join("region_1_Northeast.png"));
        assert_eq!(written.len(), 4);

        let calls = recorder.calls.borrow();
        let total: usize = calls.iter().map(|(keys, _)| keys.len()).sum();
        assert_eq!(total, 49);
        assert_eq!(calls[2].1.title.as_deref(), Some("South"));
    }

    #[test]
    fn state_plot_uses_zoom_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::default();
        let maps = CensusMaps::from_table(sample_table(), PlanarEngine, &recorder).unwrap();
        let path = maps.state_plot("CA", "ALAND_miles", "summer", 7, 200, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("US Contextily Map with zoom = 7 .png"));

        let calls = recorder.calls.borrow();
        let (keys, options) = &calls[0];
        assert_eq!(keys, &vec!["CA".to_string()]);
        assert_eq!(options.pixel_size(), (1600, 1600));
        assert_eq!(options.alpha, 0.2);
    }

    #[test]
    fn unknown_column_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::default();
        let maps = CensusMaps::from_table(sample_table(), PlanarEngine, &recorder).unwrap();
        let output = dir.path().join("states.png");
        let err = maps.states_plot("POP", "summer", &output).unwrap_err();
        assert!(matches!(err, Error::Render(RenderError::UnknownColumn(_))));
        assert!(!output.exists());
    }
}
