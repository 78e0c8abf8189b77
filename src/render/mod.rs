//! Choropleth rendering, static or over a tiled basemap.

mod choropleth;
pub mod tiles;
pub mod viewport;

use std::path::PathBuf;

use image::RgbImage;
use plotters::style::{RGBColor, BLACK};

use crate::data::model::{Column, Table};
use crate::error::{RenderError, Result};

pub use choropleth::PlottersRenderer;
pub use tiles::{HttpTileSource, TileId, TileSource};

/// Output file name used for basemap plots at a given zoom.
pub fn basemap_file_name(zoom: u8) -> String {
    format!("US Contextily Map with zoom = {zoom} .png")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Polygons in the table's own CRS on a white canvas.
    Static,
    /// Polygons in web mercator over XYZ tiles fetched at `zoom`.
    Tiled { zoom: u8 },
}

/// What to draw and how.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Column name, e.g. `ALAND_miles`.
    pub column: String,
    /// Colour scale name, e.g. `summer` or `Pastel1`.
    pub color_scale: String,
    pub title: Option<String>,
    /// Figure size in inches.
    pub figsize: (f64, f64),
    pub dpi: u32,
    /// Fill opacity.
    pub alpha: f64,
    pub edge_color: RGBColor,
    pub line_width: u32,
    pub show_centroids: bool,
    pub mode: RenderMode,
    /// Written (and overwritten) only when the render succeeds.
    pub output: Option<PathBuf>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            column: Column::AlandMiles.name().to_string(),
            color_scale: "Pastel1".to_string(),
            title: None,
            figsize: (8.0, 6.0),
            dpi: 100,
            alpha: 0.5,
            edge_color: BLACK,
            line_width: 1,
            show_centroids: false,
            mode: RenderMode::Static,
            output: None,
        }
    }
}

impl RenderOptions {
    pub fn new(column: impl Into<String>, color_scale: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            color_scale: color_scale.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_figsize(mut self, width: f64, height: f64) -> Self {
        self.figsize = (width, height);
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_edge_color(mut self, color: RGBColor) -> Self {
        self.edge_color = color;
        self
    }

    pub fn with_centroids(mut self, show: bool) -> Self {
        self.show_centroids = show;
        self
    }

    /// Switch to basemap mode; the fill becomes mostly transparent.
    pub fn tiled(mut self, zoom: u8) -> Self {
        self.mode = RenderMode::Tiled { zoom };
        self.alpha = 0.2;
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Canvas size in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let px = |inches: f64| (inches * f64::from(self.dpi)).round() as u32;
        (px(self.figsize.0), px(self.figsize.1))
    }

    pub fn validate(&self) -> std::result::Result<(), RenderError> {
        let (w, h) = self.pixel_size();
        let invalid = |msg: String| -> std::result::Result<(), RenderError> {
            Err(RenderError::InvalidOptions(msg))
        };
        if !(self.figsize.0.is_finite() && self.figsize.1.is_finite()) || w == 0 || h == 0 {
            return invalid(format!("image size {w}x{h} px"));
        }
        if u64::from(w) * u64::from(h) > 400_000_000 {
            return invalid(format!("image size {w}x{h} px is too large"));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return invalid(format!("alpha {} outside [0, 1]", self.alpha));
        }
        if let RenderMode::Tiled { zoom } = self.mode {
            if zoom > tiles::MAX_ZOOM {
                return invalid(format!("zoom {zoom} above {}", tiles::MAX_ZOOM));
            }
        }
        Ok(())
    }
}

/// Something that turns a table into a picture.
pub trait MapRenderer {
    fn render(&self, table: &Table, options: &RenderOptions) -> Result<RgbImage>;
}

/// Render, then write `options.output` if set. Nothing is written when the
/// render fails.
pub fn render_to_file(
    renderer: &impl MapRenderer,
    table: &Table,
    options: &RenderOptions,
) -> Result<RgbImage> {
    let image = renderer.render(table, options)?;
    if let Some(path) = &options.output {
        image.save(path).map_err(RenderError::from)?;
        log::info!("wrote {}", path.display());
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_embeds_zoom() {
        assert_eq!(basemap_file_name(5), "US Contextily Map with zoom = 5 .png");
    }

    #[test]
    fn pixel_size_is_figsize_times_dpi() {
        let options = RenderOptions::default().with_figsize(8.0, 8.0).with_dpi(200);
        assert_eq!(options.pixel_size(), (1600, 1600));
    }

    #[test]
    fn validation() {
        assert!(RenderOptions::default().validate().is_ok());
        assert!(RenderOptions::default().with_dpi(0).validate().is_err());
        assert!(RenderOptions::default().with_alpha(1.5).validate().is_err());
        assert!(RenderOptions::default().tiled(20).validate().is_err());
        assert!(RenderOptions::default().tiled(9).validate().is_ok());
    }
}
