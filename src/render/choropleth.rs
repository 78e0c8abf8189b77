use std::sync::OnceLock;

use geo_types::{Coord, LineString, Rect};
use image::{Rgb, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::register_font;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::tiles::{Basemap, HttpTileSource, TileSource, TILE_SIZE};
use super::viewport::{PixelArea, Viewport};
use super::{MapRenderer, RenderMode, RenderOptions};
use crate::color::{ColorMap, ColorScale};
use crate::data::model::{Column, Table};
use crate::error::{RenderError, Result};
use crate::spatial::engine::MERCATOR_HALF_EXTENT;
use crate::spatial::{Crs, GeometryEngine, PlanarEngine};

/// Fraction of the data extent left empty around the map.
const PADDING: f64 = 0.02;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

const FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Colour bar tick labels, evenly spaced from min to max.
const TICKS: usize = 5;

/// Register the embedded font as plotters' sans-serif family, once per
/// process.
fn ensure_font() -> std::result::Result<(), RenderError> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED
        .get_or_init(|| register_font("sans-serif", FontStyle::Normal, FONT).is_ok());
    if ok {
        Ok(())
    } else {
        Err(RenderError::Drawing("embedded font could not be loaded".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Layout: title on top, map on the left, colour bar and labels on the right
// ---------------------------------------------------------------------------

struct Layout {
    map: PixelArea,
    colorbar: PixelArea,
    margin: i32,
    title_size: f64,
    label_size: f64,
}

impl Layout {
    fn new(width: u32, height: u32, with_title: bool) -> Self {
        let (w, h) = (width as i32, height as i32);
        let base = f64::from(w.min(h));
        let margin = (base * 0.03).round().max(1.0) as i32;
        let title_size = (base * 0.045).max(8.0);
        let label_size = (base * 0.03).max(6.0);

        let title_band = if with_title { (title_size * 1.6).round() as i32 } else { 0 };
        let unit_band = (label_size * 1.8).round() as i32;
        let label_width = (label_size * 4.5).round() as i32;
        let tick = (label_size / 2.0).round().max(2.0) as i32;
        let bar_width = ((w as f64) * 0.03).round().max(4.0) as i32;

        let top = margin + title_band;
        let bar_right = w - margin - label_width - tick;
        let colorbar = PixelArea {
            left: bar_right - bar_width,
            top: top + unit_band,
            right: bar_right,
            bottom: h - margin,
        };
        let map = PixelArea {
            left: margin,
            top,
            right: colorbar.left - margin,
            bottom: h - margin,
        };
        Layout {
            map,
            colorbar,
            margin,
            title_size,
            label_size,
        }
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// [`MapRenderer`] rasterising with `plotters` onto an `image` buffer.
pub struct PlottersRenderer<E = PlanarEngine, T = HttpTileSource> {
    engine: E,
    tiles: T,
}

impl PlottersRenderer {
    /// Planar geometry, OpenStreetMap tiles.
    pub fn new() -> Self {
        Self::with_parts(PlanarEngine, HttpTileSource::openstreetmap())
    }
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, T> PlottersRenderer<E, T> {
    pub fn with_parts(engine: E, tiles: T) -> Self {
        Self { engine, tiles }
    }
}

impl<E: GeometryEngine, T: TileSource> MapRenderer for PlottersRenderer<E, T> {
    fn render(&self, table: &Table, options: &RenderOptions) -> Result<RgbImage> {
        let column: Column = options.column.parse()?;
        let scale = ColorScale::by_name(&options.color_scale)?;
        options.validate()?;
        let values = table.column_values(column)?;
        let color_map = ColorMap::new(scale, &values);

        log::info!(
            "rendering {} of {} records ({:?}){}",
            column,
            table.len(),
            options.mode,
            options.title.as_deref().map(|t| format!(": {t}")).unwrap_or_default()
        );

        let projected;
        let table = match options.mode {
            RenderMode::Static => table,
            RenderMode::Tiled { .. } => {
                let mut copy = table.clone();
                copy.reproject(&self.engine, Crs::WebMercator)?;
                projected = copy;
                &projected
            }
        };

        let (width, height) = options.pixel_size();
        let layout = Layout::new(width, height, options.title.is_some());
        let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);

        let Some(bounds) = table.total_bounds(&self.engine) else {
            log::info!("no geometry to draw; leaving the map empty");
            return Ok(canvas);
        };
        let viewport = Viewport::fit(bounds, layout.map, PADDING);

        if let RenderMode::Tiled { zoom } = options.mode {
            let visible = clamp_to_mercator(viewport.visible_world());
            let basemap = Basemap::fetch(&self.tiles, visible, zoom, tile_pixels(&viewport, zoom))?;
            paint_basemap(&mut canvas, &viewport, &basemap);
        }

        ensure_font()?;
        let map = MapLayers {
            table,
            values: &values,
            color_map: &color_map,
            column,
        };
        draw_map(&mut canvas, &map, &viewport, &layout, options)?;
        Ok(canvas)
    }
}

/// On-screen size of one tile at `zoom`; the mosaic is built at this
/// resolution instead of the tiles' native one.
fn tile_pixels(viewport: &Viewport, zoom: u8) -> u32 {
    let span = 2.0 * MERCATOR_HALF_EXTENT / 2f64.powi(i32::from(zoom));
    (span * viewport.scale()).ceil().clamp(1.0, f64::from(TILE_SIZE)) as u32
}

fn clamp_to_mercator(r: Rect<f64>) -> Rect<f64> {
    let clamp = |c: Coord<f64>| Coord {
        x: c.x.clamp(-MERCATOR_HALF_EXTENT, MERCATOR_HALF_EXTENT),
        y: c.y.clamp(-MERCATOR_HALF_EXTENT, MERCATOR_HALF_EXTENT),
    };
    Rect::new(clamp(r.min()), clamp(r.max()))
}

fn paint_basemap(canvas: &mut RgbImage, viewport: &Viewport, basemap: &Basemap) {
    let area = viewport.area;
    let (w, h) = canvas.dimensions();
    for py in area.top.max(0)..area.bottom.min(h as i32) {
        for px in area.left.max(0)..area.right.min(w as i32) {
            let world = viewport.to_world(f64::from(px) + 0.5, f64::from(py) + 0.5);
            if let Some(color) = basemap.sample(world) {
                canvas.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Vector layers
// ---------------------------------------------------------------------------

type Root<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// What gets drawn over the (optional) basemap.
struct MapLayers<'a> {
    table: &'a Table,
    values: &'a [f64],
    color_map: &'a ColorMap,
    column: Column,
}

fn drawing(e: impl std::fmt::Display) -> RenderError {
    RenderError::Drawing(e.to_string())
}

fn ring_pixels(ring: &LineString<f64>, viewport: &Viewport) -> Vec<(i32, i32)> {
    let mut points: Vec<(i32, i32)> = ring.coords().map(|c| viewport.to_pixel(*c)).collect();
    points.dedup();
    points
}

fn draw_map(
    canvas: &mut RgbImage,
    map: &MapLayers<'_>,
    viewport: &Viewport,
    layout: &Layout,
    options: &RenderOptions,
) -> std::result::Result<(), RenderError> {
    let (width, height) = canvas.dimensions();
    let buffer: &mut [u8] = canvas;
    let root = BitMapBackend::with_buffer(buffer, (width, height)).into_drawing_area();

    let edge = options.edge_color.stroke_width(options.line_width);
    for (record, value) in map.table.records().iter().zip(map.values) {
        let fill = map.color_map.color_for(*value).mix(options.alpha).filled();
        for polygon in record.geometry.0.iter() {
            let exterior = ring_pixels(polygon.exterior(), viewport);
            if exterior.len() < 3 {
                continue;
            }
            root.draw(&Polygon::new(exterior.clone(), fill)).map_err(drawing)?;
            if options.line_width > 0 {
                root.draw(&PathElement::new(exterior, edge)).map_err(drawing)?;
                for hole in polygon.interiors() {
                    root.draw(&PathElement::new(ring_pixels(hole, viewport), edge))
                        .map_err(drawing)?;
                }
            }
        }
    }

    if options.show_centroids {
        let radius = (options.dpi as i32 / 50).max(2);
        for centroid in map.table.records().iter().filter_map(|r| r.centroid) {
            root.draw(&Circle::new(viewport.to_pixel(centroid.0), radius, RED.filled()))
                .map_err(drawing)?;
        }
    }

    if let Some(title) = &options.title {
        let style = TextStyle::from((FontFamily::SansSerif, layout.title_size).into_font())
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Top));
        let anchor = ((width / 2) as i32, layout.margin);
        root.draw(&Text::new(title.as_str(), anchor, style)).map_err(drawing)?;
    }

    draw_colorbar(&root, layout, map)?;
    root.present().map_err(drawing)?;
    Ok(())
}

/// Vertical gradient, high values on top, with the column's unit above it
/// and evenly spaced value labels to its right.
fn draw_colorbar(
    root: &Root<'_>,
    layout: &Layout,
    map: &MapLayers<'_>,
) -> std::result::Result<(), RenderError> {
    let area = layout.colorbar;
    let span = (area.height() - 1).max(1);
    for y in area.top..area.bottom {
        let t = 1.0 - f64::from(y - area.top) / f64::from(span);
        let color = map.color_map.scale.color_at(t);
        root.draw(&Rectangle::new([(area.left, y), (area.right - 1, y)], color.filled()))
            .map_err(drawing)?;
    }
    root.draw(&Rectangle::new(
        [(area.left, area.top), (area.right - 1, area.bottom - 1)],
        BLACK.stroke_width(1),
    ))
    .map_err(drawing)?;

    let font = (FontFamily::SansSerif, layout.label_size).into_font();
    let unit = TextStyle::from(font.clone())
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Bottom));
    let unit_anchor = (area.left, area.top - (layout.label_size * 0.4).round() as i32);
    root.draw(&Text::new(map.column.unit(), unit_anchor, unit))
        .map_err(drawing)?;

    let label = TextStyle::from(font)
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Center));
    let tick = (layout.label_size / 2.0).round().max(2.0) as i32;
    for i in 0..TICKS {
        let fraction = i as f64 / (TICKS - 1) as f64;
        let value = map.color_map.min + fraction * (map.color_map.max - map.color_map.min);
        let y = area.bottom - 1 - (fraction * f64::from(span)).round() as i32;
        root.draw(&PathElement::new(
            vec![(area.right - 1, y), (area.right + tick, y)],
            BLACK.stroke_width(1),
        ))
        .map_err(drawing)?;
        root.draw(&Text::new(tick_label(value), (area.right + tick + 2, y), label.clone()))
            .map_err(drawing)?;
    }
    Ok(())
}

/// Short colour bar label: scientific for very large or small magnitudes.
fn tick_label(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1.0e6 || (magnitude > 0.0 && magnitude < 0.01) {
        format!("{value:.1e}")
    } else if magnitude >= 100.0 || value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::derive::derive_attributes;
    use crate::data::model::Record;
    use crate::error::{Error, TileFetchError};
    use crate::render::TileId;
    use geo_types::{polygon, MultiPolygon};

    struct Gray;

    impl TileSource for Gray {
        fn fetch(&self, _tile: TileId) -> std::result::Result<RgbImage, TileFetchError> {
            Ok(RgbImage::from_pixel(256, 256, Rgb([128, 128, 128])))
        }
    }

    fn table() -> Table {
        let square = |x0: f64, y0: f64| {
            MultiPolygon(vec![polygon![
                (x: x0, y: y0),
                (x: x0 + 4.0, y: y0),
                (x: x0 + 4.0, y: y0 + 4.0),
                (x: x0, y: y0 + 4.0),
            ]])
        };
        let mut t = Table::new(
            vec![
                Record::new("AA", 4, 1.0e11, 1.0e9, square(-120.0, 35.0)),
                Record::new("BB", 4, 3.0e11, 2.0e9, square(-110.0, 35.0)),
            ],
            Some(Crs::Wgs84),
        );
        derive_attributes(&mut t, &PlanarEngine).unwrap();
        t
    }

    fn renderer() -> PlottersRenderer<PlanarEngine, Gray> {
        PlottersRenderer::with_parts(PlanarEngine, Gray)
    }

    #[test]
    fn static_render_has_requested_size_and_fills_polygons() {
        let options = RenderOptions::new("ALAND_miles", "viridis")
            .with_figsize(4.0, 3.0)
            .with_dpi(50);
        let image = renderer().render(&table(), &options).unwrap();
        assert_eq!(image.dimensions(), (200, 150));
        assert!(image.pixels().any(|p| *p != BACKGROUND));
    }

    #[test]
    fn title_and_colorbar_labels_are_drawn() {
        let options = RenderOptions::new("ALAND_miles", "summer")
            .with_title("United States Map - Variable = ALAND_miles")
            .with_figsize(4.0, 3.0)
            .with_dpi(100);
        let image = renderer().render(&table(), &options).unwrap();
        let layout = Layout::new(400, 300, true);

        let inked = |x0: i32, y0: i32, x1: i32, y1: i32| {
            (y0..y1).any(|y| (x0..x1).any(|x| *image.get_pixel(x as u32, y as u32) != BACKGROUND))
        };
        // Title band above the map.
        assert!(inked(0, 0, 400, layout.map.top));
        // Tick labels right of the bar.
        let bar = layout.colorbar;
        assert!(inked(bar.right + 1, bar.top, 400, bar.bottom));
        // Unit above the bar.
        assert!(inked(bar.left, layout.map.top, 400, bar.top));
    }

    #[test]
    fn untitled_layout_gives_the_map_more_room() {
        let titled = Layout::new(400, 300, true);
        let untitled = Layout::new(400, 300, false);
        assert!(untitled.map.top < titled.map.top);
        assert_eq!(untitled.map.bottom, titled.map.bottom);
        assert!(untitled.colorbar.left > untitled.map.right);
    }

    #[test]
    fn tick_labels_stay_short() {
        assert_eq!(tick_label(0.0), "0");
        assert_eq!(tick_label(3.0), "3");
        assert_eq!(tick_label(12.345), "12.35");
        assert_eq!(tick_label(268_596.4), "268596");
        assert_eq!(tick_label(6.9e11), "6.9e11");
    }

    #[test]
    fn unknown_column_fails() {
        let options = RenderOptions::new("POPULATION", "viridis");
        assert!(matches!(
            renderer().render(&table(), &options),
            Err(Error::Render(RenderError::UnknownColumn(c))) if c == "POPULATION"
        ));
    }

    #[test]
    fn unknown_scale_fails() {
        let options = RenderOptions::new("ALAND", "rainbowish");
        assert!(matches!(
            renderer().render(&table(), &options),
            Err(Error::Render(RenderError::UnknownColorScale(_)))
        ));
    }

    #[test]
    fn empty_table_renders_blank_map() {
        let empty = table().with_records(vec![]);
        let options = RenderOptions::new("ALAND", "viridis")
            .with_figsize(2.0, 2.0)
            .with_dpi(20)
            .tiled(5);
        let image = renderer().render(&empty, &options).unwrap();
        assert!(image.pixels().all(|p| *p == BACKGROUND));
    }

    #[test]
    fn tiled_render_paints_basemap() {
        let options = RenderOptions::new("ALAND_miles", "summer")
            .with_figsize(4.0, 4.0)
            .with_dpi(50)
            .tiled(4);
        let image = renderer().render(&table(), &options).unwrap();
        // Corner of the map area is basemap, not background or fill.
        let layout = Layout::new(200, 200, false);
        let corner = image.get_pixel(layout.map.left as u32 + 1, layout.map.top as u32 + 1);
        assert_eq!(*corner, Rgb([128, 128, 128]));
    }

    #[test]
    fn mosaic_resolution_follows_the_canvas() {
        let mut mercator = table();
        mercator.reproject(&PlanarEngine, Crs::WebMercator).unwrap();
        let bounds = mercator.total_bounds(&PlanarEngine).unwrap();
        let viewport = Viewport::fit(bounds, Layout::new(200, 200, false).map, PADDING);

        assert_eq!(tile_pixels(&viewport, 0), TILE_SIZE);
        assert!(tile_pixels(&viewport, 8) < tile_pixels(&viewport, 4));
        assert_eq!(tile_pixels(&viewport, 19), 1);
    }

    #[test]
    fn zoom_too_deep_for_the_extent_is_refused() {
        let options = RenderOptions::new("ALAND_miles", "summer")
            .with_figsize(2.0, 2.0)
            .with_dpi(10)
            .tiled(19);
        assert!(matches!(
            renderer().render(&table(), &options),
            Err(Error::Render(RenderError::InvalidOptions(_)))
        ));
    }

    #[test]
    fn tiled_render_needs_a_crs() {
        let t = Table::new(table().records().to_vec(), None);
        let options = RenderOptions::new("ALAND", "summer").tiled(3);
        assert!(matches!(renderer().render(&t, &options), Err(Error::Projection(_))));
    }
}
