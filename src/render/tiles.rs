//! XYZ basemap tiles in web mercator.

use std::cell::RefCell;
use std::collections::HashMap;

use geo_types::{Coord, Rect};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::error::{RenderError, Result, TileFetchError};
use crate::spatial::engine::MERCATOR_HALF_EXTENT;

/// Edge length of a standard tile in pixels.
pub const TILE_SIZE: u32 = 256;

pub const MAX_ZOOM: u8 = 19;

/// OpenStreetMap standard ("Mapnik") style.
pub const OSM_MAPNIK: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

/// Somewhere basemap tiles come from.
pub trait TileSource {
    fn fetch(&self, tile: TileId) -> std::result::Result<RgbImage, TileFetchError>;
}

// ---------------------------------------------------------------------------
// HTTP tile server
// ---------------------------------------------------------------------------

/// Tiles from a `{z}/{x}/{y}` URL template, fetched synchronously and kept
/// in memory for the life of the source.
pub struct HttpTileSource {
    template: String,
    user_agent: String,
    cache: RefCell<HashMap<TileId, RgbImage>>,
}

impl HttpTileSource {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            user_agent: format!("census-maps/{}", env!("CARGO_PKG_VERSION")),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn openstreetmap() -> Self {
        Self::new(OSM_MAPNIK)
    }

    pub fn url(&self, tile: TileId) -> String {
        self.template
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }
}

impl Default for HttpTileSource {
    fn default() -> Self {
        Self::openstreetmap()
    }
}

impl TileSource for HttpTileSource {
    fn fetch(&self, tile: TileId) -> std::result::Result<RgbImage, TileFetchError> {
        if let Some(cached) = self.cache.borrow().get(&tile) {
            return Ok(cached.clone());
        }

        let url = self.url(tile);
        log::debug!("fetching tile {url}");
        let request_error = |source: ureq::Error| TileFetchError::Request {
            url: url.clone(),
            source: Box::new(source),
        };
        let mut response = ureq::get(&url)
            .header("User-Agent", &self.user_agent)
            .call()
            .map_err(request_error)?;
        let bytes = response.body_mut().read_to_vec().map_err(request_error)?;
        let image = image::load_from_memory(&bytes)
            .map_err(|source| TileFetchError::Decode {
                url: url.clone(),
                source,
            })?
            .to_rgb8();

        self.cache.borrow_mut().insert(tile, image.clone());
        Ok(image)
    }
}

// ---------------------------------------------------------------------------
// Tile math
// ---------------------------------------------------------------------------

/// Fractional tile coordinates of a web mercator point at `zoom`.
pub fn tile_position(c: Coord<f64>, zoom: u8) -> (f64, f64) {
    let n = 2f64.powi(i32::from(zoom));
    let span = 2.0 * MERCATOR_HALF_EXTENT;
    (
        (c.x + MERCATOR_HALF_EXTENT) / span * n,
        (MERCATOR_HALF_EXTENT - c.y) / span * n,
    )
}

/// Inclusive tile index ranges `(x0, x1, y0, y1)` covering `bounds`.
pub fn tile_range(bounds: Rect<f64>, zoom: u8) -> (u32, u32, u32, u32) {
    let last = ((1u64 << zoom.min(32)) - 1).min(u64::from(u32::MAX)) as u32;
    let index = |v: f64| (v.floor().max(0.0) as u32).min(last);
    let (x0, y0) = tile_position(Coord { x: bounds.min().x, y: bounds.max().y }, zoom);
    let (x1, y1) = tile_position(Coord { x: bounds.max().x, y: bounds.min().y }, zoom);
    (index(x0), index(x1), index(y0), index(y1))
}

// ---------------------------------------------------------------------------
// Basemap mosaic
// ---------------------------------------------------------------------------

/// Most tiles a single basemap may request.
pub const MAX_TILES: u64 = 4096;

/// Number of tiles covering `bounds` at `zoom`.
pub fn tile_count(bounds: Rect<f64>, zoom: u8) -> u64 {
    let (x0, x1, y0, y1) = tile_range(bounds, zoom);
    (u64::from(x1 - x0) + 1).saturating_mul(u64::from(y1 - y0) + 1)
}

/// The tiles covering an extent, stitched into one image at `tile_px`
/// pixels per tile.
pub struct Basemap {
    zoom: u8,
    x0: u32,
    y0: u32,
    tile_px: u32,
    image: RgbImage,
}

impl Basemap {
    /// Fetch every tile covering `bounds` (web mercator), scaling each to
    /// `tile_px` (at most [`TILE_SIZE`]). Stops at the first failed tile.
    ///
    /// Requests above [`MAX_ZOOM`] or [`MAX_TILES`] fail before anything is
    /// fetched.
    pub fn fetch(
        source: &impl TileSource,
        bounds: Rect<f64>,
        zoom: u8,
        tile_px: u32,
    ) -> Result<Self> {
        if zoom > MAX_ZOOM {
            return Err(RenderError::InvalidOptions(format!("zoom {zoom} above {MAX_ZOOM}")).into());
        }
        let count = tile_count(bounds, zoom);
        if count > MAX_TILES {
            return Err(RenderError::InvalidOptions(format!(
                "{count} basemap tiles at zoom {zoom}, limit is {MAX_TILES}; use a lower zoom"
            ))
            .into());
        }

        let (x0, x1, y0, y1) = tile_range(bounds, zoom);
        let tile_px = tile_px.clamp(1, TILE_SIZE);
        let cols = x1 - x0 + 1;
        let rows = y1 - y0 + 1;
        log::info!("fetching {count} basemap tiles at zoom {zoom}");

        let mut image = RgbImage::new(cols * tile_px, rows * tile_px);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let mut tile = source.fetch(TileId { z: zoom, x, y })?;
                if tile.dimensions() != (tile_px, tile_px) {
                    tile = imageops::resize(&tile, tile_px, tile_px, FilterType::Triangle);
                }
                imageops::replace(
                    &mut image,
                    &tile,
                    i64::from((x - x0) * tile_px),
                    i64::from((y - y0) * tile_px),
                );
            }
        }
        Ok(Basemap {
            zoom,
            x0,
            y0,
            tile_px,
            image,
        })
    }

    /// Basemap colour under a web mercator point, if covered.
    pub fn sample(&self, c: Coord<f64>) -> Option<Rgb<u8>> {
        let (tx, ty) = tile_position(c, self.zoom);
        let px = (tx - f64::from(self.x0)) * f64::from(self.tile_px);
        let py = (ty - f64::from(self.y0)) * f64::from(self.tile_px);
        if px < 0.0 || py < 0.0 {
            return None;
        }
        self.image.get_pixel_checked(px as u32, py as u32).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::spatial::engine::lon_lat_to_mercator;
    use std::cell::Cell;

    struct Solid {
        calls: Cell<usize>,
    }

    impl TileSource for Solid {
        fn fetch(&self, tile: TileId) -> std::result::Result<RgbImage, TileFetchError> {
            self.calls.set(self.calls.get() + 1);
            Ok(RgbImage::from_pixel(64, 64, Rgb([tile.x as u8, tile.y as u8, 7])))
        }
    }

    #[test]
    fn url_template_substitution() {
        let source = HttpTileSource::new("https://tiles.example/{z}/{x}/{y}.png");
        assert_eq!(
            source.url(TileId { z: 5, x: 7, y: 12 }),
            "https://tiles.example/5/7/12.png"
        );
    }

    #[test]
    fn world_is_one_tile_at_zoom_zero() {
        let world = Rect::new(
            Coord { x: -MERCATOR_HALF_EXTENT, y: -MERCATOR_HALF_EXTENT },
            Coord { x: MERCATOR_HALF_EXTENT, y: MERCATOR_HALF_EXTENT },
        );
        assert_eq!(tile_range(world, 0), (0, 0, 0, 0));
        assert_eq!(tile_range(world, 2), (0, 3, 0, 3));
    }

    #[test]
    fn continental_us_at_zoom_five() {
        assert_eq!(tile_range(continental_us(), 5), (4, 10, 10, 13));
        assert_eq!(tile_count(continental_us(), 5), 28);
    }

    fn continental_us() -> Rect<f64> {
        Rect::new(
            lon_lat_to_mercator(Coord { x: -124.7, y: 24.5 }),
            lon_lat_to_mercator(Coord { x: -66.9, y: 49.4 }),
        )
    }

    #[test]
    fn oversized_mosaic_is_refused_before_fetching() {
        let source = Solid { calls: Cell::new(0) };
        assert!(tile_count(continental_us(), MAX_ZOOM) > 3_000_000_000);

        let result = Basemap::fetch(&source, continental_us(), MAX_ZOOM, 16);
        assert!(matches!(
            result,
            Err(Error::Render(RenderError::InvalidOptions(_)))
        ));
        let result = Basemap::fetch(&source, continental_us(), 40, 16);
        assert!(matches!(
            result,
            Err(Error::Render(RenderError::InvalidOptions(_)))
        ));
        assert_eq!(source.calls.get(), 0);
    }

    #[test]
    fn mosaic_places_tiles() {
        let source = Solid { calls: Cell::new(0) };
        let bounds = Rect::new(Coord { x: -1.0, y: -1.0 }, Coord { x: 1.0, y: 1.0 });
        let basemap = Basemap::fetch(&source, bounds, 1, 32).unwrap();
        assert_eq!(source.calls.get(), 4);
        assert_eq!(basemap.image.dimensions(), (64, 64));

        let north_west = Coord { x: -1000.0, y: 1000.0 };
        let south_east = Coord { x: 1000.0, y: -1000.0 };
        assert_eq!(basemap.sample(north_west), Some(Rgb([0, 0, 7])));
        assert_eq!(basemap.sample(south_east), Some(Rgb([1, 1, 7])));
    }
}
