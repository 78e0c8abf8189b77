//! World ↔ pixel mapping for a rectangular plot area.

use geo_types::{Coord, Rect};

/// Pixel rectangle on the canvas, `right`/`bottom` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelArea {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PixelArea {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Equal-aspect projection of a world rectangle into a [`PixelArea`],
/// centred, with y growing downwards on screen.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub area: PixelArea,
    scale: f64,
    origin_x: f64,
    origin_y: f64,
}

impl Viewport {
    /// Fit `bounds` (padded by `pad` of its size on each side) into `area`.
    pub fn fit(bounds: Rect<f64>, area: PixelArea, pad: f64) -> Self {
        let dx = bounds.width() * (1.0 + 2.0 * pad);
        let dy = bounds.height() * (1.0 + 2.0 * pad);
        let w = f64::from(area.width().max(1));
        let h = f64::from(area.height().max(1));

        let scale = match (dx > 0.0, dy > 0.0) {
            (true, true) => (w / dx).min(h / dy),
            (true, false) => w / dx,
            (false, true) => h / dy,
            (false, false) => 1.0,
        };

        let center = bounds.center();
        let screen_cx = f64::from(area.left) + w / 2.0;
        let screen_cy = f64::from(area.top) + h / 2.0;
        Viewport {
            area,
            scale,
            origin_x: center.x - screen_cx / scale,
            origin_y: center.y + screen_cy / scale,
        }
    }

    /// Pixels per world unit.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn to_pixel(&self, c: Coord<f64>) -> (i32, i32) {
        let (x, y) = self.to_screen(c);
        (x.round() as i32, y.round() as i32)
    }

    pub fn to_screen(&self, c: Coord<f64>) -> (f64, f64) {
        ((c.x - self.origin_x) * self.scale, (self.origin_y - c.y) * self.scale)
    }

    pub fn to_world(&self, x: f64, y: f64) -> Coord<f64> {
        Coord {
            x: self.origin_x + x / self.scale,
            y: self.origin_y - y / self.scale,
        }
    }

    /// World rectangle covered by the whole pixel area.
    pub fn visible_world(&self) -> Rect<f64> {
        Rect::new(
            self.to_world(f64::from(self.area.left), f64::from(self.area.bottom)),
            self.to_world(f64::from(self.area.right), f64::from(self.area.top)),
        )
    }
}
