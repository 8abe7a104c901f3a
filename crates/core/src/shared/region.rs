use serde::Serialize;

/// Axis-aligned bounding box in pixel coordinates of the frame it was found in.
///
/// May extend past the frame edges; use [`Region::clamp_to`] before indexing pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a region from corner coordinates, rounding outward-in to whole pixels.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let x = x1.round() as i32;
        let y = y1.round() as i32;
        Self {
            x,
            y,
            width: (x2.round() as i32 - x).max(0),
            height: (y2.round() as i32 - y).max(0),
        }
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Intersection with `[0, width) x [0, height)`, or `None` if empty.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Region> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = (self.x + self.width).min(width as i32);
        let y2 = (self.y + self.height).min(height as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Region::new(x1, y1, x2 - x1, y2 - y1))
    }

    /// Square region sharing this region's center, with side
    /// `max(width, height) * (1 + padding)`.
    ///
    /// Not clamped: [`Frame::crop`](crate::shared::frame::Frame::crop) pads
    /// the part outside the frame, so face nets always get a square.
    pub fn padded_square(&self, padding: f64) -> Region {
        let (cx, cy) = self.center();
        let side = (self.width.max(self.height) as f64 * (1.0 + padding)).round();
        let half = side / 2.0;
        Region::from_corners(cx - half, cy - half, cx + half, cy + half)
    }
}
