//! Software overlay rendered into a transparent RGBA frame.

use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::overlay::domain::overlay_surface::OverlaySurface;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

const BOX_COLOR: [u8; 4] = [0, 200, 255, 255];
const BAR_COLOR: [u8; 4] = [0, 200, 255, 200];
const LANDMARK_COLOR: [u8; 4] = [255, 255, 255, 230];
const CONTOUR_COLOR: [u8; 4] = [255, 255, 255, 140];
const LINE_WIDTH: i32 = 2;
const BAR_HEIGHT: i32 = 4;
const DOT_RADIUS: i32 = 1;

pub struct RgbaOverlay {
    canvas: Frame,
}

impl RgbaOverlay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: Frame::transparent(width, height),
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.canvas
    }

    fn put(&mut self, x: i32, y: i32, color: [u8; 4]) {
        let (w, h) = (self.canvas.width() as i32, self.canvas.height() as i32);
        if x < 0 || y < 0 || x >= w || y >= h {
            return;
        }
        let offset = (y as usize * w as usize + x as usize) * 4;
        self.canvas.data_mut()[offset..offset + 4].copy_from_slice(&color);
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: [u8; 4]) {
        for py in y..y + h {
            for px in x..x + w {
                self.put(px, py, color);
            }
        }
    }

    /// Bresenham line, one pixel wide.
    fn line(&mut self, (x0, y0): (i32, i32), (x1, y1): (i32, i32), color: [u8; 4]) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            self.put(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

impl OverlaySurface for RgbaOverlay {
    fn resize(&mut self, width: u32, height: u32) {
        if self.size() != (width, height) {
            self.canvas = Frame::transparent(width, height);
        }
    }

    fn clear(&mut self) {
        self.canvas.data_mut().fill(0);
    }

    fn draw_box(&mut self, region: &Region, score: f32) {
        let Region {
            x,
            y,
            width,
            height,
        } = *region;
        if width <= 0 || height <= 0 {
            return;
        }
        self.fill_rect(x, y, width, LINE_WIDTH, BOX_COLOR);
        self.fill_rect(x, y + height - LINE_WIDTH, width, LINE_WIDTH, BOX_COLOR);
        self.fill_rect(x, y, LINE_WIDTH, height, BOX_COLOR);
        self.fill_rect(x + width - LINE_WIDTH, y, LINE_WIDTH, height, BOX_COLOR);

        let bar = (width as f32 * score.clamp(0.0, 1.0)).round() as i32;
        self.fill_rect(x, y + height + 2, bar, BAR_HEIGHT, BAR_COLOR);
    }

    fn draw_landmarks(&mut self, landmarks: &FaceLandmarks) {
        let round = |&(x, y): &(f64, f64)| (x.round() as i32, y.round() as i32);

        for (points, closed) in landmarks.contours() {
            let pixels: Vec<(i32, i32)> = points.iter().map(round).collect();
            for pair in pixels.windows(2) {
                self.line(pair[0], pair[1], CONTOUR_COLOR);
            }
            if closed {
                if let (Some(&first), Some(&last)) = (pixels.first(), pixels.last()) {
                    self.line(last, first, CONTOUR_COLOR);
                }
            }
        }
        for (cx, cy) in landmarks.points().iter().map(round) {
            self.fill_rect(
                cx - DOT_RADIUS,
                cy - DOT_RADIUS,
                DOT_RADIUS * 2 + 1,
                DOT_RADIUS * 2 + 1,
                LANDMARK_COLOR,
            );
        }
    }

    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn render(&self) -> Option<Frame> {
        Some(self.canvas.clone())
    }
}

/// Alpha-blends `overlay` (RGBA) over `frame` into a new RGBA frame at the
/// frame's resolution. A differently sized overlay is sampled
/// nearest-neighbour.
pub fn compose(frame: &Frame, overlay: &Frame) -> Frame {
    let mut out = frame.to_rgba();
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    let (ow, oh) = (overlay.width() as usize, overlay.height() as usize);
    if ow == 0 || oh == 0 || overlay.channels() != 4 {
        return out;
    }

    let src = overlay.data();
    let dst = out.data_mut();
    for y in 0..h {
        let oy = (y * oh / h.max(1)).min(oh - 1);
        for x in 0..w {
            let ox = (x * ow / w.max(1)).min(ow - 1);
            let o = (oy * ow + ox) * 4;
            let alpha = src[o + 3] as u32;
            if alpha == 0 {
                continue;
            }
            let d = (y * w + x) * 4;
            for c in 0..3 {
                let blended = (src[o + c] as u32 * alpha + dst[d + c] as u32 * (255 - alpha)) / 255;
                dst[d + c] = blended as u8;
            }
        }
    }
    out
}
