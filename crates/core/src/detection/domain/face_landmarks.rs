//! 68-point face landmarks (iBUG 300-W layout).
//!
//! Point groups: jaw 0-16, brows 17-26, nose 27-35, eyes 36-47, mouth 48-67.

use crate::shared::frame::Frame;
use crate::shared::region::Region;

pub const LANDMARK_COUNT: usize = 68;

/// `(first, last, closed)` index ranges of the drawable contours.
const CONTOURS: [(usize, usize, bool); 9] = [
    (0, 16, false),  // jaw
    (17, 21, false), // left brow
    (22, 26, false), // right brow
    (27, 30, false), // nose bridge
    (31, 35, false), // nose base
    (36, 41, true),  // left eye
    (42, 47, true),  // right eye
    (48, 59, true),  // outer lip
    (60, 67, true),  // inner lip
];

/// Predicts landmark positions on a square face crop.
///
/// Points are normalized to `[0, 1]` relative to the crop; the caller maps
/// them back into frame space.
pub trait LandmarkNet: Send {
    fn predict(&mut self, face: &Frame) -> Result<Vec<(f64, f64)>, Box<dyn std::error::Error>>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    points: Vec<(f64, f64)>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, String> {
        if points.len() != LANDMARK_COUNT {
            return Err(format!(
                "expected {LANDMARK_COUNT} landmarks, got {}",
                points.len()
            ));
        }
        Ok(Self { points })
    }

    /// Maps crop-normalized points into the frame that `crop` was cut from.
    pub fn from_normalized(normalized: &[(f64, f64)], crop: &Region) -> Result<Self, String> {
        let points = normalized
            .iter()
            .map(|&(nx, ny)| {
                (
                    crop.x as f64 + nx * crop.width as f64,
                    crop.y as f64 + ny * crop.height as f64,
                )
            })
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Polylines for drawing: each slice with whether it closes on itself.
    pub fn contours(&self) -> impl Iterator<Item = (&[(f64, f64)], bool)> {
        CONTOURS
            .iter()
            .map(move |&(first, last, closed)| (&self.points[first..=last], closed))
    }
}
