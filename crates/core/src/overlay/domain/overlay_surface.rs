use crate::detection::domain::face_analysis::FaceDetection;
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// A drawable layer sized to the analyzed frame.
pub trait OverlaySurface: Send {
    /// Sets the drawing resolution. Changing the size discards the contents.
    fn resize(&mut self, width: u32, height: u32);

    fn clear(&mut self);

    /// Box outline plus a confidence bar under it.
    fn draw_box(&mut self, region: &Region, score: f32);

    fn draw_landmarks(&mut self, landmarks: &FaceLandmarks);

    fn size(&self) -> (u32, u32);

    /// Current contents as an RGBA frame, for surfaces backed by pixels.
    fn render(&self) -> Option<Frame> {
        None
    }
}

/// Resizes `surface` to `(width, height)`, clears it and draws `detection`.
pub fn draw_detection(
    surface: &mut dyn OverlaySurface,
    (width, height): (u32, u32),
    detection: &FaceDetection,
) {
    surface.resize(width, height);
    surface.clear();
    surface.draw_box(&detection.region, detection.score);
    surface.draw_landmarks(&detection.landmarks);
}


#[cfg(test)]
mod tests {
    use super::test_support::{DrawOp, RecordingSurface};
    use super::*;
    use crate::detection::domain::face_analysis::fixtures::detection;

    #[test]
    fn test_draw_detection_resizes_clears_then_draws() {
        let mut surface = RecordingSurface::default();
        let d = detection(30.0, vec![]);
        draw_detection(&mut surface, (640, 480), &d);

        assert_eq!(surface.size(), (640, 480));
        assert_eq!(
            surface.ops(),
            vec![
                DrawOp::Resize(640, 480),
                DrawOp::Clear,
                DrawOp::Box(d.region),
                DrawOp::Landmarks(68),
            ]
        );
    }
}
