use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::detection::domain::face_analysis::{FaceResult, FrameAnalysis};
use crate::media::image_file::read_image;
use crate::overlay::domain::overlay_surface::{draw_detection, OverlaySurface};
use crate::overlay::infrastructure::rgba_overlay::compose;
use crate::pipeline::analysis_sink::{AnalysisUpdate, SharedSink};
use crate::pipeline::detect_face_use_case::{DetectFaceUseCase, DetectionError};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("no image selected")]
    NoImage,
    #[error("failed to load image: {0}")]
    Load(String),
    #[error(transparent)]
    Detection(#[from] DetectionError),
}

/// Single-shot analysis of a user-selected still image.
///
/// Selecting an image never runs detection; [`AnalyzeImageUseCase::analyze`]
/// does, once per call.
pub struct AnalyzeImageUseCase {
    detector: Arc<DetectFaceUseCase>,
    surface: Box<dyn OverlaySurface>,
    sink: SharedSink,
    image: Option<Frame>,
    current: Option<FaceResult>,
}

impl AnalyzeImageUseCase {
    pub fn new(
        detector: Arc<DetectFaceUseCase>,
        surface: Box<dyn OverlaySurface>,
        sink: SharedSink,
    ) -> Self {
        Self {
            detector,
            surface,
            sink,
            image: None,
            current: None,
        }
    }

    /// Replaces the current image and clears any previous result.
    pub fn select_image(&mut self, image: Frame) {
        self.current = None;
        self.surface.clear();
        self.sink.publish(AnalysisUpdate {
            analysis: None,
            frame: Some(image.clone()),
        });
        self.image = Some(image);
    }

    pub fn select_image_file(&mut self, path: &Path) -> Result<(), AnalyzeError> {
        let image = read_image(path).map_err(|e| AnalyzeError::Load(e.to_string()))?;
        log::info!(
            "Selected {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        self.select_image(image);
        Ok(())
    }

    pub fn current_analysis(&self) -> Option<&FrameAnalysis> {
        self.current.as_ref().map(|r| &r.analysis)
    }

    /// The image with the overlay composited, if an image is selected.
    pub fn composed(&self) -> Option<Frame> {
        let image = self.image.as_ref()?;
        Some(match self.surface.render() {
            Some(overlay) => compose(image, &overlay),
            None => image.clone(),
        })
    }

    /// Detects on the current image at its natural resolution, draws the
    /// result and publishes it. `Ok(None)` when no face was found.
    pub fn analyze(&mut self) -> Result<Option<FrameAnalysis>, AnalyzeError> {
        let image = self.image.as_ref().ok_or(AnalyzeError::NoImage)?;
        let size = (image.width(), image.height());
        let outcome = self.detector.detect_one(image);

        self.current = None;
        match outcome {
            Ok(Some(result)) => {
                draw_detection(self.surface.as_mut(), size, &result.detection);
                let analysis = result.analysis.clone();
                self.current = Some(result);
                self.sink.publish(AnalysisUpdate {
                    analysis: Some(analysis.clone()),
                    frame: self.composed(),
                });
                Ok(Some(analysis))
            }
            Ok(None) => {
                self.reset_surface(size);
                Ok(None)
            }
            Err(e) => {
                log::warn!("Image analysis failed: {e}");
                self.reset_surface(size);
                Err(e.into())
            }
        }
    }

    fn reset_surface(&mut self, (width, height): (u32, u32)) {
        self.surface.resize(width, height);
        self.surface.clear();
        self.sink.publish(AnalysisUpdate {
            analysis: None,
            frame: self.image.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::detection::domain::expression::Expression;
    use crate::media::image_file::write_image;
    use crate::overlay::domain::overlay_surface::test_support::{DrawOp, RecordingSurface};
    use crate::overlay::infrastructure::rgba_overlay::RgbaOverlay;
    use crate::pipeline::analysis_sink::test_support::RecordingSink;
    use crate::pipeline::detect_face_use_case::test_support::{face, failing, no_face};

    fn image(w: u32, h: u32) -> Frame {
        Frame::new(vec![120; (w * h * 3) as usize], w, h, 3, 0)
    }

    fn analyzer(
        detector: Arc<DetectFaceUseCase>,
    ) -> (AnalyzeImageUseCase, Arc<RecordingSink>, RecordingSurface) {
        let sink = Arc::new(RecordingSink::default());
        let surface = RecordingSurface::default();
        (
            AnalyzeImageUseCase::new(detector, Box::new(surface.clone()), sink.clone()),
            sink,
            surface,
        )
    }

    #[test]
    fn test_analyze_without_image_fails() {
        let (mut analyzer, _, _) = analyzer(face(Duration::ZERO));
        assert!(matches!(analyzer.analyze(), Err(AnalyzeError::NoImage)));
    }

    #[test]
    fn test_analyze_draws_at_natural_resolution_and_publishes() {
        let (mut analyzer, sink, surface) = analyzer(face(Duration::ZERO));
        analyzer.select_image(image(320, 240));

        let analysis = analyzer.analyze().unwrap().unwrap();

        assert_eq!(analysis.age, 30);
        assert_eq!(analysis.dominant_expression, Expression::Happy);
        assert_eq!(surface.ops()[1], DrawOp::Resize(320, 240));
        assert_eq!(analyzer.current_analysis(), Some(&analysis));
        assert_eq!(sink.last().unwrap().analysis, Some(analysis));
    }

    #[test]
    fn test_selecting_new_image_clears_without_detecting() {
        let detector = face(Duration::ZERO);
        let (mut analyzer, sink, surface) = analyzer(detector.clone());
        analyzer.select_image(image(100, 100));
        analyzer.analyze().unwrap();
        let boxes = surface.boxes();

        analyzer.select_image(image(50, 50));

        assert!(analyzer.current_analysis().is_none());
        assert_eq!(sink.last().unwrap().analysis, None);
        assert_eq!(surface.boxes(), boxes);
        assert_eq!(surface.ops().last(), Some(&DrawOp::Clear));
    }

    #[test]
    fn test_selecting_before_any_analysis_does_not_load_models() {
        let detector = no_face();
        let (mut analyzer, _, _) = analyzer(detector.clone());
        analyzer.select_image(image(10, 10));
        assert!(!detector.registry().is_ready());
    }

    #[test]
    fn test_no_face_publishes_none() {
        let (mut analyzer, sink, _) = analyzer(no_face());
        analyzer.select_image(image(64, 64));
        assert_eq!(analyzer.analyze().unwrap(), None);
        assert_eq!(sink.last().unwrap().analysis, None);
    }

    #[test]
    fn test_detection_error_is_returned_and_clears() {
        let (mut analyzer, sink, _) = analyzer(failing());
        analyzer.select_image(image(64, 64));
        assert!(matches!(
            analyzer.analyze(),
            Err(AnalyzeError::Detection(DetectionError::Inference(_)))
        ));
        assert!(analyzer.current_analysis().is_none());
        assert_eq!(sink.last().unwrap().analysis, None);
    }

    #[test]
    fn test_composed_overlay_has_image_size() {
        let sink = Arc::new(RecordingSink::default());
        let mut analyzer = AnalyzeImageUseCase::new(
            face(Duration::ZERO),
            Box::new(RgbaOverlay::new(0, 0)),
            sink,
        );
        analyzer.select_image(image(80, 60));
        analyzer.analyze().unwrap();
        let composed = analyzer.composed().unwrap();
        assert_eq!((composed.width(), composed.height(), composed.channels()), (80, 60, 4));
    }

    #[test]
    fn test_select_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        write_image(&path, &image(40, 30)).unwrap();

        let (mut analyzer, sink, _) = analyzer(no_face());
        analyzer.select_image_file(&path).unwrap();
        let shown = sink.last().unwrap().frame.unwrap();
        assert_eq!((shown.width(), shown.height()), (40, 30));

        assert!(matches!(
            analyzer.select_image_file(&dir.path().join("missing.png")),
            Err(AnalyzeError::Load(_))
        ));
    }
}
