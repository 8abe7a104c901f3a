use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use thiserror::Error;

use crate::detection::domain::face_analysis::FaceResult;
use crate::detection::domain::model_loader::ModelLoadError;
use crate::detection::infrastructure::model_registry::ModelRegistry;
use crate::shared::constants::MODEL_RETRY_DELAY;
use crate::shared::frame::Frame;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),
    #[error("face analysis failed: {0}")]
    Inference(String),
}

/// Finds the single best face in a frame and analyzes it.
pub struct DetectFaceUseCase {
    registry: Arc<ModelRegistry>,
    warming: Arc<AtomicBool>,
    warm_failure: Arc<Mutex<Option<ModelLoadError>>>,
}

impl DetectFaceUseCase {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            warming: Arc::new(AtomicBool::new(false)),
            warm_failure: Arc::new(Mutex::new(None)),
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn is_ready(&self) -> bool {
        self.registry.is_ready()
    }

    /// Starts loading the models on a detached thread unless that is already
    /// happening, and returns immediately.
    ///
    /// Returns the error of the last background attempt, once. After a
    /// failure the next attempt starts no sooner than `MODEL_RETRY_DELAY`.
    pub fn warm_up(&self) -> Option<ModelLoadError> {
        let failure = self.warm_failure.lock().ok().and_then(|mut f| f.take());
        if self.registry.is_ready() || self.warming.swap(true, Ordering::AcqRel) {
            return failure;
        }
        let registry = self.registry.clone();
        let warming = self.warming.clone();
        let slot = self.warm_failure.clone();
        thread::spawn(move || {
            if let Err(e) = registry.ensure_loaded() {
                if let Ok(mut last) = slot.lock() {
                    *last = Some(e);
                }
                thread::sleep(MODEL_RETRY_DELAY);
            }
            warming.store(false, Ordering::Release);
        });
        failure
    }

    /// Waits for the models, then runs the full pipeline on `frame`.
    ///
    /// `Ok(None)` means no face was found.
    pub fn detect_one(&self, frame: &Frame) -> Result<Option<FaceResult>, DetectionError> {
        let models = self.registry.ensure_loaded()?;
        let mut models = models
            .lock()
            .map_err(|_| DetectionError::Inference("model set lock poisoned".into()))?;
        let detection = models
            .detect_single_face(frame)
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        Ok(detection.map(FaceResult::from))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::detection::domain::age_gender::AgeGenderNet;
    use crate::detection::domain::expression::{Expression, ExpressionNet};
    use crate::detection::domain::face_detector::{Detection, FaceDetector};
    use crate::detection::domain::face_landmarks::LandmarkNet;
    use crate::detection::domain::model_loader::{ModelKind, ModelLoader};
    use crate::detection::domain::model_set::stubs::{
        CenterLandmarks, FixedAgeGender, FixedExpressions,
    };
    use crate::shared::region::Region;

    /// Detector that sleeps, then reports one face or nothing.
    pub struct ScriptedDetector {
        pub face: bool,
        pub fail: bool,
        pub delay: Duration,
    }

    impl FaceDetector for ScriptedDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            std::thread::sleep(self.delay);
            if self.fail {
                return Err("session run failed".into());
            }
            if !self.face {
                return Ok(vec![]);
            }
            let side = (frame.width().min(frame.height()) / 2) as i32;
            Ok(vec![Detection {
                region: Region::new(side / 2, side / 2, side, side),
                score: 0.9,
            }])
        }
    }

    /// Loader whose detector behaves as scripted; takes the detector once.
    pub struct ScriptedLoader {
        detector: Mutex<Option<ScriptedDetector>>,
    }

    impl ModelLoader for ScriptedLoader {
        fn load_detector(&self) -> Result<Box<dyn FaceDetector>, ModelLoadError> {
            self.detector
                .lock()
                .unwrap()
                .take()
                .map(|d| Box::new(d) as Box<dyn FaceDetector>)
                .ok_or(ModelLoadError::Parse {
                    model: ModelKind::FaceDetector,
                    message: "already taken".into(),
                })
        }

        fn load_landmarks(&self) -> Result<Box<dyn LandmarkNet>, ModelLoadError> {
            Ok(Box::new(CenterLandmarks))
        }

        fn load_expressions(&self) -> Result<Box<dyn ExpressionNet>, ModelLoadError> {
            Ok(Box::new(FixedExpressions(vec![
                (Expression::Happy, 0.5),
                (Expression::Neutral, 0.5),
            ])))
        }

        fn load_age_gender(&self) -> Result<Box<dyn AgeGenderNet>, ModelLoadError> {
            Ok(Box::new(FixedAgeGender(29.6)))
        }
    }

    pub fn use_case(detector: ScriptedDetector) -> Arc<DetectFaceUseCase> {
        let loader = ScriptedLoader {
            detector: Mutex::new(Some(detector)),
        };
        Arc::new(DetectFaceUseCase::new(Arc::new(ModelRegistry::new(
            Box::new(loader),
        ))))
    }

    pub fn face(delay: Duration) -> Arc<DetectFaceUseCase> {
        use_case(ScriptedDetector {
            face: true,
            fail: false,
            delay,
        })
    }

    pub fn no_face() -> Arc<DetectFaceUseCase> {
        use_case(ScriptedDetector {
            face: false,
            fail: false,
            delay: Duration::ZERO,
        })
    }

    pub fn failing() -> Arc<DetectFaceUseCase> {
        use_case(ScriptedDetector {
            face: false,
            fail: true,
            delay: Duration::ZERO,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::test_support::*;
    use super::*;
    use crate::detection::domain::age_gender::Gender;
    use crate::detection::domain::expression::Expression;
    use crate::detection::domain::model_loader::ModelKind;
    use crate::detection::infrastructure::model_registry::test_support::CountingLoader;

    fn frame() -> Frame {
        Frame::new(vec![100; 120 * 80 * 3], 120, 80, 3, 0)
    }

    fn wait_until(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_faceless_frame_is_none() {
        assert_eq!(no_face().detect_one(&frame()).unwrap(), None);
    }

    #[test]
    fn test_face_produces_rounded_analysis() {
        let result = face(Duration::ZERO).detect_one(&frame()).unwrap().unwrap();
        assert_eq!(result.analysis.age, 30);
        assert_eq!(result.analysis.gender, Gender::Male);
        // Tie between happy and neutral keeps the first.
        assert_eq!(result.analysis.dominant_expression, Expression::Happy);
        assert_eq!(result.detection.landmarks.points().len(), 68);
    }

    #[test]
    fn test_inference_error_is_reported() {
        let err = failing().detect_one(&frame()).unwrap_err();
        assert!(matches!(err, DetectionError::Inference(msg) if msg.contains("session run failed")));
    }

    #[test]
    fn test_model_load_failure_is_reported() {
        let loader = Arc::new(CountingLoader::default());
        loader.failing.lock().unwrap().insert(ModelKind::FaceLandmark68);
        let registry = Arc::new(ModelRegistry::new(Box::new(loader)));
        let err = DetectFaceUseCase::new(registry).detect_one(&frame()).unwrap_err();
        assert!(matches!(err, DetectionError::ModelLoad(ModelLoadError::Fetch { .. })));
    }

    #[test]
    fn test_warm_up_returns_before_models_load() {
        let loader = Arc::new(CountingLoader {
            delay: Duration::from_millis(300),
            ..CountingLoader::default()
        });
        let use_case = DetectFaceUseCase::new(Arc::new(ModelRegistry::new(Box::new(
            loader.clone(),
        ))));

        let started = Instant::now();
        assert_eq!(use_case.warm_up(), None);
        assert_eq!(use_case.warm_up(), None);
        assert!(started.elapsed() < Duration::from_millis(150));
        assert!(!use_case.is_ready());

        wait_until(|| use_case.is_ready());
        for kind in ModelKind::ALL {
            assert_eq!(loader.calls(kind), 1, "{kind}");
        }
    }

    #[test]
    fn test_warm_up_reports_background_failure_once() {
        let loader = Arc::new(CountingLoader::default());
        loader.failing.lock().unwrap().insert(ModelKind::AgeGender);
        let use_case = DetectFaceUseCase::new(Arc::new(ModelRegistry::new(Box::new(loader))));

        assert_eq!(use_case.warm_up(), None);
        let mut reported = None;
        wait_until(|| {
            reported = use_case.warm_up();
            reported.is_some()
        });
        assert!(matches!(
            reported,
            Some(ModelLoadError::Fetch { model: ModelKind::AgeGender, .. })
        ));
        assert_eq!(use_case.warm_up(), None);
        assert!(!use_case.is_ready());
    }

    #[test]
    fn test_first_call_loads_models() {
        let use_case = no_face();
        assert!(!use_case.registry().is_ready());
        use_case.detect_one(&frame()).unwrap();
        assert!(use_case.registry().is_ready());
    }
}
