use crate::detection::domain::age_gender::AgeGenderNet;
use crate::detection::domain::expression::ExpressionNet;
use crate::detection::domain::face_analysis::FaceDetection;
use crate::detection::domain::face_detector::{best_match, FaceDetector};
use crate::detection::domain::face_landmarks::{FaceLandmarks, LandmarkNet};
use crate::shared::frame::Frame;

/// Extra margin around the detector box before cropping for the face nets.
const CROP_PADDING: f64 = 0.2;

/// The four loaded model handles.
pub struct ModelSet {
    pub detector: Box<dyn FaceDetector>,
    pub landmarks: Box<dyn LandmarkNet>,
    pub expressions: Box<dyn ExpressionNet>,
    pub age_gender: Box<dyn AgeGenderNet>,
}

impl ModelSet {
    /// Detects faces, keeps the best match, and runs the landmark,
    /// expression and age/gender nets on its crop.
    ///
    /// Returns `Ok(None)` when the detector finds nothing.
    pub fn detect_single_face(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<FaceDetection>, Box<dyn std::error::Error>> {
        let detections = self.detector.detect(frame)?;
        let Some(best) = best_match(&detections).copied() else {
            return Ok(None);
        };

        let crop_region = best.region.padded_square(CROP_PADDING);
        let Some(face) = frame.crop(&crop_region) else {
            return Ok(None);
        };

        let normalized = self.landmarks.predict(&face)?;
        let landmarks = FaceLandmarks::from_normalized(&normalized, &crop_region)?;
        let expressions = self.expressions.predict(&face)?;
        if expressions.is_empty() {
            return Err("expression model returned no scores".into());
        }
        let age_gender = self.age_gender.predict(&face)?;

        Ok(Some(FaceDetection {
            region: best.region,
            score: best.score,
            landmarks,
            expressions,
            age: age_gender.age,
            gender: age_gender.gender,
            gender_probability: age_gender.gender_probability,
        }))
    }
}


#[cfg(test)]
mod tests {
    use super::stubs::*;
    use super::*;
    use crate::detection::domain::age_gender::Gender;
    use crate::detection::domain::expression::Expression;
    use crate::detection::domain::face_detector::Detection;
    use crate::shared::region::Region;

    fn frame() -> Frame {
        Frame::new(vec![90; 200 * 100 * 3], 200, 100, 3, 0)
    }

    #[test]
    fn test_no_faces_returns_none() {
        let mut set = model_set(Box::new(StubDetector { detections: vec![] }));
        assert!(set.detect_single_face(&frame()).unwrap().is_none());
    }

    #[test]
    fn test_best_face_is_analyzed() {
        let mut set = model_set(Box::new(StubDetector {
            detections: vec![
                Detection {
                    region: Region::new(0, 0, 20, 20),
                    score: 0.6,
                },
                Detection {
                    region: Region::new(100, 30, 40, 40),
                    score: 0.95,
                },
            ],
        }));

        let face = set.detect_single_face(&frame()).unwrap().unwrap();

        assert_eq!(face.region, Region::new(100, 30, 40, 40));
        assert_eq!(face.gender, Gender::Male);
        assert_eq!(face.expressions.dominant(), Some(Expression::Happy));
        // Center landmarks land on the box center.
        assert_eq!(face.landmarks.points()[0], (120.0, 50.0));
    }

    #[test]
    fn test_face_at_frame_edge_gets_square_crop() {
        let mut set = model_set(Box::new(StubDetector {
            detections: vec![Detection {
                region: Region::new(0, 40, 40, 40),
                score: 0.9,
            }],
        }));
        set.landmarks = Box::new(SquareOnlyLandmarks);

        let face = set.detect_single_face(&frame()).unwrap().unwrap();

        assert_eq!(face.landmarks.points()[0], (20.0, 60.0));
    }

    #[test]
    fn test_detector_error_propagates() {
        let mut set = model_set(Box::new(FailingDetector));
        assert!(set.detect_single_face(&frame()).is_err());
    }

    #[test]
    fn test_empty_expression_scores_is_error() {
        let mut set = model_set(Box::new(StubDetector {
            detections: vec![Detection {
                region: Region::new(10, 10, 30, 30),
                score: 0.9,
            }],
        }));
        set.expressions = Box::new(FixedExpressions(vec![]));
        assert!(set.detect_single_face(&frame()).is_err());
    }
}
