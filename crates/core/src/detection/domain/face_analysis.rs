use serde::Serialize;

use crate::detection::domain::age_gender::{round_age, Gender};
use crate::detection::domain::expression::{Expression, ExpressionScores};
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::constants::{PLACEHOLDER_EYE_COLOR, PLACEHOLDER_HAIR_COLOR, PLACEHOLDER_SCORE};
use crate::shared::region::Region;

/// Everything the model pipeline reports for the best-matching face,
/// in the coordinate space of the analyzed frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceDetection {
    pub region: Region,
    pub score: f32,
    pub landmarks: FaceLandmarks,
    pub expressions: ExpressionScores,
    pub age: f64,
    pub gender: Gender,
    pub gender_probability: f32,
}

/// Display-ready summary of one detection.
///
/// `hair_color`, `eye_color` and `score` are fixed placeholders; nothing
/// estimates them.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameAnalysis {
    pub gender: Gender,
    pub age: u32,
    pub dominant_expression: Expression,
    pub hair_color: String,
    pub eye_color: String,
    pub score: u32,
}

impl FrameAnalysis {
    pub fn from_detection(detection: &FaceDetection) -> Self {
        Self {
            gender: detection.gender,
            age: round_age(detection.age),
            dominant_expression: detection
                .expressions
                .dominant()
                .unwrap_or(Expression::Neutral),
            hair_color: PLACEHOLDER_HAIR_COLOR.to_string(),
            eye_color: PLACEHOLDER_EYE_COLOR.to_string(),
            score: PLACEHOLDER_SCORE,
        }
    }
}

/// Result of one successful detection call: geometry for drawing plus the
/// published summary.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceResult {
    pub detection: FaceDetection,
    pub analysis: FrameAnalysis,
}

impl From<FaceDetection> for FaceResult {
    fn from(detection: FaceDetection) -> Self {
        let analysis = FrameAnalysis::from_detection(&detection);
        Self {
            detection,
            analysis,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::detection::domain::face_landmarks::LANDMARK_COUNT;

    pub fn detection(age: f64, expressions: Vec<(Expression, f32)>) -> FaceDetection {
        FaceDetection {
            region: Region::new(10, 20, 40, 40),
            score: 0.9,
            landmarks: FaceLandmarks::new(vec![(30.0, 40.0); LANDMARK_COUNT]).unwrap(),
            expressions: ExpressionScores::new(expressions),
            age,
            gender: Gender::Female,
            gender_probability: 0.8,
        }
    }
}
