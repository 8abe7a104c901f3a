use thiserror::Error;

use crate::detection::domain::age_gender::AgeGenderNet;
use crate::detection::domain::expression::ExpressionNet;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_landmarks::LandmarkNet;
use crate::shared::constants::{
    AGE_GENDER_MODEL_NAME, FACE_DETECTOR_MODEL_NAME, FACE_EXPRESSION_MODEL_NAME,
    FACE_LANDMARK_MODEL_NAME,
};

/// The four pretrained models the analysis pipeline needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelKind {
    FaceDetector,
    FaceLandmark68,
    FaceExpression,
    AgeGender,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::FaceDetector,
        ModelKind::FaceLandmark68,
        ModelKind::FaceExpression,
        ModelKind::AgeGender,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModelKind::FaceDetector => "TinyFaceDetector",
            ModelKind::FaceLandmark68 => "FaceLandmark68",
            ModelKind::FaceExpression => "FaceExpression",
            ModelKind::AgeGender => "AgeGender",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            ModelKind::FaceDetector => FACE_DETECTOR_MODEL_NAME,
            ModelKind::FaceLandmark68 => FACE_LANDMARK_MODEL_NAME,
            ModelKind::FaceExpression => FACE_EXPRESSION_MODEL_NAME,
            ModelKind::AgeGender => AGE_GENDER_MODEL_NAME,
        }
    }

    /// Upstream network the artifact is exported from, and the tensor
    /// contract the decoder relies on.
    pub fn upstream(self) -> &'static str {
        match self {
            ModelKind::FaceDetector => {
                "MediaPipe BlazeFace short-range; 128x128 RGB in, 896 anchors x 16 regressors + scores out"
            }
            ModelKind::FaceLandmark68 => {
                "PFLD 68-point landmarks; 112x112 RGB in, 136 crop-normalized coordinates out"
            }
            ModelKind::FaceExpression => {
                "FER+ emotion-ferplus-8 (onnx/models); 64x64 grayscale in, 8 logits out"
            }
            ModelKind::AgeGender => {
                "InsightFace genderage (buffalo_l); 96x96 RGB in, [female, male, age/100] out"
            }
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            ModelKind::FaceDetector => 0,
            ModelKind::FaceLandmark68 => 1,
            ModelKind::FaceExpression => 2,
            ModelKind::AgeGender => 3,
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a load attempt failed. Cloneable so every caller coalesced onto the
/// same attempt receives the same error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelLoadError {
    #[error("failed to fetch {model} model: {message}")]
    Fetch { model: ModelKind, message: String },
    #[error("failed to parse {model} model: {message}")]
    Parse { model: ModelKind, message: String },
    #[error("model loading was interrupted")]
    Interrupted,
}

/// Fetches and parses one model artifact per call.
///
/// Calls for different kinds may run concurrently.
pub trait ModelLoader: Send + Sync {
    fn load_detector(&self) -> Result<Box<dyn FaceDetector>, ModelLoadError>;
    fn load_landmarks(&self) -> Result<Box<dyn LandmarkNet>, ModelLoadError>;
    fn load_expressions(&self) -> Result<Box<dyn ExpressionNet>, ModelLoadError>;
    fn load_age_gender(&self) -> Result<Box<dyn AgeGenderNet>, ModelLoadError>;
}
