use std::time::Duration;

/// Release assets holding the four pretrained models, re-exported to ONNX
/// under the file names below. See [`ModelKind::upstream`] for where each
/// network comes from. Override with `--model-url`, or place the files in a
/// bundled models directory, to self-host them.
///
/// [`ModelKind::upstream`]: crate::detection::domain::model_loader::ModelKind::upstream
pub const MODEL_BASE_URL: &str = "https://github.com/facelens/facelens/releases/download/models-v1";

pub const FACE_DETECTOR_MODEL_NAME: &str = "face_detector.onnx";
pub const FACE_LANDMARK_MODEL_NAME: &str = "face_landmark_68.onnx";
pub const FACE_EXPRESSION_MODEL_NAME: &str = "face_expression.onnx";
pub const AGE_GENDER_MODEL_NAME: &str = "age_gender.onnx";

/// Directory name used under the platform cache/config directories.
pub const APP_DIR_NAME: &str = "FaceLens";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Default pacing of the live render loop (~30 fps).
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 33;

/// Pause before retrying a model load that failed in the background.
pub const MODEL_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Placeholder attributes. No model estimates these; they are fixed values
/// shown alongside the real estimates.
pub const PLACEHOLDER_HAIR_COLOR: &str = "Brown";
pub const PLACEHOLDER_EYE_COLOR: &str = "Brown";
pub const PLACEHOLDER_SCORE: u32 = 85;
