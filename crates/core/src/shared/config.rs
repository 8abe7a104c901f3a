use std::path::PathBuf;
use std::time::Duration;

use crate::capture::domain::capture_device::FacingMode;
use crate::shared::constants::{DEFAULT_FRAME_INTERVAL_MS, MODEL_BASE_URL};

/// Runtime knobs shared by the CLI and the desktop app.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalyzerConfig {
    /// Minimum face detector confidence (0.0-1.0).
    pub confidence: f64,
    pub model_base_url: String,
    /// Directory checked for pre-packaged model files before downloading.
    pub bundled_model_dir: Option<PathBuf>,
    /// Minimum time between the starts of two render loop iterations.
    pub frame_interval: Duration,
    /// Camera device index requested for the front-facing camera.
    pub user_device_index: u32,
    /// Camera device index requested for the rear-facing camera.
    pub environment_device_index: u32,
}

impl AnalyzerConfig {
    pub fn device_index(&self, facing: FacingMode) -> u32 {
        match facing {
            FacingMode::User => self.user_device_index,
            FacingMode::Environment => self.environment_device_index,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            confidence: 0.5,
            model_base_url: MODEL_BASE_URL.to_string(),
            bundled_model_dir: None,
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
            user_device_index: 0,
            environment_device_index: 1,
        }
    }
}
