use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::frame::Frame;

/// Which way the requested camera faces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera, towards the user.
    #[default]
    User,
    /// Rear camera.
    Environment,
}

impl FacingMode {
    pub fn opposite(self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FacingMode::User => "user",
            FacingMode::Environment => "environment",
        }
    }
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),
    #[error("no {0}-facing camera available")]
    NoDevice(FacingMode),
    #[error("capture backend error: {0}")]
    Backend(String),
    #[error("capture stream is closed")]
    Closed,
}

/// A running capture. Holds the device until [`CaptureStream::stop`].
pub trait CaptureStream: Send {
    /// Blocks until the next frame is available.
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Halts every track and releases the device. Idempotent.
    fn stop(&mut self);

    fn is_live(&self) -> bool;
}

/// Source of capture streams, one per facing mode request.
pub trait CaptureDevice: Send {
    fn open(&mut self, facing: FacingMode) -> Result<Box<dyn CaptureStream>, CaptureError>;
}

/// The active stream, owned by a session and lent to the render loop.
pub type SharedStream = Arc<Mutex<Box<dyn CaptureStream>>>;
