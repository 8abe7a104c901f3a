use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// One candidate face box with the detector's confidence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub region: Region,
    pub score: f32,
}

/// Domain interface for face detection.
///
/// Implementations wrap inference sessions that need exclusive access,
/// hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}

/// The single best match: highest score, the earliest candidate on ties.
pub fn best_match(detections: &[Detection]) -> Option<&Detection> {
    detections
        .iter()
        .fold(None, |best: Option<&Detection>, d| match best {
            Some(b) if b.score >= d.score => Some(b),
            _ => Some(d),
        })
}
