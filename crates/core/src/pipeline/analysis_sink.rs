use std::sync::Arc;

use crate::detection::domain::face_analysis::FrameAnalysis;
use crate::shared::frame::Frame;

/// One publication from the render loop or the single-shot analyzer.
///
/// `analysis` is `None` when no face was found, detection failed, or the
/// view is being reset; consumers clear displayed results on `None`.
#[derive(Clone, Debug, Default)]
pub struct AnalysisUpdate {
    pub analysis: Option<FrameAnalysis>,
    /// Frame to display, with the overlay composited when one was drawn.
    pub frame: Option<Frame>,
}

impl AnalysisUpdate {
    /// Clears displayed results and the displayed frame.
    pub fn cleared() -> Self {
        Self::default()
    }
}

/// Receives analysis results; decouples use cases from how they are shown.
pub trait AnalysisSink: Send + Sync {
    fn publish(&self, update: AnalysisUpdate);
}

impl<F> AnalysisSink for F
where
    F: Fn(AnalysisUpdate) + Send + Sync,
{
    fn publish(&self, update: AnalysisUpdate) {
        self(update)
    }
}

pub type SharedSink = Arc<dyn AnalysisSink>;
